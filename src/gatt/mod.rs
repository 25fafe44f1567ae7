//! The GATT object tree: object-manager root, advertisement, service,
//! and the three characteristics (spec §4.2-§4.4).

pub mod advertisement;
pub mod characteristic;
pub mod constants;
pub mod object_manager;
pub mod registry;
