//! The provisioning state machine, its JSON payload encoder, and the
//! Command-characteristic write parser (spec §4.5-§4.7).

pub mod command;
pub mod json;
pub mod state;
