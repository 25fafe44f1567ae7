//! Wi-Fi scanning, connection activation, and IPv4 readiness
//! monitoring (spec §4.7-§4.9). Everything here talks to either
//! NetworkManager over D-Bus or the kernel over netlink; nothing here
//! touches the GATT/BLE side directly.

pub mod connect;
pub mod netlink;
pub mod scan;
