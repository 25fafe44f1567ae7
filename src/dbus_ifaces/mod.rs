//! Proxy trait modules for the D-Bus interfaces this daemon calls into.
//!
//! The teacher crate generates its BlueZ proxies at build time with
//! `dbus-codegen` from `org.bluez` introspection XML (see its
//! `build.rs`). That XML, and the generated `bluez_dbus/*.rs` it
//! produces, were not part of this retrieval pack, and `dbus-codegen`
//! can't be re-run here to regenerate them without the Rust toolchain.
//! These modules are hand-written in the same shape `dbus-codegen`
//! produces — one trait per D-Bus interface, implemented for
//! `dbus::blocking::Proxy<'a, C>` — covering only the handful of
//! methods/properties this daemon actually calls.

pub mod bluez;
pub mod network_manager;
