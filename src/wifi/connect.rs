//! Asynchronous WPA-PSK connection attempts against NetworkManager
//! (spec §4.8).
//!
//! `AddAndActivateConnection` can take several seconds (association,
//! DHCP handshake kickoff), so it is never called from the dispatcher
//! thread: `submit` spawns a short-lived helper thread that makes the
//! one call and reports the outcome back over `events_tx`, matching
//! the concurrency model in spec §5.

use std::collections::HashMap;
use std::sync::mpsc::Sender;
use std::thread;

use dbus::arg::{PropMap, Variant};
use dbus::blocking::SyncConnection;
use dbus::Path;

use crate::dbus_ifaces::network_manager::{
    ConnectionSettings, OrgFreedesktopNetworkManager, CALL_TIMEOUT, NM_PATH, NM_SERVICE,
};
use crate::dispatcher::DispatchEvent;

fn variant_string(value: String) -> Variant<Box<dyn dbus::arg::RefArg>> {
    Variant(Box::new(value))
}

fn variant_bool(value: bool) -> Variant<Box<dyn dbus::arg::RefArg>> {
    Variant(Box::new(value))
}

fn variant_bytes(value: Vec<u8>) -> Variant<Box<dyn dbus::arg::RefArg>> {
    Variant(Box::new(value))
}

/// Builds the nested `a{sa{sv}}` settings blob NetworkManager expects
/// for a brand new WPA-PSK infrastructure connection.
fn build_settings(ssid: &str, psk: &str) -> ConnectionSettings {
    let mut connection: PropMap = HashMap::new();
    connection.insert("id".to_string(), variant_string(ssid.to_string()));
    connection.insert("type".to_string(), variant_string("802-11-wireless".to_string()));
    connection.insert("autoconnect".to_string(), variant_bool(true));

    let mut wireless: PropMap = HashMap::new();
    wireless.insert("ssid".to_string(), variant_bytes(ssid.as_bytes().to_vec()));
    wireless.insert("mode".to_string(), variant_string("infrastructure".to_string()));

    let mut security: PropMap = HashMap::new();
    security.insert("key-mgmt".to_string(), variant_string("wpa-psk".to_string()));
    security.insert("psk".to_string(), variant_string(psk.to_string()));

    let mut ipv4: PropMap = HashMap::new();
    ipv4.insert("method".to_string(), variant_string("auto".to_string()));

    let mut settings: ConnectionSettings = HashMap::new();
    settings.insert("connection".to_string(), connection);
    settings.insert("802-11-wireless".to_string(), wireless);
    if !psk.is_empty() {
        settings.insert("802-11-wireless-security".to_string(), security);
    }
    settings.insert("ipv4".to_string(), ipv4);
    settings
}

/// Spawns the helper thread and returns immediately. `events_tx` is
/// how the helper reports back; the dispatcher moves to `CONNECTING`
/// before calling this and waits for `DispatchEvent::ConnectResult`.
pub fn submit(iface: String, ssid: String, psk: String, events_tx: Sender<DispatchEvent>) {
    thread::spawn(move || {
        let outcome = attempt(&iface, &ssid, &psk);
        let event = match outcome {
            Ok(()) => DispatchEvent::ConnectResult { ssid, ok: true, error: None },
            Err(err) => {
                log::error!("wifi connect to {} failed: {}", ssid, err);
                DispatchEvent::ConnectResult { ssid, ok: false, error: Some(err.to_string()) }
            }
        };
        let _ = events_tx.send(event);
    });
}

fn attempt(iface: &str, ssid: &str, psk: &str) -> Result<(), dbus::Error> {
    let conn = SyncConnection::new_system()?;
    let nm = conn.with_proxy(NM_SERVICE, NM_PATH, CALL_TIMEOUT);
    let device_path = nm.get_device_by_ip_iface(iface)?;
    let settings = build_settings(ssid, psk);
    nm.add_and_activate_connection(settings, device_path, Path::new("/").expect("root path is valid"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_carry_requested_ssid_and_security_when_psk_present() {
        let settings = build_settings("HomeNet", "supersecret");
        assert!(settings.contains_key("802-11-wireless-security"));
        assert!(settings["802-11-wireless"].contains_key("ssid"));
    }

    #[test]
    fn open_network_omits_security_block() {
        let settings = build_settings("OpenNet", "");
        assert!(!settings.contains_key("802-11-wireless-security"));
    }
}
