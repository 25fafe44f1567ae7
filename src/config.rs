//! Compile-time defaults for the few knobs this daemon exposes, each
//! overridable by an environment variable so the binary can be tested
//! and repackaged without touching code. None of these change any
//! wire-visible behavior described in the spec's frozen UUIDs/paths —
//! they only change where those frozen defaults are sourced from.

use std::env;

/// Adapter alias set on startup (spec §6).
pub const DEFAULT_ALIAS: &str = "PiDevelopDotcom";

/// Wi-Fi interface the scan/connect/netlink components operate on.
pub const DEFAULT_IFACE: &str = "wlan0";

/// Log file path (spec §6).
pub const DEFAULT_LOG_PATH: &str = "/var/log/provision/ble.log";

#[derive(Clone, Debug)]
pub struct Config {
    pub alias: String,
    pub iface: String,
    pub log_path: String,
}

impl Config {
    pub fn from_env() -> Config {
        Config {
            alias: env::var("PROVISION_BLE_ALIAS").unwrap_or_else(|_| DEFAULT_ALIAS.to_string()),
            iface: env::var("PROVISION_BLE_IFACE").unwrap_or_else(|_| DEFAULT_IFACE.to_string()),
            log_path: env::var("PROVISION_BLE_LOG")
                .unwrap_or_else(|_| DEFAULT_LOG_PATH.to_string()),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            alias: DEFAULT_ALIAS.to_string(),
            iface: DEFAULT_IFACE.to_string(),
            log_path: DEFAULT_LOG_PATH.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_frozen_spec_values() {
        let cfg = Config::default();
        assert_eq!(cfg.alias, "PiDevelopDotcom");
        assert_eq!(cfg.iface, "wlan0");
        assert_eq!(cfg.log_path, "/var/log/provision/ble.log");
    }
}
