//! Dependency-free Command-characteristic write parser (spec §4.6).
//!
//! Deliberately not a JSON parser: it finds `"op"` (falling back to
//! the legacy `"cmd"` field), then locates `ssid`/`psk` the same way.
//! Nested quotes or escaped characters inside a value are explicitly
//! out of scope (spec §4.6/§9) — payloads are controlled by the
//! central, and a central sending pathological input only hurts
//! itself.

use crate::error::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    WifiScan,
    WifiConnect { ssid: String, psk: String },
}

/// Finds the quoted string value of `key` in `payload`: the substring
/// `"key"`, then the next `:`, then the first `"..."` after that.
fn extract_field(payload: &str, key: &str) -> Option<String> {
    let needle = format!("\"{}\"", key);
    let key_pos = payload.find(&needle)?;
    let after_key = &payload[key_pos + needle.len()..];
    let colon_pos = after_key.find(':')?;
    let after_colon = &after_key[colon_pos + 1..];
    let open_quote = after_colon.find('"')?;
    let rest = &after_colon[open_quote + 1..];
    let close_quote = rest.find('"')?;
    Some(rest[..close_quote].to_string())
}

fn legacy_op(cmd: &str) -> Option<&'static str> {
    match cmd {
        "wifi.scan" => Some("wifi_scan"),
        "wifi.connect" => Some("wifi_connect"),
        _ => None,
    }
}

/// Parses a raw Command-characteristic write. Returns `None` if no
/// recognizable `op` (direct or legacy) is found, or if a
/// `wifi_connect` carries an empty `ssid` (spec invariant 5).
pub fn parse(bytes: &[u8]) -> Option<Command> {
    let text = String::from_utf8_lossy(bytes);

    let mut op = extract_field(&text, "op").unwrap_or_default();
    if op.is_empty() {
        if let Some(cmd) = extract_field(&text, "cmd") {
            if let Some(mapped) = legacy_op(&cmd) {
                op = mapped.to_string();
            }
        }
    }

    match op.as_str() {
        "wifi_scan" => Some(Command::WifiScan),
        "wifi_connect" => {
            let ssid = extract_field(&text, "ssid").unwrap_or_default();
            if ssid.is_empty() {
                log::warn!("wifi_connect write had an empty ssid, ignoring");
                return None;
            }
            let psk = extract_field(&text, "psk").unwrap_or_default();
            Some(Command::WifiConnect { ssid, psk })
        }
        "" => {
            log::warn!("{}", Error::ParseEmpty);
            None
        }
        other => {
            log::warn!("command write had unknown op: {}", other);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_wifi_scan() {
        assert_eq!(parse(br#"{"op":"wifi_scan"}"#), Some(Command::WifiScan));
    }

    #[test]
    fn parses_wifi_connect() {
        assert_eq!(
            parse(br#"{"op":"wifi_connect","ssid":"HomeNet","psk":"secret"}"#),
            Some(Command::WifiConnect {
                ssid: "HomeNet".to_string(),
                psk: "secret".to_string(),
            })
        );
    }

    #[test]
    fn empty_ssid_yields_none() {
        assert_eq!(
            parse(br#"{"op":"wifi_connect","ssid":"","psk":"secret"}"#),
            None
        );
    }

    #[test]
    fn legacy_scan_alias_scenario_f() {
        assert_eq!(parse(br#"{"cmd":"wifi.scan"}"#), Some(Command::WifiScan));
    }

    #[test]
    fn legacy_connect_alias() {
        assert_eq!(
            parse(br#"{"cmd":"wifi.connect","ssid":"HomeNet","psk":"secret"}"#),
            Some(Command::WifiConnect {
                ssid: "HomeNet".to_string(),
                psk: "secret".to_string(),
            })
        );
    }

    #[test]
    fn unknown_op_yields_none() {
        assert_eq!(parse(br#"{"op":"reboot"}"#), None);
    }

    #[test]
    fn empty_payload_yields_none() {
        assert_eq!(parse(b""), None);
    }

    #[test]
    fn non_utf8_bytes_do_not_panic() {
        let bytes = vec![0x7b, 0xff, 0xfe, 0x7d];
        assert_eq!(parse(&bytes), None);
    }

    #[test]
    fn connect_without_psk_defaults_to_empty() {
        assert_eq!(
            parse(br#"{"op":"wifi_connect","ssid":"Open"}"#),
            Some(Command::WifiConnect {
                ssid: "Open".to_string(),
                psk: "".to_string(),
            })
        );
    }
}
