//! Dependency-free JSON assembly for the State-characteristic payloads
//! (spec §4.6/§4.7/§6). No JSON library is used here: the 200-byte scan
//! truncation logic (see `build_ssid_payload`) needs byte-exact control
//! over a partially-built payload that a generic serializer would make
//! awkward to reason about, and every other payload shape is small and
//! fixed enough that hand assembly is simpler than pulling in a
//! dependency for it.

use crate::gatt::constants::NOTIFICATION_CAP_BYTES;

/// Escapes a string for embedding in one of our JSON payloads: the
/// escape set spec §6/§8 calls out (`\\ \" \n \r \t`), with any other
/// control character (`< 0x20`) replaced by `?` rather than escaped,
/// so the result never needs a `\u00XX` encoder.
pub fn escape_json_string(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push('?'),
            c => out.push(c),
        }
    }
    out
}

pub fn state_payload(state: &str) -> Vec<u8> {
    format!(r#"{{"state":"{}"}}"#, state).into_bytes()
}

pub fn connected_payload(ssid: &str, ip: &str) -> Vec<u8> {
    format!(
        r#"{{"state":"CONNECTED","ssid":"{}","ip":"{}"}}"#,
        escape_json_string(ssid),
        escape_json_string(ip)
    )
    .into_bytes()
}

/// Builds `{"op":"wifi_scan","ssids":[...]}`, appending SSIDs one at a
/// time and stopping *before* the running total would exceed
/// `NOTIFICATION_CAP_BYTES` including the closing `]}`. No entry is
/// ever partially included (spec invariants 2 and 3).
pub fn ssid_scan_payload(ssids: &[String]) -> Vec<u8> {
    const PREFIX: &str = r#"{"op":"wifi_scan","ssids":["#;
    const SUFFIX: &str = "]}";

    let mut body = String::new();
    let mut first = true;

    for ssid in ssids {
        let escaped = escape_json_string(ssid);
        let entry_len = escaped.len() + 2 + if first { 0 } else { 1 }; // quotes + optional comma
        let prospective_total = PREFIX.len() + body.len() + entry_len + SUFFIX.len();
        if prospective_total > NOTIFICATION_CAP_BYTES {
            break;
        }
        if !first {
            body.push(',');
        }
        body.push('"');
        body.push_str(&escaped);
        body.push('"');
        first = false;
    }

    let mut out = String::with_capacity(PREFIX.len() + body.len() + SUFFIX.len());
    out.push_str(PREFIX);
    out.push_str(&body);
    out.push_str(SUFFIX);
    out.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_known_set_and_replaces_control_chars() {
        let input = "a\\b\"c\nd\re\tf\u{0001}g";
        assert_eq!(escape_json_string(input), "a\\\\b\\\"c\\nd\\re\\tf?g");
    }

    #[test]
    fn state_payload_matches_frozen_shape() {
        assert_eq!(state_payload("SCANNING"), b"{\"state\":\"SCANNING\"}".to_vec());
    }

    #[test]
    fn connected_payload_escapes_both_fields() {
        let payload = connected_payload("Home\"Net", "192.168.1.20");
        assert_eq!(
            payload,
            b"{\"state\":\"CONNECTED\",\"ssid\":\"Home\\\"Net\",\"ip\":\"192.168.1.20\"}".to_vec()
        );
    }

    #[test]
    fn scan_payload_fresh_scan_scenario_a() {
        let ssids = vec!["HomeNet".to_string(), "Cafe".to_string()];
        let payload = ssid_scan_payload(&ssids);
        assert_eq!(
            payload,
            b"{\"op\":\"wifi_scan\",\"ssids\":[\"HomeNet\",\"Cafe\"]}".to_vec()
        );
        assert!(payload.len() <= NOTIFICATION_CAP_BYTES);
    }

    #[test]
    fn scan_payload_truncates_without_splitting_entries_scenario_b() {
        // 169 'A's is the longest single SSID that still fits under the
        // 200-byte cap together with the fixed `{"op":"wifi_scan",
        // "ssids":[...]}` scaffolding (27-byte prefix + 2 quotes + 2-byte
        // suffix = 31 bytes of overhead); appending "second" after it
        // would push the payload to 209 bytes, so it must be dropped
        // whole rather than splitting it in.
        let long = "A".repeat(169);
        let ssids = vec![long.clone(), "second".to_string()];
        let payload = ssid_scan_payload(&ssids);
        assert!(payload.len() <= NOTIFICATION_CAP_BYTES);
        let text = String::from_utf8(payload).unwrap();
        assert!(text.contains(&long));
        assert!(!text.contains("second"));
    }

    #[test]
    fn scan_payload_never_exceeds_cap_for_many_short_ssids() {
        let ssids: Vec<String> = (0..50).map(|i| format!("net-{}", i)).collect();
        let payload = ssid_scan_payload(&ssids);
        assert!(payload.len() <= NOTIFICATION_CAP_BYTES);
    }

    #[test]
    fn scan_payload_empty_list() {
        let payload = ssid_scan_payload(&[]);
        assert_eq!(payload, b"{\"op\":\"wifi_scan\",\"ssids\":[]}".to_vec());
    }
}
