//! Frozen identifiers (spec §6). These never change at runtime; unlike
//! `Config`, nothing here is environment-overridable — a central that
//! has ever paired with this service depends on these staying put.

use uuid::Uuid;

pub const SERVICE_UUID: Uuid = Uuid::from_u128(0x9a7d0000_7c2a_4f8e_9b32_9b3e6d4a0001);
pub const DEVICE_INFO_UUID: Uuid = Uuid::from_u128(0x9a7d0000_7c2a_4f8e_9b32_9b3e6d4a0002);
pub const STATE_UUID: Uuid = Uuid::from_u128(0x9a7d0000_7c2a_4f8e_9b32_9b3e6d4a0003);
pub const COMMAND_UUID: Uuid = Uuid::from_u128(0x9a7d0000_7c2a_4f8e_9b32_9b3e6d4a0004);

pub const APP_PATH: &str = "/org/bluez/provision";
pub const SERVICE_PATH: &str = "/org/bluez/provision/service0";
pub const DEVICE_INFO_PATH: &str = "/org/bluez/provision/service0/char0";
pub const STATE_PATH: &str = "/org/bluez/provision/service0/char1";
pub const COMMAND_PATH: &str = "/org/bluez/provision/service0/char2";
pub const ADVERTISEMENT_PATH: &str = "/org/bluez/provision/advertisement0";

/// Static `DeviceInfo` read value (spec §6), byte-for-byte.
pub const DEVICE_INFO_JSON: &str =
    r#"{"Company":"PiDevelop.com","Developer":"james@pidevelop.com","project_name":"Provision BLE"}"#;

/// Hard cap on a single GATT notification payload (spec §3/§4.7).
pub const NOTIFICATION_CAP_BYTES: usize = 200;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuids_are_distinct() {
        let all = [SERVICE_UUID, DEVICE_INFO_UUID, STATE_UUID, COMMAND_UUID];
        for i in 0..all.len() {
            for j in 0..all.len() {
                if i != j {
                    assert_ne!(all[i], all[j]);
                }
            }
        }
    }

    #[test]
    fn device_info_json_is_the_frozen_bytes() {
        assert_eq!(
            DEVICE_INFO_JSON.as_bytes(),
            b"{\"Company\":\"PiDevelop.com\",\"Developer\":\"james@pidevelop.com\",\"project_name\":\"Provision BLE\"}"
        );
    }
}
