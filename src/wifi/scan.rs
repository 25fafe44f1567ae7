//! One-shot SSID enumeration against NetworkManager (spec §4.7).

use dbus::arg::PropMap;
use dbus::blocking::SyncConnection;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::dbus_ifaces::network_manager::{
    OrgFreedesktopNetworkManager, OrgFreedesktopNetworkManagerAccessPoint,
    OrgFreedesktopNetworkManagerDeviceWireless, CALL_TIMEOUT, NM_PATH, NM_SERVICE,
};
use crate::error::Error;

/// Time to let NetworkManager populate scan results before we read them
/// back (spec §4.7: "sleeps ~700 ms"). This blocks the dispatcher
/// thread by design (spec §4.10/§9).
const SCAN_SETTLE: Duration = Duration::from_millis(700);

/// RAII guard around the scan-busy flag (spec §3/§5 invariant 4):
/// acquired via compare-and-swap on construction, released on every
/// exit path including early returns, via `Drop`.
struct ScanGuard<'a> {
    busy: &'a AtomicBool,
}

impl<'a> ScanGuard<'a> {
    fn try_acquire(busy: &'a AtomicBool) -> Option<ScanGuard<'a>> {
        busy.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| ScanGuard { busy })
    }
}

impl<'a> Drop for ScanGuard<'a> {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

fn run_scan(iface: &str) -> Result<Vec<(String, u8)>, dbus::Error> {
    let conn = SyncConnection::new_system()?;
    let nm = conn.with_proxy(NM_SERVICE, NM_PATH, CALL_TIMEOUT);
    let device_path = nm.get_device_by_ip_iface(iface)?;
    let device = conn.with_proxy(NM_SERVICE, device_path, CALL_TIMEOUT);

    device.request_scan(PropMap::new())?;
    thread::sleep(SCAN_SETTLE);

    let ap_paths = device.get_all_access_points()?;
    let mut results = Vec::new();
    for ap_path in ap_paths {
        let ap = conn.with_proxy(NM_SERVICE, ap_path, CALL_TIMEOUT);
        let ssid_bytes = ap.ssid()?;
        let strength = ap.strength()?;
        let ssid = String::from_utf8_lossy(&ssid_bytes).to_string();
        if !ssid.is_empty() {
            results.push((ssid, strength));
        }
    }
    Ok(results)
}

/// Deduplicates by SSID keeping the strongest observed signal, then
/// sorts descending by that strength.
fn dedupe_strongest(raw: Vec<(String, u8)>) -> Vec<String> {
    use std::collections::HashMap;
    let mut strongest: HashMap<String, u8> = HashMap::new();
    for (ssid, strength) in raw {
        strongest
            .entry(ssid)
            .and_modify(|s| *s = (*s).max(strength))
            .or_insert(strength);
    }
    let mut entries: Vec<(String, u8)> = strongest.into_iter().collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    entries.into_iter().map(|(ssid, _)| ssid).collect()
}

/// Scans `iface` for visible access points. Returns an empty list
/// (without touching NetworkManager) if a scan is already in progress,
/// or if any D-Bus call along the way fails — both are recovered
/// locally per spec §7 (`ScanBusy`/`IpcCall`).
pub fn scan(iface: &str, busy: &Arc<AtomicBool>) -> Vec<String> {
    let _guard = match ScanGuard::try_acquire(busy) {
        Some(guard) => guard,
        None => {
            log::warn!("{}", Error::ScanBusy);
            return Vec::new();
        }
    };

    match run_scan(iface) {
        Ok(raw) => {
            let ssids = dedupe_strongest(raw);
            log::info!("wifi scan on {} found {} unique ssid(s)", iface, ssids.len());
            ssids
        }
        Err(err) => {
            log::error!("wifi scan on {} failed: {}", iface, err);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedupe_keeps_strongest_and_sorts_descending() {
        let raw = vec![
            ("HomeNet".to_string(), 80),
            ("HomeNet".to_string(), 60),
            ("Cafe".to_string(), 40),
        ];
        assert_eq!(dedupe_strongest(raw), vec!["HomeNet".to_string(), "Cafe".to_string()]);
    }

    #[test]
    fn scan_guard_releases_on_drop() {
        let busy = AtomicBool::new(false);
        {
            let _guard = ScanGuard::try_acquire(&busy).expect("should acquire");
            assert!(busy.load(Ordering::Acquire));
        }
        assert!(!busy.load(Ordering::Acquire));
    }

    #[test]
    fn scan_guard_refuses_concurrent_acquire() {
        let busy = AtomicBool::new(false);
        let first = ScanGuard::try_acquire(&busy).expect("first acquire succeeds");
        assert!(ScanGuard::try_acquire(&busy).is_none());
        drop(first);
        assert!(ScanGuard::try_acquire(&busy).is_some());
    }
}
