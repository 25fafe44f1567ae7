//! `org.freedesktop.NetworkManager.*` proxy traits covering the subset
//! of the NetworkManager D-Bus API the Wi-Fi scan/connect/IPv4-lookup
//! components need: finding the Wi-Fi device, requesting a scan,
//! enumerating access points, activating a WPA-PSK connection, and
//! reading back an assigned IPv4 address.

use dbus::arg::{PropMap, RefArg};
use dbus::blocking::stdintf::org_freedesktop_dbus::Properties;
use dbus::blocking::{BlockingSender, Proxy};
use dbus::Path;
use std::collections::HashMap;
use std::time::Duration;

pub const NM_SERVICE: &str = "org.freedesktop.NetworkManager";
pub const NM_PATH: &str = "/org/freedesktop/NetworkManager";
pub const NM_IFACE: &str = "org.freedesktop.NetworkManager";
pub const DEVICE_IFACE: &str = "org.freedesktop.NetworkManager.Device";
pub const WIRELESS_IFACE: &str = "org.freedesktop.NetworkManager.Device.Wireless";
pub const ACCESS_POINT_IFACE: &str = "org.freedesktop.NetworkManager.AccessPoint";
pub const IP4_CONFIG_IFACE: &str = "org.freedesktop.NetworkManager.IP4Config";

/// A connection settings blob: `a{sa{sv}}`, the nested dict NetworkManager
/// expects for `AddAndActivateConnection`.
pub type ConnectionSettings = HashMap<String, PropMap>;

pub const CALL_TIMEOUT: Duration = Duration::from_secs(10);

pub trait OrgFreedesktopNetworkManager {
    fn get_device_by_ip_iface(&self, iface: &str) -> Result<Path<'static>, dbus::Error>;
    fn add_and_activate_connection(
        &self,
        connection: ConnectionSettings,
        device: Path<'static>,
        specific_object: Path<'static>,
    ) -> Result<(Path<'static>, Path<'static>), dbus::Error>;
}

impl<'a, T: BlockingSender, C: ::std::ops::Deref<Target = T>> OrgFreedesktopNetworkManager
    for Proxy<'a, C>
{
    fn get_device_by_ip_iface(&self, iface: &str) -> Result<Path<'static>, dbus::Error> {
        self.method_call(NM_IFACE, "GetDeviceByIpIface", (iface,))
            .map(|r: (Path<'static>,)| r.0)
    }

    fn add_and_activate_connection(
        &self,
        connection: ConnectionSettings,
        device: Path<'static>,
        specific_object: Path<'static>,
    ) -> Result<(Path<'static>, Path<'static>), dbus::Error> {
        self.method_call(
            NM_IFACE,
            "AddAndActivateConnection",
            (connection, device, specific_object),
        )
    }
}

pub trait OrgFreedesktopNetworkManagerDevice {
    fn ip4_config(&self) -> Result<Path<'static>, dbus::Error>;
}

impl<'a, T: BlockingSender, C: ::std::ops::Deref<Target = T>> OrgFreedesktopNetworkManagerDevice
    for Proxy<'a, C>
{
    fn ip4_config(&self) -> Result<Path<'static>, dbus::Error> {
        <Self as Properties>::get(self, DEVICE_IFACE, "Ip4Config")
    }
}

pub trait OrgFreedesktopNetworkManagerDeviceWireless {
    fn request_scan(&self, options: PropMap) -> Result<(), dbus::Error>;
    fn get_all_access_points(&self) -> Result<Vec<Path<'static>>, dbus::Error>;
    fn active_access_point(&self) -> Result<Path<'static>, dbus::Error>;
}

impl<'a, T: BlockingSender, C: ::std::ops::Deref<Target = T>>
    OrgFreedesktopNetworkManagerDeviceWireless for Proxy<'a, C>
{
    fn request_scan(&self, options: PropMap) -> Result<(), dbus::Error> {
        self.method_call(WIRELESS_IFACE, "RequestScan", (options,))
    }

    fn get_all_access_points(&self) -> Result<Vec<Path<'static>>, dbus::Error> {
        self.method_call(WIRELESS_IFACE, "GetAllAccessPoints", ())
            .map(|r: (Vec<Path<'static>>,)| r.0)
    }

    fn active_access_point(&self) -> Result<Path<'static>, dbus::Error> {
        <Self as Properties>::get(self, WIRELESS_IFACE, "ActiveAccessPoint")
    }
}

pub trait OrgFreedesktopNetworkManagerAccessPoint {
    fn ssid(&self) -> Result<Vec<u8>, dbus::Error>;
    fn strength(&self) -> Result<u8, dbus::Error>;
}

impl<'a, T: BlockingSender, C: ::std::ops::Deref<Target = T>>
    OrgFreedesktopNetworkManagerAccessPoint for Proxy<'a, C>
{
    fn ssid(&self) -> Result<Vec<u8>, dbus::Error> {
        <Self as Properties>::get(self, ACCESS_POINT_IFACE, "Ssid")
    }

    fn strength(&self) -> Result<u8, dbus::Error> {
        <Self as Properties>::get(self, ACCESS_POINT_IFACE, "Strength")
    }
}

pub trait OrgFreedesktopNetworkManagerIP4Config {
    /// Array of `{"address": ..., "prefix": ...}` dicts; we only need
    /// the first entry's address string.
    fn address_data(&self) -> Result<Vec<PropMap>, dbus::Error>;
}

impl<'a, T: BlockingSender, C: ::std::ops::Deref<Target = T>>
    OrgFreedesktopNetworkManagerIP4Config for Proxy<'a, C>
{
    fn address_data(&self) -> Result<Vec<PropMap>, dbus::Error> {
        <Self as Properties>::get(self, IP4_CONFIG_IFACE, "AddressData")
    }
}

/// Pulls the dotted-quad out of an `AddressData` entry, if present.
pub fn first_address_string(entries: &[PropMap]) -> Option<String> {
    entries.first().and_then(|entry| {
        entry
            .get("address")
            .and_then(|v| v.0.as_str())
            .map(|s| s.to_string())
    })
}
