//! `org.bluez.*` proxy traits: adapter properties, GATT application
//! registration, and LE advertisement registration.

use dbus::arg::{PropMap, RefArg, Variant};
use dbus::blocking::stdintf::org_freedesktop_dbus::Properties;
use dbus::blocking::{BlockingSender, Proxy};
use dbus::Path;
use std::collections::HashMap;
use std::time::Duration;

pub const BLUEZ_SERVICE: &str = "org.bluez";
pub const ADAPTER_IFACE: &str = "org.bluez.Adapter1";
pub const GATT_MANAGER_IFACE: &str = "org.bluez.GattManager1";
pub const LE_ADVERTISING_MANAGER_IFACE: &str = "org.bluez.LEAdvertisingManager1";

/// Options dict keyed by object path, passed to `RegisterApplication`.
pub type RegisterOptions = HashMap<String, Variant<Box<dyn RefArg>>>;

pub trait OrgBluezAdapter1 {
    fn powered(&self) -> Result<bool, dbus::Error>;
    fn set_powered(&self, value: bool) -> Result<(), dbus::Error>;
    fn alias(&self) -> Result<String, dbus::Error>;
    fn set_alias(&self, value: String) -> Result<(), dbus::Error>;
    fn uuids(&self) -> Result<Vec<String>, dbus::Error>;
}

impl<'a, T: BlockingSender, C: ::std::ops::Deref<Target = T>> OrgBluezAdapter1 for Proxy<'a, C> {
    fn powered(&self) -> Result<bool, dbus::Error> {
        <Self as Properties>::get(self, ADAPTER_IFACE, "Powered")
    }

    fn set_powered(&self, value: bool) -> Result<(), dbus::Error> {
        <Self as Properties>::set(self, ADAPTER_IFACE, "Powered", value)
    }

    fn alias(&self) -> Result<String, dbus::Error> {
        <Self as Properties>::get(self, ADAPTER_IFACE, "Alias")
    }

    fn set_alias(&self, value: String) -> Result<(), dbus::Error> {
        <Self as Properties>::set(self, ADAPTER_IFACE, "Alias", value)
    }

    fn uuids(&self) -> Result<Vec<String>, dbus::Error> {
        <Self as Properties>::get(self, ADAPTER_IFACE, "UUIDs")
    }
}

pub trait OrgBluezGattManager1 {
    fn register_application(
        &self,
        application: Path<'static>,
        options: PropMap,
    ) -> Result<(), dbus::Error>;
    fn unregister_application(&self, application: Path<'static>) -> Result<(), dbus::Error>;
}

impl<'a, T: BlockingSender, C: ::std::ops::Deref<Target = T>> OrgBluezGattManager1
    for Proxy<'a, C>
{
    fn register_application(
        &self,
        application: Path<'static>,
        options: PropMap,
    ) -> Result<(), dbus::Error> {
        self.method_call(
            GATT_MANAGER_IFACE,
            "RegisterApplication",
            (application, options),
        )
    }

    fn unregister_application(&self, application: Path<'static>) -> Result<(), dbus::Error> {
        self.method_call(GATT_MANAGER_IFACE, "UnregisterApplication", (application,))
    }
}

pub trait OrgBluezLeAdvertisingManager1 {
    fn register_advertisement(
        &self,
        advertisement: Path<'static>,
        options: PropMap,
    ) -> Result<(), dbus::Error>;
    fn unregister_advertisement(&self, advertisement: Path<'static>) -> Result<(), dbus::Error>;
}

impl<'a, T: BlockingSender, C: ::std::ops::Deref<Target = T>> OrgBluezLeAdvertisingManager1
    for Proxy<'a, C>
{
    fn register_advertisement(
        &self,
        advertisement: Path<'static>,
        options: PropMap,
    ) -> Result<(), dbus::Error> {
        self.method_call(
            LE_ADVERTISING_MANAGER_IFACE,
            "RegisterAdvertisement",
            (advertisement, options),
        )
    }

    fn unregister_advertisement(&self, advertisement: Path<'static>) -> Result<(), dbus::Error> {
        self.method_call(
            LE_ADVERTISING_MANAGER_IFACE,
            "UnregisterAdvertisement",
            (advertisement,),
        )
    }
}

/// Timeout used for every synchronous call through this module; BlueZ
/// method calls (registration, property sets) are expected to complete
/// well within this window.
pub const CALL_TIMEOUT: Duration = Duration::from_secs(10);
