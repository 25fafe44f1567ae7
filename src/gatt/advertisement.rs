//! The `org.bluez.LEAdvertisement1` object (spec §4.2).
//!
//! Unlike the GATT tree, BlueZ queries this object's properties
//! directly via `org.freedesktop.DBus.Properties.GetAll` rather than
//! through an object-manager snapshot, so this is the one exported
//! object in the daemon that needs a real (if small) hand-rolled
//! `Properties` implementation.

use dbus::arg::{PropMap, RefArg, Variant};
use dbus::MethodErr;
use dbus_crossroads::{Crossroads, IfaceToken};

use crate::gatt::constants::{ADVERTISEMENT_PATH, SERVICE_UUID};

fn properties() -> PropMap {
    let mut props = PropMap::new();
    props.insert(
        "Type".to_string(),
        Variant(Box::new("peripheral".to_string()) as Box<dyn RefArg>),
    );
    props.insert(
        "ServiceUUIDs".to_string(),
        Variant(Box::new(vec![SERVICE_UUID.to_string()]) as Box<dyn RefArg>),
    );
    props.insert(
        "Includes".to_string(),
        Variant(Box::new(vec!["tx-power".to_string(), "local-name".to_string()]) as Box<dyn RefArg>),
    );
    props.insert(
        "Flags".to_string(),
        Variant(Box::new(vec![
            "general-discoverable".to_string(),
            "le-only".to_string(),
        ]) as Box<dyn RefArg>),
    );
    props
}

/// Registers the `org.freedesktop.DBus.Properties` + `org.bluez.LEAdvertisement1`
/// interfaces and inserts the advertisement object into the tree.
pub fn register(cr: &mut Crossroads) {
    let properties_token: IfaceToken<()> =
        cr.register("org.freedesktop.DBus.Properties", |b| {
            b.method(
                "Get",
                ("interface", "name"),
                ("value",),
                move |_ctx, _data: &mut (), (_interface, name): (String, String)| {
                    properties()
                        .get(&name)
                        .cloned()
                        .map(|v| (v,))
                        .ok_or_else(|| MethodErr::failed("NoSuchProperty"))
                },
            );
            b.method(
                "GetAll",
                ("interface",),
                ("props",),
                move |_ctx, _data: &mut (), (_interface,): (String,)| Ok((properties(),)),
            );
            b.method(
                "Set",
                ("interface", "name", "value"),
                (),
                move |_ctx,
                      _data: &mut (),
                      (_interface, _name, _value): (String, String, Variant<Box<dyn RefArg>>)| {
                    Err::<(), _>(MethodErr::failed("ReadOnly"))
                },
            );
        });

    let advertisement_token: IfaceToken<()> = cr.register("org.bluez.LEAdvertisement1", |b| {
        b.method("Release", (), (), move |_ctx, _data: &mut (), (): ()| {
            log::debug!("advertisement released by the Bluetooth stack");
            Ok(())
        });
    });

    cr.insert(
        ADVERTISEMENT_PATH,
        &[properties_token, advertisement_token],
        (),
    );
}
