//! The object-manager root and the shared `org.bluez.GattCharacteristic1`
//! interface (spec §4.3/§4.4).
//!
//! `GetManagedObjects` is hand-assembled here rather than derived from
//! crossroads' own property bookkeeping, because the wire-visible shape
//! of this response (one `org.bluez.GattService1` entry, three
//! `org.bluez.GattCharacteristic1` entries, nothing more) is exactly
//! what spec §4.3 freezes and is simplest to reason about as a literal
//! value rather than through a generic property-registration layer.

use dbus::arg::{PropMap, RefArg, Variant};
use dbus::{MethodErr, Path};
use dbus_crossroads::{Context, Crossroads, IfaceToken};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::gatt::constants::{
    APP_PATH, COMMAND_PATH, DEVICE_INFO_PATH, SERVICE_PATH, SERVICE_UUID, STATE_PATH,
};
use crate::gatt::registry::CharacteristicRegistry;

type ManagedObjects = HashMap<Path<'static>, HashMap<String, PropMap>>;

fn service_entry() -> HashMap<String, PropMap> {
    let mut props = PropMap::new();
    props.insert(
        "UUID".to_string(),
        Variant(Box::new(SERVICE_UUID.to_string()) as Box<dyn RefArg>),
    );
    props.insert("Primary".to_string(), Variant(Box::new(true) as Box<dyn RefArg>));
    props.insert(
        "Includes".to_string(),
        Variant(Box::new(Vec::<Path<'static>>::new()) as Box<dyn RefArg>),
    );

    let mut iface = HashMap::new();
    iface.insert("org.bluez.GattService1".to_string(), props);
    iface
}

fn characteristic_entry(
    registry: &CharacteristicRegistry,
    path: &Path<'static>,
) -> HashMap<String, PropMap> {
    let mut props = PropMap::new();
    if let Some(characteristic) = registry.get(path) {
        props.insert(
            "UUID".to_string(),
            Variant(Box::new(characteristic.uuid.to_string()) as Box<dyn RefArg>),
        );
        props.insert(
            "Service".to_string(),
            Variant(Box::new(characteristic.service_path.clone()) as Box<dyn RefArg>),
        );
        props.insert(
            "Flags".to_string(),
            Variant(Box::new(characteristic.flags_strings()) as Box<dyn RefArg>),
        );
        props.insert(
            "Descriptors".to_string(),
            Variant(Box::new(Vec::<Path<'static>>::new()) as Box<dyn RefArg>),
        );
    }

    let mut iface = HashMap::new();
    iface.insert("org.bluez.GattCharacteristic1".to_string(), props);
    iface
}

fn managed_objects(registry: &CharacteristicRegistry) -> ManagedObjects {
    let mut objects = ManagedObjects::new();
    objects.insert(Path::new(SERVICE_PATH).unwrap(), service_entry());

    for path in [
        Path::new(DEVICE_INFO_PATH).unwrap(),
        Path::new(STATE_PATH).unwrap(),
        Path::new(COMMAND_PATH).unwrap(),
    ] {
        let entry = characteristic_entry(registry, &path);
        objects.insert(path, entry);
    }

    objects
}

/// Registers `org.freedesktop.DBus.ObjectManager` at `APP_PATH`.
pub fn register_object_manager(cr: &mut Crossroads, registry: Rc<RefCell<CharacteristicRegistry>>) {
    let token: IfaceToken<()> = cr.register("org.freedesktop.DBus.ObjectManager", move |b| {
        let registry = registry.clone();
        b.method(
            "GetManagedObjects",
            (),
            ("objects",),
            move |_ctx: &mut Context, _data: &mut (), (): ()| {
                Ok((managed_objects(&registry.borrow()),))
            },
        );
    });

    cr.insert(APP_PATH, &[token], ());
}

/// Registers the shared `org.bluez.GattCharacteristic1` interface and
/// inserts all three characteristic objects, keyed by their own path
/// (the per-object crossroads "data"), so a single interface
/// implementation serves DeviceInfo/State/Command alike.
pub fn register_characteristics(cr: &mut Crossroads, registry: Rc<RefCell<CharacteristicRegistry>>) {
    let token: IfaceToken<Path<'static>> = {
        let registry_read = registry.clone();
        let registry_write = registry.clone();
        let registry_notify = registry.clone();

        cr.register("org.bluez.GattCharacteristic1", move |b| {
            let registry_read = registry_read.clone();
            b.method(
                "ReadValue",
                ("options",),
                ("value",),
                move |_ctx: &mut Context, path: &mut Path<'static>, (_options,): (PropMap,)| {
                    let registry = registry_read.borrow();
                    match registry.get(path).and_then(|c| c.read_value()) {
                        Some(value) => Ok((value,)),
                        None => Err(MethodErr::failed("NotSupported")),
                    }
                },
            );

            let registry_write = registry_write.clone();
            b.method(
                "WriteValue",
                ("value", "options"),
                (),
                move |_ctx: &mut Context,
                      path: &mut Path<'static>,
                      (value, _options): (Vec<u8>, PropMap)| {
                    // Only an immutable borrow: the write callback this
                    // invokes may itself call `notify_value` on another
                    // characteristic in the same registry, from the
                    // same call stack.
                    let registry = registry_write.borrow();
                    match registry.get(path) {
                        Some(characteristic) if characteristic.write_value(&value) => Ok(()),
                        Some(_) => Err(MethodErr::failed("NotSupported")),
                        None => Err(MethodErr::failed("NotSupported")),
                    }
                },
            );

            let registry_notify_start = registry_notify.clone();
            b.method(
                "StartNotify",
                (),
                (),
                move |_ctx: &mut Context, path: &mut Path<'static>, (): ()| {
                    let registry = registry_notify_start.borrow();
                    if let Some(characteristic) = registry.get(path) {
                        characteristic.set_notifying(true);
                    }
                    Ok(())
                },
            );

            let registry_notify_stop = registry_notify.clone();
            b.method(
                "StopNotify",
                (),
                (),
                move |_ctx: &mut Context, path: &mut Path<'static>, (): ()| {
                    let registry = registry_notify_stop.borrow();
                    if let Some(characteristic) = registry.get(path) {
                        characteristic.set_notifying(false);
                    }
                    Ok(())
                },
            );
        })
    };

    for path in [
        Path::new(DEVICE_INFO_PATH).unwrap(),
        Path::new(STATE_PATH).unwrap(),
        Path::new(COMMAND_PATH).unwrap(),
    ] {
        cr.insert(path.clone(), &[token], path.clone());
    }
}
