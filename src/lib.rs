//! Headless first-boot Wi-Fi provisioning daemon, exposed as a library
//! so its modules are reachable from integration tests as well as from
//! the thin `main.rs` binary entry point.
//!
//! Wiring order in [`run`]: logger -> config -> D-Bus connection ->
//! adapter discovery -> GATT export -> BlueZ registration -> netlink
//! thread -> dispatcher loop. Anything before the dispatcher loop
//! starts is fatal on failure (spec §7): the caller is expected to log
//! it and exit with code 1.

pub mod config;
pub mod dbus_ifaces;
pub mod dispatcher;
pub mod error;
pub mod gatt;
pub mod ipc;
pub mod logging;
pub mod provisioning;
pub mod wifi;

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::mpsc::{channel, Receiver};
use std::time::Duration;

use dbus::arg::PropMap;
use dbus::blocking::stdintf::org_freedesktop_dbus::ObjectManager;
use dbus::Path;
use log::LevelFilter;

use crate::config::Config;
use crate::dbus_ifaces::bluez::{
    OrgBluezAdapter1, OrgBluezGattManager1, OrgBluezLeAdvertisingManager1, BLUEZ_SERVICE,
    CALL_TIMEOUT, GATT_MANAGER_IFACE, LE_ADVERTISING_MANAGER_IFACE,
};
use crate::dispatcher::{DispatchEvent, DispatcherContext};
use crate::error::{Error, Result};
use crate::gatt::characteristic::{Characteristic, CharacteristicFlags};
use crate::gatt::constants::{
    ADVERTISEMENT_PATH, APP_PATH, COMMAND_PATH, COMMAND_UUID, DEVICE_INFO_JSON, DEVICE_INFO_PATH,
    DEVICE_INFO_UUID, SERVICE_PATH, STATE_PATH, STATE_UUID,
};
use crate::gatt::registry::CharacteristicRegistry;
use crate::gatt::{advertisement, object_manager};
use crate::ipc::IpcConnection;
use crate::wifi::netlink;

/// How long a single `process()` call blocks waiting for D-Bus
/// traffic before the dispatcher loop comes back around to drain
/// `DispatchEvent`s from the netlink and connect-helper threads.
const DISPATCH_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Runs the daemon to completion. Returns only on a startup failure
/// (the dispatcher loop itself never returns); `main` converts an
/// `Err` into the exit-code-1 contract of spec §6.
pub fn run() -> Result<()> {
    let config = Config::from_env();
    logging::FileLogger::init(&config.log_path, LevelFilter::Info);
    log::info!("provision-ble starting up");

    let ipc = IpcConnection::connect()?;
    let adapter_path = find_adapter(&ipc)?;
    log::info!("using bluetooth adapter at {}", adapter_path);

    let (events_tx, events_rx) = channel::<DispatchEvent>();

    let registry = Rc::new(RefCell::new(CharacteristicRegistry::new()));
    let context = Rc::new(RefCell::new(DispatcherContext::new(
        config.clone(),
        ipc.clone(),
        registry.clone(),
        events_tx.clone(),
    )));

    build_gatt_tree(&registry, &context);

    {
        let mut cr = ipc.cr.borrow_mut();
        object_manager::register_object_manager(&mut cr, registry.clone());
        object_manager::register_characteristics(&mut cr, registry.clone());
        advertisement::register(&mut cr);
    }
    ipc.start_serving();

    set_adapter_alias(&ipc, &adapter_path, &config.alias);
    register_gatt_application(&ipc, &adapter_path)?;
    register_advertisement(&ipc, &adapter_path)?;

    match netlink::resolve_if_index(&config.iface) {
        Some(if_index) => netlink::spawn(if_index, events_tx),
        None => log::warn!(
            "wifi interface {} not found at startup; ipv4 readiness will not be observed",
            config.iface
        ),
    }

    log::info!("provisioning daemon ready, entering dispatcher loop");
    dispatcher_loop(&ipc, &context, events_rx);
    Ok(())
}

/// Finds the `org.bluez` adapter object that implements both
/// `GattManager1` and `LEAdvertisingManager1`. Mirrors the teacher's
/// own object-manager probe (`get_existing_peripherals` in
/// `bluez/adapter/mod.rs`), inverted to look for adapter capability
/// interfaces instead of `org.bluez.Device1` entries.
fn find_adapter(ipc: &IpcConnection) -> Result<Path<'static>> {
    let proxy = ipc.conn.with_proxy(BLUEZ_SERVICE, "/", CALL_TIMEOUT);
    let objects = proxy.get_managed_objects().map_err(Error::IpcCall)?;
    for (path, interfaces) in objects {
        if interfaces.contains_key(GATT_MANAGER_IFACE)
            && interfaces.contains_key(LE_ADVERTISING_MANAGER_IFACE)
        {
            return Ok(path);
        }
    }
    Err(Error::AdapterNotFound)
}

/// Runtime IPC call, not a registration: failure is logged and
/// recovered locally per spec §7, not fatal.
fn set_adapter_alias(ipc: &IpcConnection, adapter_path: &Path<'static>, alias: &str) {
    let proxy = ipc
        .conn
        .with_proxy(BLUEZ_SERVICE, adapter_path.clone(), CALL_TIMEOUT);
    if let Err(err) = proxy.set_alias(alias.to_string()) {
        log::warn!("failed to set adapter alias to {}: {}", alias, err);
    }
}

fn register_gatt_application(ipc: &IpcConnection, adapter_path: &Path<'static>) -> Result<()> {
    let proxy = ipc
        .conn
        .with_proxy(BLUEZ_SERVICE, adapter_path.clone(), CALL_TIMEOUT);
    let app_path = Path::new(APP_PATH).expect("APP_PATH is a valid object path");
    proxy
        .register_application(app_path, PropMap::new())
        .map_err(|err| Error::IpcExport(format!("RegisterApplication failed: {}", err)))
}

fn register_advertisement(ipc: &IpcConnection, adapter_path: &Path<'static>) -> Result<()> {
    let proxy = ipc
        .conn
        .with_proxy(BLUEZ_SERVICE, adapter_path.clone(), CALL_TIMEOUT);
    let adv_path = Path::new(ADVERTISEMENT_PATH).expect("ADVERTISEMENT_PATH is a valid object path");
    proxy
        .register_advertisement(adv_path, PropMap::new())
        .map_err(|err| Error::IpcExport(format!("RegisterAdvertisement failed: {}", err)))
}

/// Builds the three characteristic objects and wires their callbacks
/// to the dispatcher context, then inserts them into the registry.
fn build_gatt_tree(
    registry: &Rc<RefCell<CharacteristicRegistry>>,
    context: &Rc<RefCell<DispatcherContext>>,
) {
    let service_path = Path::new(SERVICE_PATH).expect("SERVICE_PATH is a valid object path");

    let mut device_info = Characteristic::new(
        DEVICE_INFO_UUID,
        service_path.clone(),
        CharacteristicFlags::READ,
    );
    device_info.on_read = Some(Box::new(|| DEVICE_INFO_JSON.as_bytes().to_vec()));
    device_info.seed_cache();

    let mut state_char = Characteristic::new(
        STATE_UUID,
        service_path.clone(),
        CharacteristicFlags::READ | CharacteristicFlags::NOTIFY,
    );
    {
        let ctx = context.clone();
        state_char.on_read = Some(Box::new(move || ctx.borrow().current_state_payload()));
    }
    state_char.seed_cache();
    {
        let ctx = context.clone();
        state_char.on_notify_state = RefCell::new(Some(Box::new(move |enabled: bool| {
            if enabled {
                ctx.borrow_mut().on_state_start_notify();
            }
        })));
    }

    let command_char =
        Characteristic::new(COMMAND_UUID, service_path, CharacteristicFlags::WRITE);
    {
        let ctx = context.clone();
        *command_char.on_write.borrow_mut() = Some(Box::new(move |bytes: &[u8]| {
            ctx.borrow_mut().handle_command_write(bytes);
        }));
    }

    let mut registry_mut = registry.borrow_mut();
    registry_mut.insert(
        Path::new(DEVICE_INFO_PATH).expect("DEVICE_INFO_PATH is a valid object path"),
        device_info,
    );
    registry_mut.insert(
        Path::new(STATE_PATH).expect("STATE_PATH is a valid object path"),
        state_char,
    );
    registry_mut.insert(
        Path::new(COMMAND_PATH).expect("COMMAND_PATH is a valid object path"),
        command_char,
    );
}

/// The event-loop dispatcher itself (spec §4.10): alternates servicing
/// the D-Bus connection (which dispatches inbound method calls into
/// the crossroads handlers registered above) with draining
/// `DispatchEvent`s posted by the netlink thread and connect-result
/// helper threads. Runs for the lifetime of the process; there is no
/// exit path out of this loop in normal operation (spec §6).
fn dispatcher_loop(
    ipc: &IpcConnection,
    context: &Rc<RefCell<DispatcherContext>>,
    events_rx: Receiver<DispatchEvent>,
) {
    loop {
        if let Err(err) = ipc.process(DISPATCH_POLL_INTERVAL) {
            log::error!("D-Bus connection processing failed: {}", err);
        }

        while let Ok(event) = events_rx.try_recv() {
            let mut ctx = context.borrow_mut();
            match event {
                DispatchEvent::Ipv4Ready { address } => ctx.handle_ipv4_ready(address),
                DispatchEvent::Ipv4Removed => ctx.handle_ipv4_removed(),
                DispatchEvent::ConnectResult { ssid, ok, error } => {
                    ctx.handle_connect_result(ssid, ok, error)
                }
            }
        }
    }
}
