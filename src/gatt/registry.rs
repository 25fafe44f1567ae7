//! The characteristic registry: path → `Characteristic`, plus the
//! `notify_value` entry point (spec §4.4) that every event source in
//! the dispatcher funnels through to push a GATT notification.

use dbus::Path;
use std::collections::HashMap;

use crate::gatt::characteristic::Characteristic;
use crate::ipc::IpcConnection;

pub struct CharacteristicRegistry {
    chars: HashMap<Path<'static>, Characteristic>,
}

impl CharacteristicRegistry {
    pub fn new() -> CharacteristicRegistry {
        CharacteristicRegistry {
            chars: HashMap::new(),
        }
    }

    pub fn insert(&mut self, path: Path<'static>, characteristic: Characteristic) {
        self.chars.insert(path, characteristic);
    }

    pub fn get(&self, path: &Path<'static>) -> Option<&Characteristic> {
        self.chars.get(path)
    }

    /// Pushes `bytes` as the new cached value for the characteristic at
    /// `path` and emits a `PropertiesChanged` notification for it, but
    /// only if a central is currently subscribed. No-ops (with a log
    /// line) if the path is unknown or nobody is subscribed — the two
    /// cases spec §4.4 calls out explicitly.
    ///
    /// Takes `&self`, not `&mut self`: a write callback on one
    /// characteristic routinely calls this to notify a different one
    /// from the same call stack, and the registry's own `RefCell` must
    /// stay immutably borrowed for that to work without panicking.
    pub fn notify_value(&self, ipc: &IpcConnection, path: &Path<'static>, bytes: Vec<u8>) {
        let characteristic = match self.chars.get(path) {
            Some(c) => c,
            None => {
                log::warn!("notify_value: no characteristic registered at {}", path);
                return;
            }
        };

        if !characteristic.notifying.get() {
            return;
        }

        *characteristic.cached_value.borrow_mut() = Some(bytes.clone());

        ipc.emit_property_changed(
            path,
            "org.bluez.GattCharacteristic1",
            "Value",
            dbus::arg::Variant(Box::new(bytes)),
        );
    }
}

impl Default for CharacteristicRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gatt::characteristic::CharacteristicFlags;
    use uuid::Uuid;

    fn service_path() -> Path<'static> {
        Path::new("/org/bluez/provision/service0").unwrap()
    }

    fn char_path() -> Path<'static> {
        Path::new("/org/bluez/provision/service0/char1").unwrap()
    }

    #[test]
    fn unknown_path_is_a_noop() {
        // Can't easily construct a live IpcConnection in a unit test
        // (it needs a system bus); exercise the lookup miss directly.
        let registry = CharacteristicRegistry::new();
        assert!(registry.get(&char_path()).is_none());
    }

    #[test]
    fn not_notifying_keeps_cache_untouched() {
        let mut registry = CharacteristicRegistry::new();
        let c = Characteristic::new(Uuid::nil(), service_path(), CharacteristicFlags::NOTIFY);
        registry.insert(char_path(), c);
        // Without notifying=true, notify_value should leave the cache
        // alone; we verify the precondition check directly since the
        // IPC signal emission itself requires a live connection.
        assert!(!registry.get(&char_path()).unwrap().notifying.get());
    }
}
