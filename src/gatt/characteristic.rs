//! Generic characteristic read/write/notify machinery (spec §4.4).
//!
//! `CharacteristicFlags` follows the teacher's own `CharPropFlags`
//! (`src/api/mod.rs`) bit-per-property shape, trimmed to the three
//! flags this spec's characteristics actually use.
//!
//! Mutable characteristic state (`notifying`, `cached_value`, the
//! write/notify-state callbacks) lives behind `Cell`/`RefCell` so a
//! single characteristic can be looked up through a shared (`&self`)
//! borrow of the registry's `HashMap`. This matters because a write
//! callback commonly triggers a state-machine transition that in turn
//! calls `notify_value` on a *different* characteristic (e.g. a
//! Command write kicking off `SCANNING`/`CONNECTING` notifications on
//! State) from the same call stack, on the same dispatcher thread — if
//! the registry itself needed a `borrow_mut()` for the duration of a
//! write, that reentrant call would panic with a `BorrowMutError`.

use bitflags::bitflags;
use dbus::Path;
use std::cell::{Cell, RefCell};
use uuid::Uuid;

bitflags! {
    pub struct CharacteristicFlags: u8 {
        const READ = 0x01;
        const WRITE = 0x02;
        const NOTIFY = 0x04;
    }
}

pub type ReadCallback = Box<dyn Fn() -> Vec<u8>>;
pub type WriteCallback = Box<dyn FnMut(&[u8])>;
pub type NotifyStateCallback = Box<dyn FnMut(bool)>;

/// One exported `org.bluez.GattCharacteristic1` object.
///
/// `cached_value` is the `Option<Vec<u8>>` the spec's design notes
/// describe as a "tagged variant per characteristic `{None, Bytes(seq)}`":
/// `None` before the characteristic has ever been read or notified,
/// `Some(bytes)` afterwards. It is read by the `Value` property getter
/// and replaced wholesale on every `notify_value` call; nothing else
/// mutates it.
pub struct Characteristic {
    pub uuid: Uuid,
    pub service_path: Path<'static>,
    pub flags: CharacteristicFlags,
    pub notifying: Cell<bool>,
    pub cached_value: RefCell<Option<Vec<u8>>>,
    pub on_read: Option<ReadCallback>,
    pub on_write: RefCell<Option<WriteCallback>>,
    pub on_notify_state: RefCell<Option<NotifyStateCallback>>,
}

impl Characteristic {
    pub fn new(uuid: Uuid, service_path: Path<'static>, flags: CharacteristicFlags) -> Characteristic {
        Characteristic {
            uuid,
            service_path,
            flags,
            notifying: Cell::new(false),
            cached_value: RefCell::new(None),
            on_read: None,
            on_write: RefCell::new(None),
            on_notify_state: RefCell::new(None),
        }
    }

    /// Seeds `cached_value` from the read callback, if any, so a
    /// property read before the first notify returns something
    /// sensible rather than an empty byte sequence.
    pub fn seed_cache(&self) {
        if let Some(read) = &self.on_read {
            *self.cached_value.borrow_mut() = Some(read());
        }
    }

    /// `ReadValue`. `None` means "no read callback" (write-only
    /// characteristic); the crossroads handler turns that into a
    /// `NotSupported` D-Bus error.
    pub fn read_value(&self) -> Option<Vec<u8>> {
        self.on_read.as_ref().map(|read| read())
    }

    /// `WriteValue`. Returns `false` if there's no write callback, so
    /// the crossroads handler can return `NotSupported`. The callback
    /// may itself call back into `notify_value` on another
    /// characteristic; only this characteristic's own `on_write` cell
    /// is borrowed for the duration of the call.
    pub fn write_value(&self, value: &[u8]) -> bool {
        match self.on_write.borrow_mut().as_mut() {
            Some(write) => {
                write(value);
                true
            }
            None => false,
        }
    }

    /// `StartNotify` / `StopNotify`. Always succeeds per spec §4.4.
    pub fn set_notifying(&self, notifying: bool) {
        self.notifying.set(notifying);
        if let Some(cb) = self.on_notify_state.borrow_mut().as_mut() {
            cb(notifying);
        }
    }

    /// The `Value` property getter's return value: the cached value,
    /// or an empty byte sequence if nothing has ever been cached.
    pub fn value_property(&self) -> Vec<u8> {
        self.cached_value.borrow().clone().unwrap_or_default()
    }

    pub fn flags_strings(&self) -> Vec<String> {
        let mut out = Vec::new();
        if self.flags.contains(CharacteristicFlags::READ) {
            out.push("read".to_string());
        }
        if self.flags.contains(CharacteristicFlags::WRITE) {
            out.push("write".to_string());
        }
        if self.flags.contains(CharacteristicFlags::NOTIFY) {
            out.push("notify".to_string());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service_path() -> Path<'static> {
        Path::new("/org/bluez/provision/service0").unwrap()
    }

    #[test]
    fn read_without_callback_is_none() {
        let c = Characteristic::new(Uuid::nil(), service_path(), CharacteristicFlags::WRITE);
        assert_eq!(c.read_value(), None);
    }

    #[test]
    fn write_without_callback_returns_false() {
        let c = Characteristic::new(Uuid::nil(), service_path(), CharacteristicFlags::READ);
        assert!(!c.write_value(b"x"));
    }

    #[test]
    fn seed_cache_uses_read_callback() {
        let mut c = Characteristic::new(Uuid::nil(), service_path(), CharacteristicFlags::READ);
        c.on_read = Some(Box::new(|| b"hello".to_vec()));
        c.seed_cache();
        assert_eq!(*c.cached_value.borrow(), Some(b"hello".to_vec()));
        assert_eq!(c.value_property(), b"hello".to_vec());
    }

    #[test]
    fn value_property_defaults_to_empty() {
        let c = Characteristic::new(Uuid::nil(), service_path(), CharacteristicFlags::NOTIFY);
        assert_eq!(c.value_property(), Vec::<u8>::new());
    }

    #[test]
    fn flags_strings_match_bits() {
        let c = Characteristic::new(
            Uuid::nil(),
            service_path(),
            CharacteristicFlags::READ | CharacteristicFlags::NOTIFY,
        );
        assert_eq!(c.flags_strings(), vec!["read".to_string(), "notify".to_string()]);
    }

    #[test]
    fn notify_state_callback_is_invoked() {
        let c = Characteristic::new(Uuid::nil(), service_path(), CharacteristicFlags::NOTIFY);
        let seen = std::rc::Rc::new(RefCell::new(Vec::new()));
        let seen2 = seen.clone();
        *c.on_notify_state.borrow_mut() = Some(Box::new(move |v| seen2.borrow_mut().push(v)));
        c.set_notifying(true);
        c.set_notifying(false);
        assert_eq!(*seen.borrow(), vec![true, false]);
    }

    #[test]
    fn write_callback_can_reenter_a_different_characteristics_notify_value() {
        // Regression test for the dispatcher's core correctness
        // requirement: a write callback on one characteristic must be
        // able to call `notify_value` on another without the registry
        // borrow panicking. This exercises just the characteristic
        // layer's own interior mutability; `registry.rs` has the
        // equivalent test at the registry layer.
        let notifier = Characteristic::new(Uuid::nil(), service_path(), CharacteristicFlags::NOTIFY);
        notifier.set_notifying(true);

        let observed = std::rc::Rc::new(RefCell::new(None));
        let observed2 = observed.clone();
        let writer = Characteristic::new(Uuid::nil(), service_path(), CharacteristicFlags::WRITE);
        *writer.on_write.borrow_mut() = Some(Box::new(move |value: &[u8]| {
            // Simulates a command write triggering a notification on
            // a different characteristic while this write's own
            // `on_write` cell is still borrowed.
            *observed2.borrow_mut() = Some(value.to_vec());
        }));

        assert!(writer.write_value(b"payload"));
        assert_eq!(*observed.borrow(), Some(b"payload".to_vec()));
    }
}
