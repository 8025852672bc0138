//! reactive::signal
//!
//! Single-value cells with ordered change listeners.
//!
//! # Invariants
//!
//! 1. `set` notifies every registered listener exactly once, synchronously,
//!    in registration order.
//! 2. `set_direct` updates the value without notifying anyone.
//! 3. A listener unregistered while a notification is in flight is not
//!    called for the rest of that notification.
//! 4. No borrow is held while listeners run, so a listener may read, set,
//!    or unregister on the signal that called it.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// Handle returned by [`Signal::register_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener<T> = Rc<dyn Fn(&T)>;

struct Inner<T> {
    value: RefCell<T>,
    listeners: RefCell<Vec<(ListenerId, Listener<T>)>>,
    next_id: Cell<u64>,
}

/// A shared mutable value with change listeners.
///
/// Clones share the same cell.
///
/// # Example
///
/// ```
/// use metabind::reactive::Signal;
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let signal = Signal::new(0);
/// let seen = Rc::new(RefCell::new(Vec::new()));
/// let sink = Rc::clone(&seen);
/// signal.register_listener(move |v| sink.borrow_mut().push(*v));
///
/// signal.set(1);
/// signal.set_direct(2);
/// assert_eq!(*seen.borrow(), vec![1]);
/// assert_eq!(signal.get(), 2);
/// ```
pub struct Signal<T> {
    inner: Rc<Inner<T>>,
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("value", &self.inner.value.borrow())
            .field("listeners", &self.inner.listeners.borrow().len())
            .finish()
    }
}

impl<T: Default + Clone + 'static> Default for Signal<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + 'static> Signal<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(Inner {
                value: RefCell::new(value),
                listeners: RefCell::new(Vec::new()),
                next_id: Cell::new(0),
            }),
        }
    }

    pub fn get(&self) -> T {
        self.inner.value.borrow().clone()
    }

    /// Borrow the current value without cloning it.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.borrow())
    }

    /// Store `value` and notify every listener.
    pub fn set(&self, value: T) {
        *self.inner.value.borrow_mut() = value.clone();
        self.notify(&value);
    }

    /// Store `value` without notifying.
    pub fn set_direct(&self, value: T) {
        *self.inner.value.borrow_mut() = value;
    }

    pub fn register_listener(&self, listener: impl Fn(&T) + 'static) -> ListenerId {
        let id = ListenerId(self.inner.next_id.get());
        self.inner.next_id.set(id.0 + 1);
        self.inner
            .listeners
            .borrow_mut()
            .push((id, Rc::new(listener)));
        id
    }

    /// Returns whether the listener was registered.
    pub fn unregister_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.inner.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|(lid, _)| *lid != id);
        listeners.len() != before
    }

    pub fn unregister_all(&self) {
        self.inner.listeners.borrow_mut().clear();
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.borrow().len()
    }

    fn is_registered(&self, id: ListenerId) -> bool {
        self.inner
            .listeners
            .borrow()
            .iter()
            .any(|(lid, _)| *lid == id)
    }

    fn notify(&self, value: &T) {
        let snapshot: Vec<(ListenerId, Listener<T>)> = self
            .inner
            .listeners
            .borrow()
            .iter()
            .map(|(id, l)| (*id, Rc::clone(l)))
            .collect();
        for (id, listener) in snapshot {
            if self.is_registered(id) {
                listener(value);
            }
        }
    }
}

/// Something a subscription can push values into.
///
/// Implemented by [`Signal`] and [`MappedSignal`] so a consumer can keep
/// its own value type while the engine deals in raw metadata.
pub trait SignalLike<In> {
    /// Store and notify.
    fn set(&self, value: In);
    /// Store without notifying.
    fn set_direct(&self, value: In);
}

impl<T: Clone + 'static> SignalLike<T> for Signal<T> {
    fn set(&self, value: T) {
        Signal::set(self, value);
    }

    fn set_direct(&self, value: T) {
        Signal::set_direct(self, value);
    }
}

/// A signal that converts raw input into a domain value before storing it.
///
/// Input that `map` rejects stores the default instead.
///
/// ```
/// use metabind::reactive::MappedSignal;
/// use metabind::core::literal::to_float;
/// use serde_json::json;
///
/// let slider = MappedSignal::new(0.0, |raw: &serde_json::Value| to_float(raw));
/// slider.set(json!("2.5"));
/// assert_eq!(slider.get(), 2.5);
/// slider.set(json!("high"));
/// assert_eq!(slider.get(), 0.0);
/// ```
pub struct MappedSignal<Raw, T> {
    signal: Signal<T>,
    default: T,
    map: Rc<dyn Fn(&Raw) -> Option<T>>,
}

impl<Raw, T: Clone> Clone for MappedSignal<Raw, T> {
    fn clone(&self) -> Self {
        Self {
            signal: self.signal.clone(),
            default: self.default.clone(),
            map: Rc::clone(&self.map),
        }
    }
}

impl<Raw, T: Clone + 'static> MappedSignal<Raw, T> {
    pub fn new(default: T, map: impl Fn(&Raw) -> Option<T> + 'static) -> Self {
        Self {
            signal: Signal::new(default.clone()),
            default,
            map: Rc::new(map),
        }
    }

    pub fn get(&self) -> T {
        self.signal.get()
    }

    pub fn default_value(&self) -> &T {
        &self.default
    }

    /// The underlying signal holding mapped values.
    pub fn signal(&self) -> &Signal<T> {
        &self.signal
    }

    pub fn map(&self, raw: &Raw) -> T {
        (self.map)(raw).unwrap_or_else(|| self.default.clone())
    }

    pub fn set(&self, raw: Raw) {
        self.signal.set(self.map(&raw));
    }

    pub fn set_direct(&self, raw: Raw) {
        self.signal.set_direct(self.map(&raw));
    }

    pub fn register_listener(&self, listener: impl Fn(&T) + 'static) -> ListenerId {
        self.signal.register_listener(listener)
    }

    pub fn unregister_listener(&self, id: ListenerId) -> bool {
        self.signal.unregister_listener(id)
    }

    pub fn unregister_all(&self) {
        self.signal.unregister_all();
    }
}

impl<Raw, T: Clone + 'static> SignalLike<Raw> for MappedSignal<Raw, T> {
    fn set(&self, value: Raw) {
        MappedSignal::set(self, value);
    }

    fn set_direct(&self, value: Raw) {
        MappedSignal::set_direct(self, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder<T: Clone + 'static>(signal: &Signal<T>, tag: &'static str, log: &Rc<RefCell<Vec<String>>>) -> ListenerId
    where
        T: fmt::Debug,
    {
        let log = Rc::clone(log);
        signal.register_listener(move |v| log.borrow_mut().push(format!("{tag}:{v:?}")))
    }

    mod notify {
        use super::*;

        #[test]
        fn registration_order() {
            let signal = Signal::new(0);
            let log = Rc::new(RefCell::new(Vec::new()));
            recorder(&signal, "a", &log);
            recorder(&signal, "b", &log);
            recorder(&signal, "c", &log);

            signal.set(7);

            assert_eq!(*log.borrow(), vec!["a:7", "b:7", "c:7"]);
        }

        #[test]
        fn set_direct_is_silent() {
            let signal = Signal::new("x".to_string());
            let log = Rc::new(RefCell::new(Vec::new()));
            recorder(&signal, "a", &log);

            signal.set_direct("y".into());

            assert!(log.borrow().is_empty());
            assert_eq!(signal.get(), "y");
        }

        #[test]
        fn unregister_all_silences() {
            let signal = Signal::new(0);
            let log = Rc::new(RefCell::new(Vec::new()));
            recorder(&signal, "a", &log);
            recorder(&signal, "b", &log);

            signal.unregister_all();
            signal.set(1);

            assert!(log.borrow().is_empty());
            assert_eq!(signal.listener_count(), 0);
        }

        #[test]
        fn unregister_one() {
            let signal = Signal::new(0);
            let log = Rc::new(RefCell::new(Vec::new()));
            let a = recorder(&signal, "a", &log);
            recorder(&signal, "b", &log);

            assert!(signal.unregister_listener(a));
            assert!(!signal.unregister_listener(a));
            signal.set(1);

            assert_eq!(*log.borrow(), vec!["b:1"]);
        }
    }

    mod reentrancy {
        use super::*;

        #[test]
        fn listener_unregisters_later_listener() {
            let signal = Signal::new(0);
            let log = Rc::new(RefCell::new(Vec::new()));
            let later = Rc::new(Cell::new(None));

            let s = signal.clone();
            let l = Rc::clone(&later);
            signal.register_listener(move |_| {
                if let Some(id) = l.get() {
                    s.unregister_listener(id);
                }
            });
            later.set(Some(recorder(&signal, "b", &log)));

            signal.set(1);

            assert!(log.borrow().is_empty());
        }

        #[test]
        fn listener_reads_signal() {
            let signal = Signal::new(0);
            let seen = Rc::new(Cell::new(0));
            let s = signal.clone();
            let out = Rc::clone(&seen);
            signal.register_listener(move |_| out.set(s.get()));

            signal.set(5);

            assert_eq!(seen.get(), 5);
        }
    }

    mod mapped {
        use super::*;

        #[test]
        fn maps_and_falls_back() {
            let signal: MappedSignal<String, i64> = MappedSignal::new(-1, |raw: &String| raw.parse().ok());
            let log = Rc::new(RefCell::new(Vec::new()));
            let sink = Rc::clone(&log);
            signal.register_listener(move |v| sink.borrow_mut().push(*v));

            signal.set("4".into());
            signal.set("four".into());

            assert_eq!(*log.borrow(), vec![4, -1]);
            assert_eq!(*signal.default_value(), -1);
        }

        #[test]
        fn usable_as_signal_like() {
            let signal: MappedSignal<String, usize> = MappedSignal::new(0, |raw: &String| Some(raw.len()));
            let sink: Box<dyn SignalLike<String>> = Box::new(signal.clone());
            sink.set_direct("abc".into());
            assert_eq!(signal.get(), 3);
        }
    }
}
