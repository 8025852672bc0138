//! reactive::ref_counter
//!
//! Reference-counted registry entries.
//!
//! A [`RefRegistry`] maps keys to shared values. Every
//! [`checkout`](RefRegistry::checkout) bumps the entry's count and returns a
//! [`RefGuard`]; dropping the guard releases the reference, and the entry
//! is evicted when the last guard goes away.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::rc::{Rc, Weak};

use tracing::error;

/// A value and the number of live references to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefCounter<T> {
    value: T,
    count: usize,
}

impl<T> RefCounter<T> {
    /// A counter with no references yet.
    pub fn new(value: T) -> Self {
        Self { value, count: 0 }
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn value_mut(&mut self) -> &mut T {
        &mut self.value
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn increment(&mut self) {
        self.count += 1;
    }

    /// Saturates at zero.
    pub fn decrement(&mut self) {
        self.count = self.count.saturating_sub(1);
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

type Entries<K, V> = RefCell<HashMap<K, RefCounter<V>>>;

/// Keyed, reference-counted storage.
///
/// Clones share the same entries.
///
/// ```
/// use metabind::reactive::RefRegistry;
///
/// let registry: RefRegistry<&str, u32> = RefRegistry::new();
/// let a = registry.checkout("tpl", || 1);
/// let b = registry.checkout("tpl", || 2);
/// assert_eq!(registry.get(&"tpl"), Some(1));
///
/// drop(a);
/// assert_eq!(registry.count(&"tpl"), 1);
/// drop(b);
/// assert!(!registry.contains(&"tpl"));
/// ```
pub struct RefRegistry<K, V> {
    entries: Rc<Entries<K, V>>,
}

impl<K, V> Clone for RefRegistry<K, V> {
    fn clone(&self) -> Self {
        Self {
            entries: Rc::clone(&self.entries),
        }
    }
}

impl<K, V> Default for RefRegistry<K, V> {
    fn default() -> Self {
        Self {
            entries: Rc::new(RefCell::new(HashMap::new())),
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for RefRegistry<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries.borrow().iter()).finish()
    }
}

impl<K: Eq + Hash + Clone, V> RefRegistry<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a reference to `key`, creating the entry with `make` if absent.
    pub fn checkout(&self, key: K, make: impl FnOnce() -> V) -> RefGuard<K, V> {
        self.entries
            .borrow_mut()
            .entry(key.clone())
            .or_insert_with(|| RefCounter::new(make()))
            .increment();
        RefGuard {
            key,
            entries: Rc::downgrade(&self.entries),
        }
    }

    /// Take a reference to `key`, storing `value` if the entry is new.
    pub fn checkout_with(&self, key: K, value: V) -> RefGuard<K, V> {
        self.checkout(key, || value)
    }

    /// Replace the value of a live entry. `false` if there is none.
    pub fn replace(&self, key: &K, value: V) -> bool {
        match self.entries.borrow_mut().get_mut(key) {
            Some(counter) => {
                *counter.value_mut() = value;
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.borrow().contains_key(key)
    }

    pub fn count(&self, key: &K) -> usize {
        self.entries.borrow().get(key).map_or(0, RefCounter::count)
    }

    pub fn with<R>(&self, key: &K, f: impl FnOnce(&V) -> R) -> Option<R> {
        self.entries.borrow().get(key).map(|c| f(c.value()))
    }

    pub fn keys(&self) -> Vec<K> {
        self.entries.borrow().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl<K: Eq + Hash + Clone, V: Clone> RefRegistry<K, V> {
    pub fn get(&self, key: &K) -> Option<V> {
        self.with(key, V::clone)
    }
}

/// One reference to a registry entry. Released on drop.
pub struct RefGuard<K: Eq + Hash, V> {
    key: K,
    entries: Weak<Entries<K, V>>,
}

impl<K: Eq + Hash, V> RefGuard<K, V> {
    pub fn key(&self) -> &K {
        &self.key
    }
}

impl<K: Eq + Hash + fmt::Debug, V> fmt::Debug for RefGuard<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefGuard").field("key", &self.key).finish()
    }
}

impl<K: Eq + Hash, V> Drop for RefGuard<K, V> {
    fn drop(&mut self) {
        let Some(entries) = self.entries.upgrade() else {
            return;
        };
        let Ok(mut entries) = entries.try_borrow_mut() else {
            error!("registry entry released while the registry is borrowed");
            return;
        };
        let evict = match entries.get_mut(&self.key) {
            Some(counter) => {
                counter.decrement();
                counter.is_empty()
            }
            None => false,
        };
        if evict {
            entries.remove(&self.key);
        }
    }
}
