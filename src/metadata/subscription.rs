//! metadata::subscription
//!
//! Bindings between consumers and bind targets.
//!
//! # Variants
//!
//! - [`Subscription`]: one signal bound to one target, with write-back.
//! - [`ComputedSubscription`]: one signal derived from several targets,
//!   optionally writing its result to another target. It is driven by one
//!   internal [`DependencySubscription`] per dependency.
//!
//! # Lifecycle
//!
//! ```text
//! Active ──unsubscribe()──▶ Unsubscribed
//!   │
//!   └────delete()─────────▶ Deleted   (on_delete fires once)
//! ```
//!
//! Both transitions are idempotent and safe to trigger from inside a
//! listener of the subscription being torn down. The manager only keeps
//! weak registrations; dropping the last handle unsubscribes.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use serde_json::Value;
use tracing::{debug, warn};

use super::manager::{ManagerError, WeakManager};
use crate::core::declaration::BindTargetDeclaration;
use crate::core::types::{OwnerId, SubscriptionId};
use crate::reactive::SignalLike;

/// The capability set every subscription exposes to the manager.
pub trait MetadataSubscription {
    fn id(&self) -> SubscriptionId;

    fn owner(&self) -> &OwnerId;

    /// The target this subscription reads (or, for computed ones, writes).
    fn bind_target(&self) -> Option<&BindTargetDeclaration>;

    /// Push a value in from storage.
    ///
    /// Returns whether it differed from the last value seen.
    fn on_update(&self, value: &Value) -> bool;

    /// Whether the subscription still accepts updates.
    fn updatable(&self) -> bool;

    /// Every target this subscription reads.
    fn dependencies(&self) -> Vec<BindTargetDeclaration>;

    /// Detach from the manager. Idempotent.
    fn unsubscribe(&self);

    /// Tear down and tell the owner to dispose. Idempotent.
    fn delete(&self);

    fn is_deleted(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    Active,
    Unsubscribed,
    Deleted,
}

type DeleteCallback = Box<dyn FnOnce()>;

/// Shared teardown bookkeeping.
struct Lifecycle {
    state: Cell<SubscriptionState>,
    on_delete: RefCell<Option<DeleteCallback>>,
}

impl Lifecycle {
    fn new(on_delete: Option<DeleteCallback>) -> Self {
        Self {
            state: Cell::new(SubscriptionState::Active),
            on_delete: RefCell::new(on_delete),
        }
    }

    fn is_active(&self) -> bool {
        self.state.get() == SubscriptionState::Active
    }

    /// Move to `Unsubscribed`. `false` if not active.
    fn unsubscribe(&self) -> bool {
        if !self.is_active() {
            return false;
        }
        self.state.set(SubscriptionState::Unsubscribed);
        true
    }

    /// Move to `Deleted`, returning the callback if it has not run yet.
    fn delete(&self) -> Option<DeleteCallback> {
        if self.state.get() == SubscriptionState::Deleted {
            return None;
        }
        let was_active = self.is_active();
        self.state.set(SubscriptionState::Deleted);
        let callback = self.on_delete.borrow_mut().take();
        callback.filter(|_| was_active)
    }
}

/// One consumer's signal bound to one target.
pub struct Subscription {
    id: SubscriptionId,
    owner: OwnerId,
    target: BindTargetDeclaration,
    signal: Box<dyn SignalLike<Value>>,
    /// Last value delivered to or written by the consumer.
    memo: RefCell<Option<Value>>,
    lifecycle: Lifecycle,
    manager: WeakManager,
}

impl Subscription {
    pub(crate) fn new(
        owner: OwnerId,
        target: BindTargetDeclaration,
        signal: Box<dyn SignalLike<Value>>,
        on_delete: Option<DeleteCallback>,
        manager: WeakManager,
    ) -> Self {
        Self {
            id: SubscriptionId::new(),
            owner,
            target,
            signal,
            memo: RefCell::new(None),
            lifecycle: Lifecycle::new(on_delete),
            manager,
        }
    }

    pub fn target(&self) -> &BindTargetDeclaration {
        &self.target
    }

    pub fn state(&self) -> SubscriptionState {
        self.lifecycle.state.get()
    }

    /// The last value this subscription delivered or wrote.
    pub fn value(&self) -> Value {
        self.memo.borrow().clone().unwrap_or(Value::Null)
    }

    /// Write a value from the consumer.
    ///
    /// The signal is updated silently and the source cache immediately;
    /// other subscriptions see the value on the next cycle, this one never
    /// receives it back. A failed write leaves the signal untouched.
    pub fn write(&self, value: Value) -> Result<(), ManagerError> {
        if !self.lifecycle.is_active() {
            return Err(ManagerError::Inactive(self.id));
        }
        let manager = self.manager.upgrade().ok_or(ManagerError::ManagerDropped)?;
        manager.write(&self.target, value.clone(), Some(self.id))?;
        *self.memo.borrow_mut() = Some(value.clone());
        self.signal.set_direct(value);
        Ok(())
    }
}

impl MetadataSubscription for Subscription {
    fn id(&self) -> SubscriptionId {
        self.id
    }

    fn owner(&self) -> &OwnerId {
        &self.owner
    }

    fn bind_target(&self) -> Option<&BindTargetDeclaration> {
        Some(&self.target)
    }

    fn on_update(&self, value: &Value) -> bool {
        if !self.updatable() {
            return false;
        }
        if self.memo.borrow().as_ref() == Some(value) {
            return false;
        }
        *self.memo.borrow_mut() = Some(value.clone());
        self.signal.set(value.clone());
        true
    }

    fn updatable(&self) -> bool {
        self.lifecycle.is_active()
    }

    fn dependencies(&self) -> Vec<BindTargetDeclaration> {
        Vec::new()
    }

    fn unsubscribe(&self) {
        if self.lifecycle.unsubscribe() {
            debug!(id = %self.id, owner = %self.owner, target = %self.target, "unsubscribed");
            if let Some(manager) = self.manager.upgrade() {
                manager.unregister(self.id);
            }
        }
    }

    fn delete(&self) {
        let was_active = self.lifecycle.is_active();
        let callback = self.lifecycle.delete();
        if was_active {
            if let Some(manager) = self.manager.upgrade() {
                manager.unregister(self.id);
            }
        }
        if let Some(callback) = callback {
            callback();
        }
    }

    fn is_deleted(&self) -> bool {
        self.state() == SubscriptionState::Deleted
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("owner", &self.owner)
            .field("target", &self.target)
            .field("state", &self.state())
            .finish()
    }
}

type Compute = Box<dyn Fn(&[Value]) -> Value>;

/// A signal derived from several targets.
pub struct ComputedSubscription {
    id: SubscriptionId,
    owner: OwnerId,
    dependencies: Vec<BindTargetDeclaration>,
    write_target: Option<BindTargetDeclaration>,
    signal: Box<dyn SignalLike<Value>>,
    values: RefCell<Vec<Value>>,
    last: RefCell<Option<Value>>,
    compute: Compute,
    children: RefCell<Vec<Rc<DependencySubscription>>>,
    lifecycle: Lifecycle,
    manager: WeakManager,
}

impl ComputedSubscription {
    pub(crate) fn new(
        owner: OwnerId,
        dependencies: Vec<BindTargetDeclaration>,
        write_target: Option<BindTargetDeclaration>,
        signal: Box<dyn SignalLike<Value>>,
        compute: Compute,
        on_delete: Option<DeleteCallback>,
        manager: WeakManager,
    ) -> Rc<Self> {
        let values = vec![Value::Null; dependencies.len()];
        let parent = Rc::new(Self {
            id: SubscriptionId::new(),
            owner,
            dependencies,
            write_target,
            signal,
            values: RefCell::new(values),
            last: RefCell::new(None),
            compute,
            children: RefCell::new(Vec::new()),
            lifecycle: Lifecycle::new(on_delete),
            manager: manager.clone(),
        });

        let children = parent
            .dependencies
            .iter()
            .enumerate()
            .map(|(index, target)| {
                Rc::new(DependencySubscription {
                    id: SubscriptionId::new(),
                    owner: parent.owner.clone(),
                    index,
                    target: target.clone(),
                    memo: RefCell::new(None),
                    state: Cell::new(SubscriptionState::Active),
                    parent: Rc::downgrade(&parent),
                    manager: manager.clone(),
                })
            })
            .collect();
        *parent.children.borrow_mut() = children;
        parent
    }

    pub fn write_target(&self) -> Option<&BindTargetDeclaration> {
        self.write_target.as_ref()
    }

    pub fn state(&self) -> SubscriptionState {
        self.lifecycle.state.get()
    }

    /// The last computed value.
    pub fn value(&self) -> Value {
        self.last.borrow().clone().unwrap_or(Value::Null)
    }

    pub(crate) fn children(&self) -> Vec<Rc<DependencySubscription>> {
        self.children.borrow().clone()
    }

    /// Seed dependency values without recomputing.
    pub(crate) fn prime(&self, index: usize, value: Value) {
        if let Some(child) = self.children.borrow().get(index) {
            *child.memo.borrow_mut() = Some(value.clone());
        }
        if let Some(slot) = self.values.borrow_mut().get_mut(index) {
            *slot = value;
        }
    }

    fn dependency_changed(&self, index: usize, value: Value) {
        if let Some(slot) = self.values.borrow_mut().get_mut(index) {
            *slot = value;
        }
        self.recompute();
    }

    /// Recompute, notify, and write the result if it changed.
    pub(crate) fn recompute(&self) {
        if !self.lifecycle.is_active() {
            return;
        }
        let result = (self.compute)(&self.values.borrow());
        if self.last.borrow().as_ref() == Some(&result) {
            return;
        }
        *self.last.borrow_mut() = Some(result.clone());
        self.signal.set(result.clone());

        let Some(target) = &self.write_target else {
            return;
        };
        let Some(manager) = self.manager.upgrade() else {
            return;
        };
        if let Err(e) = manager.write(target, result, Some(self.id)) {
            warn!(id = %self.id, target = %target, error = %e, "failed to write computed value");
        }
    }

    fn detach_children(&self) {
        let children = self.children();
        let manager = self.manager.upgrade();
        for child in children {
            if child.state.get() == SubscriptionState::Active {
                child.state.set(SubscriptionState::Unsubscribed);
            }
            if let Some(manager) = &manager {
                manager.unregister(child.id);
            }
        }
        if let Some(manager) = &manager {
            manager.unregister_computed(self.id);
        }
    }
}

impl MetadataSubscription for ComputedSubscription {
    fn id(&self) -> SubscriptionId {
        self.id
    }

    fn owner(&self) -> &OwnerId {
        &self.owner
    }

    fn bind_target(&self) -> Option<&BindTargetDeclaration> {
        self.write_target.as_ref()
    }

    /// Computed subscriptions are driven through their dependencies.
    fn on_update(&self, _value: &Value) -> bool {
        false
    }

    fn updatable(&self) -> bool {
        self.lifecycle.is_active()
    }

    fn dependencies(&self) -> Vec<BindTargetDeclaration> {
        self.dependencies.clone()
    }

    fn unsubscribe(&self) {
        if self.lifecycle.unsubscribe() {
            debug!(id = %self.id, owner = %self.owner, "unsubscribed computed");
            self.detach_children();
        }
    }

    fn delete(&self) {
        let was_active = self.lifecycle.is_active();
        let callback = self.lifecycle.delete();
        if was_active {
            self.detach_children();
        }
        if let Some(callback) = callback {
            callback();
        }
    }

    fn is_deleted(&self) -> bool {
        self.state() == SubscriptionState::Deleted
    }
}

impl Drop for ComputedSubscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl fmt::Debug for ComputedSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComputedSubscription")
            .field("id", &self.id)
            .field("owner", &self.owner)
            .field("dependencies", &self.dependencies)
            .field("write_target", &self.write_target)
            .field("state", &self.state())
            .finish()
    }
}

/// One dependency of a [`ComputedSubscription`].
///
/// Registered with the manager like a plain subscription; deleting it
/// deletes the whole composite.
pub struct DependencySubscription {
    id: SubscriptionId,
    owner: OwnerId,
    index: usize,
    target: BindTargetDeclaration,
    memo: RefCell<Option<Value>>,
    state: Cell<SubscriptionState>,
    parent: Weak<ComputedSubscription>,
    manager: WeakManager,
}

impl MetadataSubscription for DependencySubscription {
    fn id(&self) -> SubscriptionId {
        self.id
    }

    fn owner(&self) -> &OwnerId {
        &self.owner
    }

    fn bind_target(&self) -> Option<&BindTargetDeclaration> {
        Some(&self.target)
    }

    fn on_update(&self, value: &Value) -> bool {
        if !self.updatable() {
            return false;
        }
        if self.memo.borrow().as_ref() == Some(value) {
            return false;
        }
        *self.memo.borrow_mut() = Some(value.clone());
        if let Some(parent) = self.parent.upgrade() {
            parent.dependency_changed(self.index, value.clone());
        }
        true
    }

    fn updatable(&self) -> bool {
        self.state.get() == SubscriptionState::Active
            && self.parent.upgrade().is_some_and(|p| p.updatable())
    }

    fn dependencies(&self) -> Vec<BindTargetDeclaration> {
        vec![self.target.clone()]
    }

    fn unsubscribe(&self) {
        if self.state.get() != SubscriptionState::Active {
            return;
        }
        self.state.set(SubscriptionState::Unsubscribed);
        if let Some(manager) = self.manager.upgrade() {
            manager.unregister(self.id);
        }
    }

    fn delete(&self) {
        if self.state.get() == SubscriptionState::Deleted {
            return;
        }
        match self.parent.upgrade() {
            Some(parent) => parent.delete(),
            None => self.unsubscribe(),
        }
        self.state.set(SubscriptionState::Deleted);
    }

    fn is_deleted(&self) -> bool {
        self.state.get() == SubscriptionState::Deleted
    }
}

impl fmt::Debug for DependencySubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DependencySubscription")
            .field("id", &self.id)
            .field("index", &self.index)
            .field("target", &self.target)
            .field("state", &self.state.get())
            .finish()
    }
}
