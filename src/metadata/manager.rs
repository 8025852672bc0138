//! metadata::manager
//!
//! The metadata manager: storage sources, subscriptions, and the cycle.
//!
//! # Cycle
//!
//! Each [`cycle`](MetadataManager::cycle) runs these steps in order:
//!
//! 1. Poll every source for changes made outside the engine.
//! 2. Drain each source's pending changes (one per storage path).
//! 3. Match changes against registrations and collect deliveries.
//! 4. Persist writes that have waited long enough, evict idle entries.
//! 5. Force-delete subscriptions whose document was removed.
//! 6. Deliver values with `on_update`.
//!
//! Steps 1 to 5 run with the sources borrowed; step 6 runs with nothing
//! borrowed, so listeners may subscribe, write, or tear down freely.
//!
//! # Ownership
//!
//! The manager holds weak registrations only. Consumers own their
//! subscriptions; the manager can tear one down only through `delete`.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::ops::ControlFlow;
use std::rc::{Rc, Weak};

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, trace, warn};

use super::source::{ChangeKind, ExternalEvent, SourceChange, SourceError, StorageSource};
use super::sources::{GlobalSource, MemorySource};
use super::subscription::{ComputedSubscription, MetadataSubscription, Subscription};
use crate::core::config::EngineConfig;
use crate::core::declaration::BindTargetDeclaration;
use crate::core::types::{OwnerId, StorageType, SubscriptionId};
use crate::reactive::SignalLike;

/// Errors from the metadata manager.
#[derive(Debug, Error)]
pub enum ManagerError {
    /// No source is registered for the storage type.
    #[error("no storage source registered for '{0}'")]
    UnknownStorageType(StorageType),

    #[error(transparent)]
    Source(#[from] SourceError),

    /// The write target is reachable from the subscription's own dependencies.
    #[error("cyclic dependency: '{target}' depends on itself")]
    CyclicDependency { target: String },

    /// The subscription was unsubscribed or deleted.
    #[error("subscription {0} is no longer active")]
    Inactive(SubscriptionId),

    #[error("the metadata manager has been dropped")]
    ManagerDropped,

    #[error("failed to persist '{storage_path}': {source}")]
    FlushFailed {
        storage_path: String,
        #[source]
        source: SourceError,
    },
}

/// What one cycle did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub cycle: u64,
    /// `on_update` calls that changed a subscription's value.
    pub updates_delivered: usize,
    /// Subscriptions force-deleted because their document was removed.
    pub deleted: usize,
    pub flushed: usize,
    pub flush_failures: usize,
    pub evicted: usize,
}

struct Registration {
    id: SubscriptionId,
    target: BindTargetDeclaration,
    subscription: Weak<dyn MetadataSubscription>,
}

struct ComputedEntry {
    id: SubscriptionId,
    dependencies: Vec<BindTargetDeclaration>,
    write_target: Option<BindTargetDeclaration>,
}

pub(crate) struct ManagerInner {
    config: EngineConfig,
    sources: RefCell<HashMap<StorageType, Box<dyn StorageSource>>>,
    registrations: RefCell<Vec<Registration>>,
    computed: RefCell<Vec<ComputedEntry>>,
    cycle: Cell<u64>,
}

/// Handle to a metadata manager. Clones share the same manager.
#[derive(Clone)]
pub struct MetadataManager {
    inner: Rc<ManagerInner>,
}

/// Non-owning handle held by subscriptions.
#[derive(Clone)]
pub struct WeakManager(Weak<ManagerInner>);

impl WeakManager {
    pub fn upgrade(&self) -> Option<MetadataManager> {
        self.0.upgrade().map(|inner| MetadataManager { inner })
    }

    /// A handle that never upgrades.
    pub fn dangling() -> Self {
        Self(Weak::new())
    }
}

impl std::fmt::Debug for MetadataManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataManager")
            .field("cycle", &self.inner.cycle.get())
            .field("subscriptions", &self.subscription_count())
            .finish()
    }
}

impl MetadataManager {
    /// A manager with no sources.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            inner: Rc::new(ManagerInner {
                config,
                sources: RefCell::new(HashMap::new()),
                registrations: RefCell::new(Vec::new()),
                computed: RefCell::new(Vec::new()),
                cycle: Cell::new(0),
            }),
        }
    }

    /// A manager with the memory and global sources registered.
    ///
    /// The frontmatter source depends on where documents live and is
    /// registered by the caller.
    pub fn with_default_sources(config: EngineConfig) -> Self {
        let manager = Self::new(config);
        manager.register_source(MemorySource::new());
        manager.register_source(GlobalSource::new());
        manager
    }

    /// Register (or replace) the source for its storage type.
    pub fn register_source(&self, source: impl StorageSource + 'static) {
        let storage_type = source.storage_type();
        debug!(%storage_type, "registered storage source");
        self.inner
            .sources
            .borrow_mut()
            .insert(storage_type, Box::new(source));
    }

    pub fn has_source(&self, storage_type: StorageType) -> bool {
        self.inner.sources.borrow().contains_key(&storage_type)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    pub fn downgrade(&self) -> WeakManager {
        WeakManager(Rc::downgrade(&self.inner))
    }

    /// Cycles run so far.
    pub fn cycle_count(&self) -> u64 {
        self.inner.cycle.get()
    }

    /// Live registered subscriptions, dependency subscriptions included.
    pub fn subscription_count(&self) -> usize {
        self.inner
            .registrations
            .borrow()
            .iter()
            .filter(|r| r.subscription.strong_count() > 0)
            .count()
    }

    fn with_source<R>(
        &self,
        storage_type: StorageType,
        f: impl FnOnce(&mut dyn StorageSource) -> R,
    ) -> Result<R, ManagerError> {
        let mut sources = self.inner.sources.borrow_mut();
        match sources.get_mut(&storage_type) {
            Some(source) => Ok(f(source.as_mut())),
            None => {
                error!(%storage_type, "no storage source registered");
                Err(ManagerError::UnknownStorageType(storage_type))
            }
        }
    }

    /// Bind a signal to a target.
    ///
    /// The signal receives the current value before this returns.
    /// `on_delete` fires once if the manager tears the subscription down.
    pub fn subscribe(
        &self,
        owner: OwnerId,
        signal: impl SignalLike<Value> + 'static,
        target: BindTargetDeclaration,
        on_delete: impl FnOnce() + 'static,
    ) -> Result<Rc<Subscription>, ManagerError> {
        self.with_source(target.storage_type, |source| {
            source.add_subscriber(&target.storage_path)
        })??;

        let value = self.read(&target)?;
        let subscription = Rc::new(Subscription::new(
            owner,
            target.clone(),
            Box::new(signal),
            Some(Box::new(on_delete)),
            self.downgrade(),
        ));
        let handle: Rc<dyn MetadataSubscription> = subscription.clone();
        self.register(subscription.id(), target, &handle);
        debug!(
            id = %subscription.id(),
            owner = %subscription.owner(),
            target = %subscription.target(),
            "subscribed"
        );

        subscription.on_update(&value);
        Ok(subscription)
    }

    /// Bind a signal to a value computed from several targets.
    ///
    /// The result is recomputed whenever a dependency changes and, if
    /// `write_target` is given, written there.
    ///
    /// # Errors
    ///
    /// [`ManagerError::CyclicDependency`] if the write target feeds back
    /// into the dependencies, directly or through other computed
    /// subscriptions.
    pub fn subscribe_computed(
        &self,
        owner: OwnerId,
        signal: impl SignalLike<Value> + 'static,
        dependencies: Vec<BindTargetDeclaration>,
        compute: impl Fn(&[Value]) -> Value + 'static,
        write_target: Option<BindTargetDeclaration>,
        on_delete: impl FnOnce() + 'static,
    ) -> Result<Rc<ComputedSubscription>, ManagerError> {
        if let Some(target) = &write_target {
            if self.creates_cycle(&dependencies, target) {
                warn!(target = %target, "rejected cyclic computed subscription");
                return Err(ManagerError::CyclicDependency {
                    target: target.to_string(),
                });
            }
            self.with_source(target.storage_type, |_| ())?;
        }
        for dependency in &dependencies {
            self.with_source(dependency.storage_type, |source| {
                source.add_subscriber(&dependency.storage_path)
            })??;
        }

        let mut initial = Vec::with_capacity(dependencies.len());
        for dependency in &dependencies {
            initial.push(self.read(dependency)?);
        }

        let computed = ComputedSubscription::new(
            owner,
            dependencies.clone(),
            write_target.clone(),
            Box::new(signal),
            Box::new(compute),
            Some(Box::new(on_delete)),
            self.downgrade(),
        );
        for (index, child) in computed.children().into_iter().enumerate() {
            let target = dependencies[index].clone();
            let handle: Rc<dyn MetadataSubscription> = child;
            self.register(handle.id(), target, &handle);
        }
        self.inner.computed.borrow_mut().push(ComputedEntry {
            id: computed.id(),
            dependencies,
            write_target,
        });
        debug!(id = %computed.id(), owner = %computed.owner(), "subscribed computed");

        for (index, value) in initial.into_iter().enumerate() {
            computed.prime(index, value);
        }
        computed.recompute();
        Ok(computed)
    }

    fn register(
        &self,
        id: SubscriptionId,
        target: BindTargetDeclaration,
        handle: &Rc<dyn MetadataSubscription>,
    ) {
        self.inner.registrations.borrow_mut().push(Registration {
            id,
            target,
            subscription: Rc::downgrade(handle),
        });
    }

    /// Whether writing `target` can change any of `dependencies`.
    fn creates_cycle(&self, dependencies: &[BindTargetDeclaration], target: &BindTargetDeclaration) -> bool {
        let computed = self.inner.computed.borrow();
        let mut stack = vec![target.clone()];
        let mut visited: HashSet<BindTargetDeclaration> = HashSet::new();

        while let Some(node) = stack.pop() {
            if !visited.insert(node.clone()) {
                continue;
            }
            if dependencies.iter().any(|d| d.overlaps(&node)) {
                return true;
            }
            for entry in computed.iter() {
                let Some(next) = &entry.write_target else {
                    continue;
                };
                if entry.dependencies.iter().any(|d| d.overlaps(&node)) {
                    stack.push(next.clone());
                }
            }
        }
        false
    }

    /// Drop a registration and release its cache entry.
    pub(crate) fn unregister(&self, id: SubscriptionId) {
        let removed = match self.inner.registrations.try_borrow_mut() {
            Ok(mut registrations) => registrations
                .iter()
                .position(|r| r.id == id)
                .map(|index| registrations.remove(index)),
            Err(_) => {
                error!(%id, "registrations busy during unregister");
                return;
            }
        };
        let Some(registration) = removed else {
            return;
        };
        match self.inner.sources.try_borrow_mut() {
            Ok(mut sources) => {
                if let Some(source) = sources.get_mut(&registration.target.storage_type) {
                    source.remove_subscriber(&registration.target.storage_path);
                }
            }
            Err(_) => error!(%id, "sources busy during unregister"),
        }
    }

    pub(crate) fn unregister_computed(&self, id: SubscriptionId) {
        if let Ok(mut computed) = self.inner.computed.try_borrow_mut() {
            computed.retain(|entry| entry.id != id);
        }
    }

    /// The current value at a target.
    ///
    /// A path that runs through the wrong kind of container reads as null.
    pub fn read(&self, target: &BindTargetDeclaration) -> Result<Value, ManagerError> {
        let tree = self.with_source(target.storage_type, |source| {
            source.get(&target.storage_path)
        })??;
        Ok(self.extract(target, &tree))
    }

    fn extract(&self, target: &BindTargetDeclaration, tree: &Value) -> Value {
        match target.storage_prop.get_or_null(tree) {
            Ok(value) => value,
            Err(e) => {
                debug!(target = %target, error = %e, "value absent");
                Value::Null
            }
        }
    }

    /// Write a value to a target's source cache.
    ///
    /// Returns `false` if the value was already there.
    pub fn write(
        &self,
        target: &BindTargetDeclaration,
        value: Value,
        writer: Option<SubscriptionId>,
    ) -> Result<bool, ManagerError> {
        let changed = self.with_source(target.storage_type, |source| {
            source.write(&target.storage_path, &target.storage_prop, value, writer)
        })??;
        trace!(target = %target, changed, "write");
        Ok(changed)
    }

    /// Report a document tree changed outside the engine.
    ///
    /// Delivered on the next cycle. Returns whether the cache changed.
    pub fn report_external_change(
        &self,
        storage_type: StorageType,
        storage_path: &str,
        data: Value,
    ) -> Result<bool, ManagerError> {
        self.with_source(storage_type, |source| {
            source.on_external_change(storage_path, data)
        })
    }

    /// Report a document was deleted.
    ///
    /// Every subscription bound to it in a per-document source is
    /// force-deleted on the next cycle.
    pub fn report_document_removed(&self, storage_path: &str) {
        let mut sources = self.inner.sources.borrow_mut();
        for source in sources.values_mut() {
            if !source.storage_type().is_global() {
                source.on_removed(storage_path);
            }
        }
    }

    /// Run one reconciliation cycle.
    pub fn cycle(&self) -> CycleReport {
        let cycle = self.inner.cycle.get() + 1;
        self.inner.cycle.set(cycle);
        let mut report = CycleReport {
            cycle,
            ..CycleReport::default()
        };

        let mut changes: Vec<(StorageType, SourceChange, Value)> = Vec::new();
        let mut updates: Vec<(Rc<dyn MetadataSubscription>, Value)> = Vec::new();
        let mut deletes: Vec<Rc<dyn MetadataSubscription>> = Vec::new();

        {
            let mut sources = self.inner.sources.borrow_mut();
            for storage_type in StorageType::ALL {
                let Some(source) = sources.get_mut(&storage_type) else {
                    continue;
                };
                for event in source.poll_external() {
                    match event {
                        ExternalEvent::Modified { storage_path, data } => {
                            source.on_external_change(&storage_path, data);
                        }
                        ExternalEvent::Removed { storage_path } => {
                            source.on_removed(&storage_path);
                        }
                    }
                }
                for change in source.take_changes() {
                    let tree = source
                        .cache()
                        .get(&change.storage_path)
                        .map(|entry| entry.data.clone())
                        .unwrap_or(Value::Null);
                    changes.push((storage_type, change, tree));
                }
            }

            self.inner
                .registrations
                .borrow_mut()
                .retain(|r| r.subscription.strong_count() > 0);
            for registration in self.inner.registrations.borrow().iter() {
                let Some(subscription) = registration.subscription.upgrade() else {
                    continue;
                };
                if !subscription.updatable() {
                    continue;
                }
                let target = &registration.target;
                let relevant = changes.iter().filter(|(storage_type, change, _)| {
                    *storage_type == target.storage_type
                        && change.storage_path == target.storage_path
                });
                for (_, change, tree) in relevant {
                    if change.kind == ChangeKind::Removed {
                        deletes.push(Rc::clone(&subscription));
                        break;
                    }
                    if affects(&change.kind, target, registration.id) {
                        updates.push((Rc::clone(&subscription), self.extract(target, tree)));
                        break;
                    }
                }
            }

            let delay = self.inner.config.flush_delay_cycles;
            let max_idle = self.inner.config.cache_eviction_cycles;
            for source in sources.values_mut() {
                let (flushed, failed) = source.flush_due(delay);
                report.flushed += flushed.len();
                report.flush_failures += failed.len();
                for (storage_path, e) in failed {
                    warn!(storage_type = %source.storage_type(), storage_path, error = %e, "failed to persist");
                }
                report.evicted += source.evict_idle(max_idle).len();
            }

            for (storage_type, change, _) in &changes {
                if change.kind == ChangeKind::Removed {
                    if let Some(source) = sources.get_mut(storage_type) {
                        source.cache_mut().remove(&change.storage_path);
                    }
                }
            }
        }

        for subscription in deletes {
            if !subscription.updatable() {
                continue;
            }
            info!(
                id = %subscription.id(),
                owner = %subscription.owner(),
                "document removed, deleting subscription"
            );
            subscription.delete();
            report.deleted += 1;
        }
        for (subscription, value) in updates {
            if subscription.updatable() && subscription.on_update(&value) {
                report.updates_delivered += 1;
            }
        }

        trace!(
            cycle,
            updates = report.updates_delivered,
            deleted = report.deleted,
            flushed = report.flushed,
            evicted = report.evicted,
            "cycle complete"
        );
        report
    }

    /// Run cycles on the configured interval until `shutdown` resolves or
    /// `on_cycle` breaks.
    pub async fn run<F>(&self, shutdown: impl Future<Output = ()>, mut on_cycle: F)
    where
        F: FnMut(&CycleReport) -> ControlFlow<()>,
    {
        let mut interval = tokio::time::interval(self.inner.config.cycle_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    debug!("cycle timer stopped");
                    break;
                }
                _ = interval.tick() => {
                    let report = self.cycle();
                    if on_cycle(&report).is_break() {
                        break;
                    }
                }
            }
        }
    }

    /// Persist every unflushed write now.
    ///
    /// Every source is flushed; the first failure is returned.
    pub fn flush_all(&self) -> Result<usize, ManagerError> {
        let mut flushed = 0;
        let mut first_failure = None;
        for source in self.inner.sources.borrow_mut().values_mut() {
            let (done, failed) = source.flush_all();
            flushed += done.len();
            for (storage_path, e) in failed {
                warn!(storage_type = %source.storage_type(), storage_path, error = %e, "failed to persist");
                if first_failure.is_none() {
                    first_failure = Some(ManagerError::FlushFailed {
                        storage_path,
                        source: e,
                    });
                }
            }
        }
        match first_failure {
            Some(e) => Err(e),
            None => Ok(flushed),
        }
    }

    /// Force-delete every subscription and flush every source.
    ///
    /// Returns the number of subscriptions deleted.
    pub fn teardown(&self) -> Result<usize, ManagerError> {
        let live: Vec<Rc<dyn MetadataSubscription>> = self
            .inner
            .registrations
            .borrow()
            .iter()
            .filter_map(|r| r.subscription.upgrade())
            .collect();

        let mut deleted = 0;
        for subscription in live {
            if subscription.updatable() {
                subscription.delete();
                deleted += 1;
            }
        }
        self.inner.registrations.borrow_mut().clear();
        self.inner.computed.borrow_mut().clear();
        info!(deleted, "metadata manager torn down");
        self.flush_all()?;
        Ok(deleted)
    }
}

/// Whether a change reaches a target, ignoring the target's own writes.
fn affects(kind: &ChangeKind, target: &BindTargetDeclaration, own: SubscriptionId) -> bool {
    match kind {
        ChangeKind::Whole => true,
        ChangeKind::Removed => false,
        ChangeKind::Paths(records) => records.iter().any(|record| {
            record.writer != Some(own)
                && (target.storage_prop.starts_with(&record.path)
                    || (target.listen_to_children && record.path.starts_with(&target.storage_prop)))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::prop::PropPath;
    use crate::metadata::source::ChangeRecord;
    use crate::reactive::Signal;
    use serde_json::json;

    fn memory(prop: &[&str]) -> BindTargetDeclaration {
        BindTargetDeclaration::new(StorageType::Memory, "a.md", PropPath::from_segments(prop))
    }

    fn manager() -> MetadataManager {
        MetadataManager::with_default_sources(EngineConfig::default())
    }

    mod affects_rule {
        use super::*;

        fn paths(path: &[&str], writer: Option<SubscriptionId>) -> ChangeKind {
            ChangeKind::Paths(vec![ChangeRecord {
                path: PropPath::from_segments(path),
                writer,
            }])
        }

        #[test]
        fn ancestor_write_affects() {
            let id = SubscriptionId::new();
            assert!(affects(&paths(&["a"], None), &memory(&["a", "b"]), id));
            assert!(affects(&paths(&["a", "b"], None), &memory(&["a", "b"]), id));
        }

        #[test]
        fn descendant_needs_listen_to_children() {
            let id = SubscriptionId::new();
            let kind = paths(&["a", "b"], None);
            assert!(!affects(&kind, &memory(&["a"]), id));
            assert!(affects(&kind, &memory(&["a"]).with_listen_to_children(true), id));
        }

        #[test]
        fn own_write_ignored() {
            let id = SubscriptionId::new();
            assert!(!affects(&paths(&["a"], Some(id)), &memory(&["a"]), id));
        }
    }

    mod subscribing {
        use super::*;

        #[test]
        fn initial_value_delivered() {
            let manager = manager();
            manager.write(&memory(&["x"]), json!(4), None).unwrap();
            let signal = Signal::new(Value::Null);
            let _sub = manager
                .subscribe("o".into(), signal.clone(), memory(&["x"]), || {})
                .unwrap();
            assert_eq!(signal.get(), json!(4));
            assert_eq!(manager.subscription_count(), 1);
        }

        #[test]
        fn unknown_source_is_error() {
            let manager = MetadataManager::new(EngineConfig::default());
            let err = manager
                .subscribe("o".into(), Signal::new(Value::Null), memory(&["x"]), || {})
                .unwrap_err();
            assert!(matches!(err, ManagerError::UnknownStorageType(StorageType::Memory)));
        }

        #[test]
        fn drop_unregisters() {
            let manager = manager();
            let sub = manager
                .subscribe("o".into(), Signal::new(Value::Null), memory(&["x"]), || {})
                .unwrap();
            drop(sub);
            assert_eq!(manager.subscription_count(), 0);
        }

        #[test]
        fn navigation_mismatch_reads_null() {
            let manager = manager();
            manager.write(&memory(&["x"]), json!("text"), None).unwrap();
            assert_eq!(manager.read(&memory(&["x", "0"])).unwrap(), Value::Null);
        }
    }

    mod cycle {
        use super::*;

        #[test]
        fn write_reaches_others_not_writer() {
            let manager = manager();
            let a = Signal::new(Value::Null);
            let b = Signal::new(Value::Null);
            let sub_a = manager.subscribe("a".into(), a.clone(), memory(&["x"]), || {}).unwrap();
            let _sub_b = manager.subscribe("b".into(), b.clone(), memory(&["x"]), || {}).unwrap();

            let a_calls = Rc::new(Cell::new(0));
            let counter = Rc::clone(&a_calls);
            a.register_listener(move |_| counter.set(counter.get() + 1));

            sub_a.write(json!(1)).unwrap();
            assert_eq!(a.get(), json!(1));
            assert_eq!(b.get(), Value::Null);

            let report = manager.cycle();
            assert_eq!(report.updates_delivered, 1);
            assert_eq!(b.get(), json!(1));
            assert_eq!(a_calls.get(), 0);

            assert_eq!(manager.cycle().updates_delivered, 0);
        }

        #[test]
        fn removal_force_deletes_once() {
            let manager = manager();
            let fired = Rc::new(Cell::new(0));
            let counter = Rc::clone(&fired);
            let sub = manager
                .subscribe("o".into(), Signal::new(Value::Null), memory(&["x"]), move || {
                    counter.set(counter.get() + 1)
                })
                .unwrap();

            manager.report_document_removed("a.md");
            assert_eq!(manager.cycle().deleted, 1);
            manager.cycle();
            assert_eq!(fired.get(), 1);
            assert!(sub.is_deleted());
            assert_eq!(manager.subscription_count(), 0);
        }

        #[test]
        fn computed_follows_dependencies() {
            let manager = manager();
            let total = Signal::new(Value::Null);
            let _computed = manager
                .subscribe_computed(
                    "c".into(),
                    total.clone(),
                    vec![memory(&["a"]), memory(&["b"])],
                    |values| json!(values.iter().filter_map(Value::as_i64).sum::<i64>()),
                    Some(memory(&["total"])),
                    || {},
                )
                .unwrap();
            assert_eq!(total.get(), json!(0));

            manager.write(&memory(&["a"]), json!(2), None).unwrap();
            manager.write(&memory(&["b"]), json!(3), None).unwrap();
            manager.cycle();
            assert_eq!(total.get(), json!(5));
            assert_eq!(manager.read(&memory(&["total"])).unwrap(), json!(5));
        }

        #[test]
        fn cyclic_computed_rejected() {
            let manager = manager();
            let _first = manager
                .subscribe_computed(
                    "c1".into(),
                    Signal::new(Value::Null),
                    vec![memory(&["a"])],
                    |v| v[0].clone(),
                    Some(memory(&["b"])),
                    || {},
                )
                .unwrap();
            let err = manager
                .subscribe_computed(
                    "c2".into(),
                    Signal::new(Value::Null),
                    vec![memory(&["b"])],
                    |v| v[0].clone(),
                    Some(memory(&["a"])),
                    || {},
                )
                .unwrap_err();
            assert!(matches!(err, ManagerError::CyclicDependency { .. }));

            let direct = manager.subscribe_computed(
                "c3".into(),
                Signal::new(Value::Null),
                vec![memory(&["x"])],
                |v| v[0].clone(),
                Some(memory(&["x"])),
                || {},
            );
            assert!(direct.is_err());
        }

        #[test]
        fn teardown_deletes_everything() {
            let manager = manager();
            let fired = Rc::new(Cell::new(0));
            let mut subs = Vec::new();
            for owner in ["a", "b"] {
                let counter = Rc::clone(&fired);
                subs.push(
                    manager
                        .subscribe(owner.into(), Signal::new(Value::Null), memory(&["x"]), move || {
                            counter.set(counter.get() + 1)
                        })
                        .unwrap(),
                );
            }
            assert_eq!(manager.teardown().unwrap(), 2);
            assert_eq!(fired.get(), 2);
            assert_eq!(manager.subscription_count(), 0);
        }
    }
}
