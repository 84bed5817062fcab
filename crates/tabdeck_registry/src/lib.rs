//! Tab-state registry.
//!
//! A single authoritative, in-memory model of every open tab. Producers
//! (surface lifecycle callbacks, user commands, extension API calls) push
//! partial updates through [`TabRegistry::apply`]; the registry merges them,
//! computes the changed fields, keeps at most one tab active, and publishes
//! exactly one notification per logical mutation on its [`NotificationBus`].
//!
//! ## Usage
//!
//! ```rust,ignore
//! let registry = Arc::new(TabRegistry::with_defaults());
//! registry.subscribe(|n| println!("{} #{} {:?}", n.kind, n.id, n.changed));
//!
//! let first = registry.create(TabPatch::new().url("about:newtab").active(true))?;
//! let second = registry.create(TabPatch::new().url("https://example.com"))?;
//!
//! // Deactivates `first` (its own notification), then activates `second`.
//! registry.update(TabPatch::for_tab(second).active(true))?;
//! ```
//!
//! No lock is held while listeners run, so a listener may read the registry
//! or issue further mutations; those are delivered before the outer call
//! returns.
//!
//! Delivery of a nested mutation is depth-first: it reaches every subscriber
//! before the outer notification reaches the subscribers registered after
//! the one that mutated. Those later subscribers can therefore see an
//! `Update` of a tab before its `Create`, and the outer notification's
//! `record` is the state as committed then, not the latest one. Read the
//! registry when the current record matters.

pub mod bus;
pub mod error;
pub mod identity;
pub mod model;
pub mod relay;
pub mod store;
pub mod tree;

pub use bus::{ListenerFailure, NotificationBus, SubscriptionId, TabNotification};
pub use error::{RegistryError, RegistryResult};
pub use identity::{IdentitySource, SessionIdentityAllocator};
pub use model::{EventKind, MutedInfo, TabEvent, TabField, TabId, TabPatch, TabRecord, TabStatus};
pub use relay::{ActionCommand, ActionRelay, TabAction};

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use store::TabStore;

struct RegistryState {
    store: TabStore,
    disposed: bool,
}

/// The change engine and sole writer of the tab store.
pub struct TabRegistry {
    state: Mutex<RegistryState>,
    identity: Arc<dyn IdentitySource>,
    bus: Arc<NotificationBus>,
}

impl TabRegistry {
    pub fn new(identity: Arc<dyn IdentitySource>, bus: Arc<NotificationBus>) -> Self {
        Self {
            state: Mutex::new(RegistryState {
                store: TabStore::new(),
                disposed: false,
            }),
            identity,
            bus,
        }
    }

    /// A registry with its own allocator and bus.
    pub fn with_defaults() -> Self {
        Self::new(
            Arc::new(SessionIdentityAllocator::new()),
            Arc::new(NotificationBus::new()),
        )
    }

    pub fn bus(&self) -> &Arc<NotificationBus> {
        &self.bus
    }

    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&TabNotification) + Send + Sync + 'static,
    {
        self.bus.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.bus.unsubscribe(id)
    }

    /// Applies one event. Returns the affected id, or `None` when an update
    /// changed nothing.
    pub fn apply(&self, event: TabEvent) -> RegistryResult<Option<TabId>> {
        match event {
            TabEvent::Create(patch) => self.create(patch).map(Some),
            TabEvent::Update(patch) => {
                let id = patch.id.ok_or(RegistryError::MissingId)?;
                let changed = self.update(patch)?;
                Ok((!changed.is_empty()).then_some(id))
            }
            TabEvent::Remove(id) => self.remove(id).map(|_| Some(id)),
        }
    }

    /// Creates a tab, or updates it when `patch.id` names an existing one.
    ///
    /// An explicit `id` (restoration) is reserved in the allocator so fresh
    /// ids never collide with it. If the new tab is active, every other active
    /// tab is deactivated first, each with its own notification, before the
    /// new record is committed.
    pub fn create(&self, patch: TabPatch) -> RegistryResult<TabId> {
        if let Some(id) = patch.id {
            let exists = self.lock_live()?.store.contains(id);
            if exists {
                trace(EventKind::Create, id, &patch);
                self.update(patch)?;
                return Ok(id);
            }
            self.identity.reserve(id);
        } else {
            self.ensure_live()?;
        }

        let id = match patch.id {
            Some(id) => id,
            None => self.identity.next_id().ok_or(RegistryError::IdsExhausted)?,
        };
        let session_id = patch
            .session_id
            .clone()
            .filter(|session_id| !session_id.is_empty())
            .unwrap_or_else(|| self.identity.next_session_id());
        trace(EventKind::Create, id, &patch);

        let mut record = TabRecord::new(id, session_id);
        record.merge(&patch);
        record.normalize();

        loop {
            if record.active {
                self.deactivate_others(id)?;
            }

            let mut state = self.lock_live()?;
            if state.store.contains(id) {
                drop(state);
                // Only an explicit id may land on an existing tab, e.g. one a
                // listener restored while we were deactivating.
                if patch.id.is_none() {
                    return Err(RegistryError::IdInUse(id));
                }
                self.update(patch)?;
                return Ok(id);
            }
            if record.active && state.store.active_ids().any(|other| other != id) {
                continue;
            }

            if record.index.is_none() {
                record.index = Some(state.store.len() as i64);
            }
            state.store.put(record.clone());
            assert_single_active(&state.store);
            break;
        }

        let supplied = patch.supplied_fields();
        let defaulted = record.diff(&TabRecord::new(id, record.session_id.clone()));
        let mut changed = vec![TabField::Id, TabField::SessionId];
        changed.extend(TabField::MERGEABLE.iter().copied().filter(|field| {
            *field != TabField::SessionId
                && (supplied.contains(field) || defaulted.contains(field))
        }));

        self.bus.publish(EventKind::Create, id, changed, record);
        Ok(id)
    }

    /// Merges the present fields of `patch` into the tab `patch.id`.
    ///
    /// Returns the changed fields; an empty list means nothing differed and
    /// no notification was published.
    pub fn update(&self, patch: TabPatch) -> RegistryResult<Vec<TabField>> {
        let id = patch.id.ok_or(RegistryError::MissingId)?;
        trace(EventKind::Update, id, &patch);

        loop {
            {
                let mut state = self.lock_live()?;
                let current = state
                    .store
                    .get(id)
                    .cloned()
                    .ok_or(RegistryError::NotFound(id))?;

                let mut next = current.clone();
                next.merge(&patch);
                next.normalize();

                let changed = next.diff(&current);
                if changed.is_empty() {
                    return Ok(changed);
                }

                let others_active =
                    next.active && state.store.active_ids().any(|other| other != id);
                if !others_active {
                    state.store.put(next.clone());
                    assert_single_active(&state.store);
                    drop(state);

                    self.bus
                        .publish(EventKind::Update, id, changed.clone(), next);
                    return Ok(changed);
                }
            }

            self.deactivate_others(id)?;
        }
    }

    /// Deletes a tab and returns the removed record.
    ///
    /// Removing the active tab leaves the registry with no active tab;
    /// choosing a replacement is the caller's policy.
    pub fn remove(&self, id: TabId) -> RegistryResult<TabRecord> {
        let removed = {
            let mut state = self.lock_live()?;
            state
                .store
                .delete(id)
                .ok_or(RegistryError::NotFound(id))?
        };
        tabdeck_shared::diagnostics::log(format!("apply remove #{}", id));

        let changed = if removed.active {
            vec![TabField::Active]
        } else {
            Vec::new()
        };
        self.bus
            .publish(EventKind::Remove, id, changed, removed.clone());
        Ok(removed)
    }

    fn deactivate_others(&self, keep: TabId) -> RegistryResult<()> {
        let others: Vec<TabId> = {
            let state = self.lock_live()?;
            state
                .store
                .active_ids()
                .filter(|other| *other != keep)
                .collect()
        };

        for other in others {
            match self.update(TabPatch::for_tab(other).active(false)) {
                // Removed by a listener in the meantime.
                Ok(_) | Err(RegistryError::NotFound(_)) => {}
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    fn ensure_live(&self) -> RegistryResult<()> {
        if self.state.lock().disposed {
            return Err(RegistryError::Disposed);
        }
        Ok(())
    }

    fn lock_live(&self) -> RegistryResult<MutexGuard<'_, RegistryState>> {
        let state = self.state.lock();
        if state.disposed {
            return Err(RegistryError::Disposed);
        }
        Ok(state)
    }

    pub fn get(&self, id: TabId) -> RegistryResult<TabRecord> {
        self.state
            .lock()
            .store
            .get(id)
            .cloned()
            .ok_or(RegistryError::NotFound(id))
    }

    /// Every record, insertion order.
    pub fn get_all(&self) -> Vec<TabRecord> {
        self.state.lock().store.get_all()
    }

    pub fn contains(&self, id: TabId) -> bool {
        self.state.lock().store.contains(id)
    }

    pub fn len(&self) -> usize {
        self.state.lock().store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().store.is_empty()
    }

    pub fn active_tab_id(&self) -> Option<TabId> {
        self.state.lock().store.active_ids().next()
    }

    /// Most recently inserted remaining tab.
    pub fn last_tab_id(&self) -> Option<TabId> {
        self.state.lock().store.last_id()
    }

    pub fn parent(&self, id: TabId) -> Option<TabId> {
        tree::parent(&self.state.lock().store, id)
    }

    pub fn depth(&self, id: TabId) -> usize {
        tree::depth(&self.state.lock().store, id)
    }

    pub fn children(&self, id: TabId) -> Vec<TabId> {
        tree::children(&self.state.lock().store, id)
    }

    /// `(id, depth)` pairs in tree display order.
    pub fn tree(&self) -> Vec<(TabId, usize)> {
        tree::flatten(&self.state.lock().store)
    }

    /// Drops every record and subscriber. Later mutations fail with
    /// [`RegistryError::Disposed`].
    pub fn dispose(&self) {
        {
            let mut state = self.state.lock();
            state.disposed = true;
            state.store.clear();
        }
        self.bus.clear();
        log::debug!("tab registry disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.state.lock().disposed
    }
}

impl Default for TabRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn trace(kind: EventKind, id: TabId, patch: &TabPatch) {
    tabdeck_shared::diagnostics::log(format!(
        "apply {} #{} [{}]",
        kind,
        id,
        patch.describe()
    ));
}

fn assert_single_active(store: &TabStore) {
    debug_assert!(
        store.active_ids().count() <= 1,
        "more than one active tab after commit"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    type Log = Arc<Mutex<Vec<(EventKind, TabId, Vec<TabField>, TabRecord)>>>;

    fn recorded(registry: &TabRegistry) -> Log {
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let sink = log.clone();
        registry.subscribe(move |n| {
            sink.lock()
                .push((n.kind, n.id, n.changed.clone(), n.record.clone()))
        });
        log
    }

    fn active_count(registry: &TabRegistry) -> usize {
        registry.get_all().iter().filter(|t| t.active).count()
    }

    /// Hands out a fixed list of ids and `session-N` session ids.
    struct ScriptedIdentity {
        ids: Mutex<VecDeque<u64>>,
        sessions: AtomicUsize,
    }

    impl ScriptedIdentity {
        fn new(ids: &[u64]) -> Arc<Self> {
            Arc::new(Self {
                ids: Mutex::new(ids.iter().copied().collect()),
                sessions: AtomicUsize::new(0),
            })
        }
    }

    impl IdentitySource for ScriptedIdentity {
        fn next_id(&self) -> Option<TabId> {
            self.ids.lock().pop_front().and_then(TabId::new)
        }

        fn next_session_id(&self) -> String {
            format!("session-{}", self.sessions.fetch_add(1, Ordering::Relaxed) + 1)
        }

        fn reserve(&self, _id: TabId) {}
    }

    fn tab_id(raw: u64) -> TabId {
        TabId::new(raw).unwrap()
    }

    #[test]
    fn test_create_after_restoring_max_id_reports_exhaustion() {
        let registry = TabRegistry::with_defaults();
        let restored = registry
            .create(TabPatch::new().with_id(tab_id(u64::MAX)))
            .unwrap();
        assert_eq!(restored, tab_id(u64::MAX));

        assert_eq!(
            registry.create(TabPatch::new()),
            Err(RegistryError::IdsExhausted)
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_fresh_ids_run_out_without_reuse() {
        let registry = TabRegistry::with_defaults();
        registry
            .create(TabPatch::new().with_id(tab_id(u64::MAX - 1)))
            .unwrap();

        assert_eq!(registry.create(TabPatch::new()), Ok(tab_id(u64::MAX)));
        assert_eq!(
            registry.create(TabPatch::new()),
            Err(RegistryError::IdsExhausted)
        );
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_fresh_id_collision_is_rejected() {
        let registry = TabRegistry::new(
            ScriptedIdentity::new(&[1, 1]),
            Arc::new(NotificationBus::new()),
        );
        let first = registry.create(TabPatch::new().url("https://a.example/")).unwrap();
        assert_eq!(first, tab_id(1));
        assert_eq!(registry.get(first).unwrap().session_id, "session-1");

        assert_eq!(
            registry.create(TabPatch::new().url("https://b.example/")),
            Err(RegistryError::IdInUse(tab_id(1)))
        );
        let kept = registry.get(first).unwrap();
        assert_eq!(kept.url.as_deref(), Some("https://a.example/"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_create_defaults() {
        let registry = TabRegistry::with_defaults();
        let id = registry.create(TabPatch::new()).unwrap();
        let tab = registry.get(id).unwrap();

        assert_eq!(tab.status, TabStatus::Loading);
        assert!(tab.visible);
        assert!(!tab.session_id.is_empty());
        assert_eq!(tab.index, Some(0));
    }

    #[test]
    fn test_create_reports_id_first() {
        let registry = TabRegistry::with_defaults();
        let log = recorded(&registry);
        let id = registry
            .create(TabPatch::new().url("https://example.com").title("Example"))
            .unwrap();

        let log = log.lock();
        assert_eq!(log.len(), 1);
        let (kind, notified, changed, record) = &log[0];
        assert_eq!(*kind, EventKind::Create);
        assert_eq!(*notified, id);
        assert_eq!(changed[0], TabField::Id);
        assert!(changed.contains(&TabField::Url));
        assert!(changed.contains(&TabField::Title));
        assert_eq!(record.url.as_deref(), Some("https://example.com"));
    }

    #[test]
    fn test_create_keeps_supplied_session_id() {
        let registry = TabRegistry::with_defaults();
        let id = registry.create(TabPatch::new().session_id("s1")).unwrap();
        assert_eq!(registry.get(id).unwrap().session_id, "s1");
    }

    #[test]
    fn test_create_with_existing_id_updates() {
        let registry = TabRegistry::with_defaults();
        let id = registry.create(TabPatch::new().session_id("s1")).unwrap();
        let log = recorded(&registry);

        let again = registry
            .create(TabPatch::new().with_id(id).session_id("other").title("Restored"))
            .unwrap();

        assert_eq!(again, id);
        assert_eq!(registry.len(), 1);
        let tab = registry.get(id).unwrap();
        assert_eq!(tab.session_id, "s1");
        assert_eq!(tab.title.as_deref(), Some("Restored"));
        let log = log.lock();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].0, EventKind::Update);
        assert_eq!(log[0].2, vec![TabField::Title]);
    }

    #[test]
    fn test_explicit_id_is_never_reissued() {
        let registry = TabRegistry::with_defaults();
        let restored = TabId::new(10).unwrap();
        registry.create(TabPatch::new().with_id(restored)).unwrap();
        let fresh = registry.create(TabPatch::new()).unwrap();
        assert!(fresh.get() > restored.get());
    }

    #[test]
    fn test_update_equal_value_is_noop() {
        let registry = TabRegistry::with_defaults();
        let id = registry.create(TabPatch::new().title("Same")).unwrap();
        let log = recorded(&registry);

        let changed = registry.update(TabPatch::for_tab(id).title("Same")).unwrap();
        assert!(changed.is_empty());
        assert!(log.lock().is_empty());
        assert_eq!(
            registry
                .apply(TabEvent::Update(TabPatch::for_tab(id).title("Same")))
                .unwrap(),
            None
        );
    }

    #[test]
    fn test_update_reports_only_differences() {
        let registry = TabRegistry::with_defaults();
        let id = registry.create(TabPatch::new().title("Old").pinned(true)).unwrap();
        let changed = registry
            .update(TabPatch::for_tab(id).title("New").pinned(true))
            .unwrap();
        assert_eq!(changed, vec![TabField::Title]);
    }

    #[test]
    fn test_activation_deactivates_previous_first() {
        let registry = TabRegistry::with_defaults();
        let a = registry.create(TabPatch::new().active(true)).unwrap();
        let b = registry.create(TabPatch::new()).unwrap();
        let log = recorded(&registry);

        registry.update(TabPatch::for_tab(b).active(true)).unwrap();

        let log = log.lock();
        assert_eq!(log.len(), 2);
        assert_eq!((log[0].0, log[0].1), (EventKind::Update, a));
        assert_eq!(log[0].2, vec![TabField::Active]);
        assert_eq!((log[1].0, log[1].1), (EventKind::Update, b));
        assert_eq!(log[1].2[0], TabField::Active);
        assert!(!registry.get(a).unwrap().active);
        assert!(registry.get(b).unwrap().active);
    }

    #[test]
    fn test_creating_active_tab_deactivates_previous_first() {
        let registry = TabRegistry::with_defaults();
        let a = registry.create(TabPatch::new().active(true)).unwrap();
        let log = recorded(&registry);

        let b = registry.create(TabPatch::new().active(true)).unwrap();

        let log = log.lock();
        assert_eq!(log.len(), 2);
        assert_eq!((log[0].0, log[0].1), (EventKind::Update, a));
        assert_eq!((log[1].0, log[1].1), (EventKind::Create, b));
        assert_eq!(active_count(&registry), 1);
    }

    #[test]
    fn test_subscribers_never_observe_two_actives() {
        let registry = Arc::new(TabRegistry::with_defaults());
        let violations = Arc::new(AtomicUsize::new(0));
        let reader = Arc::downgrade(&registry);
        let counter = violations.clone();
        registry.subscribe(move |_| {
            if let Some(registry) = reader.upgrade() {
                if registry.get_all().iter().filter(|t| t.active).count() > 1 {
                    counter.fetch_add(1, Ordering::SeqCst);
                }
            }
        });

        let mut ids = Vec::new();
        for i in 0..6 {
            ids.push(registry.create(TabPatch::new().active(i % 2 == 0)).unwrap());
        }
        for id in ids.iter().rev() {
            registry.update(TabPatch::for_tab(*id).active(true)).unwrap();
            assert!(active_count(&registry) <= 1);
        }
        registry.remove(ids[0]).unwrap();

        assert_eq!(violations.load(Ordering::SeqCst), 0);
        assert!(active_count(&registry) <= 1);
    }

    #[test]
    fn test_discarded_forces_complete() {
        let registry = TabRegistry::with_defaults();
        let id = registry.create(TabPatch::new()).unwrap();
        let changed = registry.update(TabPatch::for_tab(id).discarded(true)).unwrap();
        let tab = registry.get(id).unwrap();

        assert!(tab.discarded);
        assert_eq!(tab.status, TabStatus::Complete);
        assert_eq!(changed, vec![TabField::Discarded, TabField::Status]);

        // Still complete while discarded, whatever the producer says.
        registry
            .update(TabPatch::for_tab(id).status(TabStatus::Loading))
            .unwrap();
        assert_eq!(registry.get(id).unwrap().status, TabStatus::Complete);
    }

    #[test]
    fn test_discarding_active_tab_is_noop() {
        let registry = TabRegistry::with_defaults();
        let id = registry
            .create(TabPatch::new().active(true).status(TabStatus::Complete))
            .unwrap();
        let changed = registry.update(TabPatch::for_tab(id).discarded(true)).unwrap();
        assert!(changed.is_empty());
        assert!(!registry.get(id).unwrap().discarded);
    }

    #[test]
    fn test_discard_then_activate_scenario() {
        let registry = TabRegistry::with_defaults();
        let tab1 = registry.create(TabPatch::new().session_id("s1")).unwrap();
        let tab2 = registry
            .create(TabPatch::new().session_id("s2").active(true))
            .unwrap();

        registry.update(TabPatch::for_tab(tab1).discarded(true)).unwrap();
        let first = registry.get(tab1).unwrap();
        assert_eq!(first.status, TabStatus::Complete);
        assert!(first.discarded);

        let log = recorded(&registry);
        registry.update(TabPatch::for_tab(tab1).active(true)).unwrap();

        let first = registry.get(tab1).unwrap();
        let second = registry.get(tab2).unwrap();
        assert!(first.active);
        assert!(!first.discarded);
        assert!(!second.active);

        let log = log.lock();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].1, tab2);
        assert_eq!(log[1].1, tab1);
        assert_eq!(log[1].2, vec![TabField::Active, TabField::Discarded]);
    }

    #[test]
    fn test_remove_unknown_leaves_store_unchanged() {
        let registry = TabRegistry::with_defaults();
        registry.create(TabPatch::new().title("keep")).unwrap();
        let before = registry.get_all();
        let missing = TabId::new(999).unwrap();

        assert_eq!(
            registry.remove(missing),
            Err(RegistryError::NotFound(missing))
        );
        assert_eq!(registry.get_all(), before);
    }

    #[test]
    fn test_update_unknown_is_not_found() {
        let registry = TabRegistry::with_defaults();
        let missing = TabId::new(5).unwrap();
        assert_eq!(
            registry.update(TabPatch::for_tab(missing).title("x")),
            Err(RegistryError::NotFound(missing))
        );
        assert!(registry.is_empty());
        assert_eq!(
            registry.apply(TabEvent::Update(TabPatch::new().title("x"))),
            Err(RegistryError::MissingId)
        );
    }

    #[test]
    fn test_remove_active_reports_active_and_selects_nothing() {
        let registry = TabRegistry::with_defaults();
        let a = registry.create(TabPatch::new()).unwrap();
        let b = registry.create(TabPatch::new().active(true)).unwrap();
        let log = recorded(&registry);

        let removed = registry.remove(b).unwrap();
        assert!(removed.active);
        assert_eq!(registry.active_tab_id(), None);
        assert_eq!(registry.last_tab_id(), Some(a));

        let log = log.lock();
        assert_eq!(log[0].0, EventKind::Remove);
        assert_eq!(log[0].2, vec![TabField::Active]);
        assert_eq!(log[0].3.id, b);
    }

    #[test]
    fn test_listener_failure_does_not_reach_caller() {
        let registry = TabRegistry::with_defaults();
        registry.subscribe(|_| panic!("listener bug"));
        let log = recorded(&registry);

        let id = registry.create(TabPatch::new()).unwrap();
        assert!(registry.contains(id));
        assert_eq!(log.lock().len(), 1);
    }

    #[test]
    fn test_listener_can_mutate_reentrantly() {
        let registry = Arc::new(TabRegistry::with_defaults());
        let weak = Arc::downgrade(&registry);
        registry.subscribe(move |n| {
            if n.kind == EventKind::Create && n.record.title.is_none() {
                if let Some(registry) = weak.upgrade() {
                    registry
                        .update(TabPatch::for_tab(n.id).title("New Tab"))
                        .unwrap();
                }
            }
        });

        let id = registry.create(TabPatch::new()).unwrap();
        assert_eq!(registry.get(id).unwrap().title.as_deref(), Some("New Tab"));
    }

    #[test]
    fn test_opener_lineage_tolerates_removed_parent() {
        let registry = TabRegistry::with_defaults();
        let root = registry.create(TabPatch::new()).unwrap();
        let child = registry.create(TabPatch::new().opener(root)).unwrap();
        let grandchild = registry.create(TabPatch::new().opener(child)).unwrap();

        assert_eq!(registry.depth(grandchild), 2);
        assert_eq!(registry.children(root), vec![child]);

        registry.remove(child).unwrap();
        assert_eq!(registry.parent(grandchild), None);
        assert_eq!(registry.depth(grandchild), 0);
        assert_eq!(
            registry.get(grandchild).unwrap().opener_tab_id,
            Some(child)
        );
    }

    #[test]
    fn test_independent_registries() {
        let a = TabRegistry::with_defaults();
        let b = TabRegistry::with_defaults();
        a.create(TabPatch::new()).unwrap();
        assert_eq!(a.len(), 1);
        assert!(b.is_empty());
    }

    #[test]
    fn test_dispose_rejects_mutations() {
        let registry = TabRegistry::with_defaults();
        let id = registry.create(TabPatch::new()).unwrap();
        registry.subscribe(|_| {});
        registry.dispose();

        assert!(registry.is_disposed());
        assert!(registry.is_empty());
        assert_eq!(registry.bus().subscriber_count(), 0);
        assert_eq!(
            registry.create(TabPatch::new()),
            Err(RegistryError::Disposed)
        );
        assert_eq!(registry.remove(id), Err(RegistryError::Disposed));
    }

    #[test]
    fn test_apply_dispatches_by_kind() {
        let registry = TabRegistry::with_defaults();
        let id = registry
            .apply(TabEvent::Create(TabPatch::new()))
            .unwrap()
            .unwrap();
        assert_eq!(
            registry
                .apply(TabEvent::Update(TabPatch::for_tab(id).title("t")))
                .unwrap(),
            Some(id)
        );
        assert_eq!(registry.apply(TabEvent::Remove(id)).unwrap(), Some(id));
        assert!(registry.is_empty());
    }
}
