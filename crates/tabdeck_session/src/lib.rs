//! Session persistence for the tab registry.
//!
//! The registry never persists itself. This crate snapshots `get_all()` to
//! disk and replays a snapshot through `apply(create, ...)` on the next
//! launch, so restored tabs keep their `id` and `sessionId`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let store = Arc::new(SessionStore::open_profile("default", 500)?);
//! store.restore(&registry)?;
//! store.autosave(&registry);
//! // ...
//! store.capture(&registry);
//! store.flush()?;
//! ```

pub mod error;
pub mod model;
pub mod storage;

pub use error::{StoreError, StoreResult};
pub use model::{ClosedTab, SCHEMA_VERSION, SessionSnapshot};

use std::path::PathBuf;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tabdeck_registry::{
    EventKind, SubscriptionId, TabEvent, TabId, TabPatch, TabRecord, TabRegistry, TabStatus,
};

use storage::{DebouncedStorage, Storage, default_storage_root};

/// Maximum number of closed tabs to keep for reopening.
const MAX_CLOSED_TABS: usize = 50;

struct Autosave {
    registry: Weak<TabRegistry>,
    subscription: SubscriptionId,
}

pub struct SessionStore {
    storage: DebouncedStorage,
    snapshot: Mutex<SessionSnapshot>,
    autosave: Mutex<Option<Autosave>>,
}

impl SessionStore {
    /// Opens the store for `profile` under the tabdeck data directory.
    pub fn open_profile(profile: impl Into<String>, debounce_ms: u64) -> StoreResult<Self> {
        Self::open(default_storage_root()?, profile, debounce_ms)
    }

    pub fn open(root: PathBuf, profile: impl Into<String>, debounce_ms: u64) -> StoreResult<Self> {
        let storage = Storage::new(root, profile.into());
        let snapshot = storage.load()?;
        log::debug!(
            "loaded session for profile '{}': {} tabs, {} closed",
            storage.profile(),
            snapshot.tabs.len(),
            snapshot.closed_tabs.len()
        );
        Ok(Self {
            storage: DebouncedStorage::new(storage, debounce_ms),
            snapshot: Mutex::new(snapshot),
            autosave: Mutex::new(None),
        })
    }

    /// Returns a clone of the current snapshot.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.lock().clone()
    }

    /// Records the registry's current tabs and queues a debounced write.
    pub fn capture(&self, registry: &TabRegistry) -> usize {
        let tabs = registry.get_all();
        let count = tabs.len();
        let mut snapshot = self.snapshot.lock();
        snapshot.tabs = tabs;
        snapshot.created_at = Some(now_rfc3339());
        self.storage.save(&snapshot);
        count
    }

    /// Replays the stored tabs into `registry` with their original identity.
    /// Tabs that already exist are updated in place, so restoring twice is
    /// harmless.
    pub fn restore(&self, registry: &TabRegistry) -> StoreResult<Vec<TabId>> {
        let tabs = self.snapshot.lock().tabs.clone();
        let mut restored = Vec::with_capacity(tabs.len());
        for tab in &tabs {
            if let Some(id) = registry.apply(TabEvent::Create(TabPatch::from_record(tab)))? {
                restored.push(id);
            }
        }
        log::info!("restored {} tabs", restored.len());
        Ok(restored)
    }

    /// Captures after every registry mutation and keeps removed tabs on the
    /// closed-tab stack. Replaces any earlier autosave subscription.
    pub fn autosave(self: &Arc<Self>, registry: &Arc<TabRegistry>) -> SubscriptionId {
        self.stop_autosave();

        let store = Arc::downgrade(self);
        let weak_registry = Arc::downgrade(registry);
        let subscription = registry.subscribe(move |notification| {
            let (Some(store), Some(registry)) = (store.upgrade(), weak_registry.upgrade()) else {
                return;
            };
            if notification.kind == EventKind::Remove {
                store.remember_closed(&notification.record);
            }
            store.capture(&registry);
        });

        *self.autosave.lock() = Some(Autosave {
            registry: Arc::downgrade(registry),
            subscription,
        });
        subscription
    }

    pub fn stop_autosave(&self) {
        let previous = self.autosave.lock().take();
        if let Some(autosave) = previous
            && let Some(registry) = autosave.registry.upgrade()
        {
            registry.unsubscribe(autosave.subscription);
        }
    }

    fn remember_closed(&self, tab: &TabRecord) {
        let mut snapshot = self.snapshot.lock();
        snapshot.closed_tabs.push(ClosedTab {
            tab: tab.clone(),
            closed_at: now_rfc3339(),
        });
        if snapshot.closed_tabs.len() > MAX_CLOSED_TABS {
            snapshot.closed_tabs.remove(0);
        }
    }

    /// Returns the number of closed tabs in the stack.
    pub fn closed_tab_count(&self) -> usize {
        self.snapshot.lock().closed_tabs.len()
    }

    /// Pops the most recently closed tab from the stack.
    pub fn pop_closed_tab(&self) -> Option<ClosedTab> {
        let mut snapshot = self.snapshot.lock();
        let tab = snapshot.closed_tabs.pop();
        if tab.is_some() {
            self.storage.save(&snapshot);
        }
        tab
    }

    /// Recreates the most recently closed tab under a fresh id, active and
    /// loading again. Keeps its `sessionId`.
    pub fn reopen_closed_tab(&self, registry: &TabRegistry) -> StoreResult<Option<TabId>> {
        let Some(closed) = self.pop_closed_tab() else {
            return Ok(None);
        };
        let mut patch = TabPatch::from_record(&closed.tab);
        patch.id = None;
        patch.active = Some(true);
        patch.discarded = Some(false);
        patch.status = Some(TabStatus::Loading);
        Ok(Some(registry.create(patch)?))
    }

    /// Forces an immediate save (useful before app exit).
    pub fn flush(&self) -> StoreResult<()> {
        let snapshot = self.snapshot.lock();
        self.storage.save_immediate(&snapshot)
    }
}

impl Drop for SessionStore {
    fn drop(&mut self) {
        self.stop_autosave();
    }
}

fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_default()
}
