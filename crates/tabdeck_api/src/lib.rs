//! One extension's view of the tab registry.
//!
//! Everything here goes through the registry's public reads and writes; the
//! API layer keeps no tab state of its own beyond `activeTab` grants.

pub mod error;
pub mod events;
pub mod permissions;
pub mod query;

use std::sync::Arc;

use parking_lot::Mutex;
use tabdeck_registry::{
    ActionCommand, ActionRelay, EventKind, SubscriptionId, TabAction, TabId, TabPatch, TabRecord,
    TabRegistry,
};

pub use error::{ApiError, ApiResult};
pub use events::{ActiveInfo, ChangeInfo, RemoveInfo};
pub use permissions::{ExtensionPermissions, TabPermissions};
pub use query::{MatchPattern, QueryInfo};

pub struct TabsApi {
    registry: Arc<TabRegistry>,
    relay: Arc<ActionRelay>,
    permissions: Arc<TabPermissions>,
    event_subscriptions: Mutex<Vec<SubscriptionId>>,
    action_subscriptions: Mutex<Vec<SubscriptionId>>,
}

impl TabsApi {
    pub fn new(
        registry: Arc<TabRegistry>,
        relay: Arc<ActionRelay>,
        permissions: ExtensionPermissions,
    ) -> Self {
        let permissions = Arc::new(TabPermissions::new(permissions));
        // Grants die with their tab, whoever removes it.
        let grants = permissions.clone();
        let prune = registry.subscribe(move |notification| {
            if notification.kind == EventKind::Remove {
                grants.revoke(notification.id);
            }
        });

        Self {
            registry,
            relay,
            permissions,
            event_subscriptions: Mutex::new(vec![prune]),
            action_subscriptions: Mutex::new(Vec::new()),
        }
    }

    pub fn registry(&self) -> &Arc<TabRegistry> {
        &self.registry
    }

    pub fn permissions(&self) -> &TabPermissions {
        &self.permissions
    }

    pub fn get(&self, id: TabId) -> ApiResult<TabRecord> {
        let record = self.registry.get(id)?;
        Ok(self.permissions.filter(&record))
    }

    pub fn get_current(&self) -> Option<TabRecord> {
        let id = self.registry.active_tab_id()?;
        self.get(id).ok()
    }

    /// Updates `id`, or the active tab when `id` is `None`.
    pub fn update(&self, id: Option<TabId>, patch: TabPatch) -> ApiResult<TabRecord> {
        tabdeck_shared::diagnostics::log(format!("tabs.update({:?}, {})", id, patch.describe()));
        let target = match id.or_else(|| self.registry.active_tab_id()) {
            Some(target) => target,
            None => {
                log::warn!("tabs.update({}) without any active tab", patch.describe());
                return Err(ApiError::NoActiveTab);
            }
        };
        self.registry.update(patch.with_id(target))?;
        self.get(target)
    }

    /// Creates a tab. The opener defaults to whatever tab is active now.
    pub fn create(&self, mut patch: TabPatch) -> ApiResult<TabRecord> {
        tabdeck_shared::diagnostics::log(format!("tabs.create({})", patch.describe()));
        if patch.opener_tab_id.is_none() {
            patch.opener_tab_id = self.registry.active_tab_id();
        }
        let id = self.registry.create(patch)?;
        self.get(id)
    }

    /// Points the active tab at `url`. Used by internal pages that want to
    /// navigate without knowing which tab they live in.
    pub fn open_url(&self, url: impl Into<String>) -> ApiResult<TabRecord> {
        self.update(None, TabPatch::new().url(url))
    }

    /// Makes the single tab in `ids` the selected, highlighted, active one.
    pub fn highlight(&self, ids: &[TabId]) -> ApiResult<()> {
        let id = match ids {
            [] => return Err(ApiError::EmptyHighlight),
            [id] => *id,
            _ => return Err(ApiError::MultipleHighlight),
        };
        tabdeck_shared::diagnostics::log(format!("tabs.highlight(#{})", id));
        self.registry.update(
            TabPatch::for_tab(id)
                .selected(true)
                .highlighted(true)
                .active(true),
        )?;
        Ok(())
    }

    /// Removes a tab. When it was the active one, the most recently inserted
    /// remaining tab takes over.
    pub fn remove(&self, id: TabId) -> ApiResult<()> {
        let was_active = self.registry.get(id)?.active;
        self.registry.remove(id)?;

        if was_active && let Some(last) = self.registry.last_tab_id() {
            self.highlight(&[last])?;
        }
        Ok(())
    }

    pub fn query(&self, info: &QueryInfo) -> ApiResult<Vec<TabRecord>> {
        let pattern = match &info.url {
            Some(url) => {
                if !self.permissions.declared().tabs {
                    return Err(ApiError::PermissionDenied("tabs"));
                }
                Some(MatchPattern::parse(url)?)
            }
            None => None,
        };

        Ok(self
            .registry
            .get_all()
            .into_iter()
            .filter(|tab| info.matches(tab))
            .filter(|tab| {
                pattern.as_ref().is_none_or(|pattern| {
                    tab.url.as_deref().is_some_and(|url| pattern.matches(url))
                })
            })
            .map(|tab| self.permissions.filter(&tab))
            .collect())
    }

    /// `tabs.do`: forwards `action` to the surface of `id` or of the active
    /// tab.
    pub fn do_action(&self, id: Option<TabId>, action: impl Into<TabAction>) -> Option<TabId> {
        self.relay.dispatch(id, action)
    }

    pub fn on_action<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(TabId, &TabAction) + Send + Sync + 'static,
    {
        let id = self
            .relay
            .subscribe(move |command: &ActionCommand| listener(command.tab_id, &command.action));
        self.action_subscriptions.lock().push(id);
        id
    }

    pub fn remove_action_listener(&self, id: SubscriptionId) -> bool {
        self.action_subscriptions.lock().retain(|existing| *existing != id);
        self.relay.unsubscribe(id)
    }

    pub fn on_created<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(TabId, &TabRecord) + Send + Sync + 'static,
    {
        let permissions = self.permissions.clone();
        self.track(self.registry.subscribe(move |notification| {
            if notification.kind == EventKind::Create {
                listener(notification.id, &permissions.filter(&notification.record));
            }
        }))
    }

    /// Fires for creations as well as updates.
    pub fn on_updated<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(TabId, &ChangeInfo, &TabRecord) + Send + Sync + 'static,
    {
        let permissions = self.permissions.clone();
        self.track(self.registry.subscribe(move |notification| {
            if notification.kind == EventKind::Remove {
                return;
            }
            listener(
                notification.id,
                &ChangeInfo::from_notification(notification),
                &permissions.filter(&notification.record),
            );
        }))
    }

    pub fn on_activated<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&ActiveInfo) + Send + Sync + 'static,
    {
        self.track(self.registry.subscribe(move |notification| {
            if notification.activated() {
                listener(&ActiveInfo {
                    tab_id: notification.id,
                    window_id: notification.record.window_id,
                });
            }
        }))
    }

    /// The record passed to the listener is a detached copy; the tab itself
    /// is already gone from the registry.
    pub fn on_removed<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(TabId, &RemoveInfo, &TabRecord) + Send + Sync + 'static,
    {
        let permissions = self.permissions.clone();
        self.track(self.registry.subscribe(move |notification| {
            if notification.kind == EventKind::Remove {
                listener(
                    notification.id,
                    &RemoveInfo::from_notification(notification),
                    &permissions.filter(&notification.record),
                );
            }
        }))
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.event_subscriptions.lock().retain(|existing| *existing != id);
        self.registry.unsubscribe(id)
    }

    /// Records an `activeTab` grant for `id` at its current URL.
    pub fn grant_active_tab(&self, id: TabId) -> ApiResult<()> {
        let record = self.registry.get(id)?;
        if !self.permissions.grant_active_tab(&record) {
            return Err(ApiError::PermissionDenied("activeTab"));
        }
        Ok(())
    }

    fn track(&self, id: SubscriptionId) -> SubscriptionId {
        self.event_subscriptions.lock().push(id);
        id
    }
}

impl Drop for TabsApi {
    fn drop(&mut self) {
        for id in self.event_subscriptions.lock().drain(..) {
            self.registry.unsubscribe(id);
        }
        for id in self.action_subscriptions.lock().drain(..) {
            self.relay.unsubscribe(id);
        }
    }
}
