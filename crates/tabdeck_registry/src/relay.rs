//! Imperative command channel for rendering surfaces.
//!
//! Stateless: commands are forwarded to every action listener and never
//! touch the store. Action names are an open set, so unknown names travel as
//! [`TabAction::Other`] instead of being rejected.

use std::fmt;
use std::sync::{Arc, Weak};

use crate::TabRegistry;
use crate::bus::{ListenerSet, SubscriptionId};
use crate::model::TabId;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TabAction {
    Stop,
    Reload,
    Back,
    Forward,
    Other(String),
}

impl TabAction {
    pub fn as_str(&self) -> &str {
        match self {
            TabAction::Stop => "stop",
            TabAction::Reload => "reload",
            TabAction::Back => "back",
            TabAction::Forward => "forward",
            TabAction::Other(name) => name,
        }
    }
}

impl From<&str> for TabAction {
    fn from(name: &str) -> Self {
        match name {
            "stop" => TabAction::Stop,
            "reload" => TabAction::Reload,
            "back" => TabAction::Back,
            "forward" => TabAction::Forward,
            other => TabAction::Other(other.to_string()),
        }
    }
}

impl From<String> for TabAction {
    fn from(name: String) -> Self {
        TabAction::from(name.as_str())
    }
}

impl fmt::Display for TabAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A command addressed to one tab's surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionCommand {
    pub tab_id: TabId,
    pub action: TabAction,
}

pub struct ActionRelay {
    registry: Weak<TabRegistry>,
    listeners: ListenerSet<ActionCommand>,
}

impl ActionRelay {
    /// The relay only reads the registry's active tab, at dispatch time.
    pub fn new(registry: &Arc<TabRegistry>) -> Self {
        Self {
            registry: Arc::downgrade(registry),
            listeners: ListenerSet::new(),
        }
    }

    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&ActionCommand) + Send + Sync + 'static,
    {
        self.listeners.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.listeners.unsubscribe(id)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Sends `action` to `tab_id`, or to the current active tab when no id is
    /// given. Returns the tab the command was delivered for, or `None` when
    /// there was no target.
    pub fn dispatch(&self, tab_id: Option<TabId>, action: impl Into<TabAction>) -> Option<TabId> {
        let action = action.into();
        let target = tab_id.or_else(|| {
            self.registry
                .upgrade()
                .and_then(|registry| registry.active_tab_id())
        });

        let Some(tab_id) = target else {
            log::debug!("dropping tab action '{}': no target and no active tab", action);
            return None;
        };

        tabdeck_shared::diagnostics::log(format!("tabs.do(#{}, {})", tab_id, action));
        self.listeners.emit(&ActionCommand { tab_id, action });
        Some(tab_id)
    }

    pub fn clear(&self) {
        self.listeners.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TabPatch;
    use parking_lot::Mutex;

    fn setup() -> (Arc<TabRegistry>, ActionRelay, Arc<Mutex<Vec<ActionCommand>>>) {
        let registry = Arc::new(TabRegistry::with_defaults());
        let relay = ActionRelay::new(&registry);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        relay.subscribe(move |command| sink.lock().push(command.clone()));
        (registry, relay, seen)
    }

    #[test]
    fn test_action_names_round_trip() {
        assert_eq!(TabAction::from("reload"), TabAction::Reload);
        assert_eq!(TabAction::from("back").as_str(), "back");
        assert_eq!(
            TabAction::from("zoom-in"),
            TabAction::Other("zoom-in".to_string())
        );
        assert_eq!(TabAction::from("zoom-in").as_str(), "zoom-in");
    }

    #[test]
    fn test_dispatch_explicit_target() {
        let (registry, relay, seen) = setup();
        let id = registry.create(TabPatch::new()).unwrap();

        assert_eq!(relay.dispatch(Some(id), "stop"), Some(id));
        assert_eq!(
            *seen.lock(),
            vec![ActionCommand {
                tab_id: id,
                action: TabAction::Stop
            }]
        );
    }

    #[test]
    fn test_dispatch_defaults_to_active_at_dispatch_time() {
        let (registry, relay, seen) = setup();
        let first = registry.create(TabPatch::new().active(true)).unwrap();
        let second = registry.create(TabPatch::new()).unwrap();

        relay.dispatch(None, "reload");
        registry.update(TabPatch::for_tab(second).active(true)).unwrap();
        relay.dispatch(None, "custom-action");

        let seen = seen.lock();
        assert_eq!(seen[0].tab_id, first);
        assert_eq!(seen[1].tab_id, second);
        assert_eq!(seen[1].action, TabAction::Other("custom-action".to_string()));
    }

    #[test]
    fn test_dispatch_without_active_tab_is_dropped() {
        let (registry, relay, seen) = setup();
        registry.create(TabPatch::new()).unwrap();
        assert_eq!(relay.dispatch(None, "back"), None);
        assert!(seen.lock().is_empty());
    }
}
