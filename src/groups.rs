//! Tab groups: named sets of tabs, one of them shown at a time.
//!
//! Membership is tracked by `sessionId`, so a restored tab lands back in the
//! group it belonged to. Groups live in memory only.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tabdeck_api::{ApiResult, QueryInfo, TabsApi};
use tabdeck_registry::{TabId, TabPatch, TabRecord};

#[derive(Clone, Debug, PartialEq)]
pub struct TabGroup {
    pub name: String,
    /// Session ids of member tabs.
    pub tabs: Vec<String>,
    /// Session id of the tab to re-activate when the group is selected.
    pub active: Option<String>,
}

impl TabGroup {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tabs: Vec::new(),
            active: None,
        }
    }
}

struct GroupsState {
    groups: Vec<TabGroup>,
    current: usize,
}

pub struct TabGroups {
    api: Arc<TabsApi>,
    state: Mutex<GroupsState>,
}

impl TabGroups {
    /// Starts with a single "default" group and follows the registry through
    /// `api` from then on.
    pub fn attach(api: Arc<TabsApi>) -> Arc<Self> {
        let groups = Arc::new(Self {
            api: api.clone(),
            state: Mutex::new(GroupsState {
                groups: vec![TabGroup::new("default")],
                current: 0,
            }),
        });

        let weak = Arc::downgrade(&groups);
        api.on_created(move |id, tab| with(&weak, |groups| groups.tab_created(id, tab)));
        let weak = Arc::downgrade(&groups);
        api.on_updated(move |_, _, tab| with(&weak, |groups| groups.tab_updated(tab)));
        let weak = Arc::downgrade(&groups);
        api.on_removed(move |_, _, tab| with(&weak, |groups| groups.tab_removed(tab)));

        groups
    }

    pub fn groups(&self) -> Vec<TabGroup> {
        self.state.lock().groups.clone()
    }

    pub fn current(&self) -> usize {
        self.state.lock().current
    }

    /// Returns the new group's position.
    pub fn create(&self, name: impl Into<String>) -> usize {
        let mut state = self.state.lock();
        state.groups.push(TabGroup::new(name));
        state.groups.len() - 1
    }

    /// Shows the members of group `position`, hides every other tab, and
    /// re-activates the group's remembered tab. Returns false for an unknown
    /// position.
    pub fn select(&self, position: usize) -> ApiResult<bool> {
        let (members, active) = {
            let mut state = self.state.lock();
            let Some(group) = state.groups.get(position) else {
                return Ok(false);
            };
            let selection = (group.tabs.clone(), group.active.clone());
            state.current = position;
            selection
        };

        for tab in self.api.query(&QueryInfo::new())? {
            let visible = members.contains(&tab.session_id);
            let active = active.as_deref() == Some(tab.session_id.as_str());
            self.api
                .update(Some(tab.id), TabPatch::new().visible(visible).active(active))?;
        }
        Ok(true)
    }

    fn tab_created(&self, id: TabId, tab: &TabRecord) {
        let visible = {
            let mut state = self.state.lock();
            let current = state.current;
            if state.groups[current].tabs.contains(&tab.session_id) {
                // Restored into the group being shown.
                (!tab.visible).then_some(true)
            } else if state
                .groups
                .iter()
                .any(|group| group.tabs.contains(&tab.session_id))
            {
                // Restored into a group that is not shown.
                tab.visible.then_some(false)
            } else {
                state.groups[current].tabs.push(tab.session_id.clone());
                None
            }
        };

        if let Some(visible) = visible
            && let Err(e) = self.api.update(Some(id), TabPatch::new().visible(visible))
        {
            log::warn!("could not set visibility of tab {}: {}", id, e);
        }
    }

    fn tab_updated(&self, tab: &TabRecord) {
        if !tab.active {
            return;
        }
        let mut state = self.state.lock();
        let current = state.current;
        let group = &mut state.groups[current];
        if group.tabs.contains(&tab.session_id) {
            group.active = Some(tab.session_id.clone());
        }
    }

    fn tab_removed(&self, tab: &TabRecord) {
        let mut state = self.state.lock();
        for group in &mut state.groups {
            group.tabs.retain(|session_id| *session_id != tab.session_id);
            if group.active.as_deref() == Some(tab.session_id.as_str()) {
                group.active = None;
            }
        }
    }
}

fn with(groups: &Weak<TabGroups>, f: impl FnOnce(&TabGroups)) {
    if let Some(groups) = groups.upgrade() {
        f(&groups);
    }
}
