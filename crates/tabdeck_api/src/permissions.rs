//! Per-extension visibility of sensitive tab fields.

use std::collections::HashMap;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tabdeck_registry::{TabId, TabRecord};

/// Permissions an extension declared in its manifest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionPermissions {
    /// Full access to `url`, `title` and `favIconUrl` of every tab.
    #[serde(default)]
    pub tabs: bool,
    /// Access to one tab after an explicit user gesture grants it.
    #[serde(default)]
    pub active_tab: bool,
}

impl ExtensionPermissions {
    pub fn privileged() -> Self {
        Self {
            tabs: true,
            active_tab: true,
        }
    }
}

/// Tracks `activeTab` grants for one extension.
///
/// A grant is bound to the URL the tab showed when it was given; once the tab
/// navigates elsewhere the grant is stale and no longer counts.
#[derive(Debug, Default)]
pub struct TabPermissions {
    declared: ExtensionPermissions,
    grants: Mutex<HashMap<TabId, Option<String>>>,
}

impl TabPermissions {
    pub fn new(declared: ExtensionPermissions) -> Self {
        Self {
            declared,
            grants: Mutex::new(HashMap::new()),
        }
    }

    pub fn declared(&self) -> ExtensionPermissions {
        self.declared
    }

    /// Returns false when the extension never asked for `activeTab`.
    pub fn grant_active_tab(&self, record: &TabRecord) -> bool {
        if !self.declared.active_tab {
            return false;
        }
        self.grants.lock().insert(record.id, record.url.clone());
        true
    }

    pub fn revoke(&self, id: TabId) {
        self.grants.lock().remove(&id);
    }

    pub fn has_active_tab_permission(&self, record: &TabRecord) -> bool {
        self.declared.active_tab
            && self
                .grants
                .lock()
                .get(&record.id)
                .is_some_and(|granted_url| *granted_url == record.url)
    }

    pub fn has_tab_permission(&self, record: &TabRecord) -> bool {
        self.declared.tabs || self.has_active_tab_permission(record)
    }

    /// A copy of `record` with the permission-gated fields removed when the
    /// extension may not see them.
    pub fn filter(&self, record: &TabRecord) -> TabRecord {
        let mut copy = record.clone();
        if !self.has_tab_permission(record) {
            copy.url = None;
            copy.title = None;
            copy.fav_icon_url = None;
        }
        copy
    }
}
