//! On-disk session format.

use serde::{Deserialize, Serialize};
use tabdeck_registry::TabRecord;

pub const SCHEMA_VERSION: u32 = 2;

/// Everything persisted for one profile.
///
/// Version 1 files only carried `tabs`; `closedTabs` arrived with version 2.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    #[serde(default)]
    pub created_at: Option<String>,
    /// `getAll()` at capture time, insertion order.
    #[serde(default)]
    pub tabs: Vec<TabRecord>,
    /// Most recently closed last.
    #[serde(default)]
    pub closed_tabs: Vec<ClosedTab>,
}

fn default_schema_version() -> u32 {
    1
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            created_at: None,
            tabs: Vec::new(),
            closed_tabs: Vec::new(),
        }
    }
}

impl SessionSnapshot {
    pub fn active_session_id(&self) -> Option<&str> {
        self.tabs
            .iter()
            .find(|tab| tab.active)
            .map(|tab| tab.session_id.as_str())
    }
}

/// A removed tab, kept so it can be reopened.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosedTab {
    pub tab: TabRecord,
    pub closed_at: String,
}
