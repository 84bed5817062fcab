//! Payloads handed to `tabs.on*` listeners.

use serde::{Deserialize, Serialize};
use tabdeck_registry::{TabField, TabId, TabNotification, TabStatus};

/// Second argument of `onUpdated`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeInfo {
    pub status: TabStatus,
    pub changed: Vec<TabField>,
}

impl ChangeInfo {
    pub(crate) fn from_notification(notification: &TabNotification) -> Self {
        Self {
            status: notification.record.status,
            changed: notification.changed.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveInfo {
    pub tab_id: TabId,
    pub window_id: Option<i64>,
}

/// There are no windows to close, so `is_window_closing` is always false.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveInfo {
    pub window_id: Option<i64>,
    pub is_window_closing: bool,
}

impl RemoveInfo {
    pub(crate) fn from_notification(notification: &TabNotification) -> Self {
        Self {
            window_id: notification.record.window_id,
            is_window_closing: false,
        }
    }
}
