//! Tab data model.
//!
//! [`TabRecord`] is the canonical per-tab structure held by the store,
//! [`TabPatch`] is the partial update producers hand to the registry, and
//! [`TabField`] names the fields reported as changed in notifications.

use std::fmt;
use std::num::NonZeroU64;

use serde::{Deserialize, Serialize};

/// Process-local tab identity. Never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct TabId(NonZeroU64);

impl TabId {
    /// Returns `None` for zero, which callers use to mean "no tab".
    pub fn new(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(Self)
    }

    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl TryFrom<u64> for TabId {
    type Error = String;

    fn try_from(raw: u64) -> Result<Self, Self::Error> {
        TabId::new(raw).ok_or_else(|| "tab id must be non-zero".to_string())
    }
}

impl From<TabId> for u64 {
    fn from(id: TabId) -> Self {
        id.get()
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Loading state of a tab's content surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TabStatus {
    #[default]
    Loading,
    Complete,
}

impl TabStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TabStatus::Loading => "loading",
            TabStatus::Complete => "complete",
        }
    }
}

impl fmt::Display for TabStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MutedInfo {
    pub muted: bool,
}

/// The kind of mutation a notification describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Create,
    Update,
    Remove,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Create => "create",
            EventKind::Update => "update",
            EventKind::Remove => "remove",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A mutation request handed to [`crate::TabRegistry::apply`].
#[derive(Debug, Clone, PartialEq)]
pub enum TabEvent {
    Create(TabPatch),
    Update(TabPatch),
    Remove(TabId),
}

impl TabEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            TabEvent::Create(_) => EventKind::Create,
            TabEvent::Update(_) => EventKind::Update,
            TabEvent::Remove(_) => EventKind::Remove,
        }
    }
}

/// Field names reported in `changed` lists, in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TabField {
    Id,
    Index,
    WindowId,
    OpenerTabId,
    Selected,
    Highlighted,
    Active,
    Pinned,
    Audible,
    Discarded,
    AutoDiscardable,
    MutedInfo,
    Url,
    Title,
    FavIconUrl,
    Status,
    Incognito,
    Width,
    Height,
    SessionId,
    Visible,
}

impl TabField {
    /// Every mergeable field, in the order changes are reported.
    pub const MERGEABLE: [TabField; 20] = [
        TabField::Index,
        TabField::WindowId,
        TabField::OpenerTabId,
        TabField::Selected,
        TabField::Highlighted,
        TabField::Active,
        TabField::Pinned,
        TabField::Audible,
        TabField::Discarded,
        TabField::AutoDiscardable,
        TabField::MutedInfo,
        TabField::Url,
        TabField::Title,
        TabField::FavIconUrl,
        TabField::Status,
        TabField::Incognito,
        TabField::Width,
        TabField::Height,
        TabField::SessionId,
        TabField::Visible,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TabField::Id => "id",
            TabField::Index => "index",
            TabField::WindowId => "windowId",
            TabField::OpenerTabId => "openerTabId",
            TabField::Selected => "selected",
            TabField::Highlighted => "highlighted",
            TabField::Active => "active",
            TabField::Pinned => "pinned",
            TabField::Audible => "audible",
            TabField::Discarded => "discarded",
            TabField::AutoDiscardable => "autoDiscardable",
            TabField::MutedInfo => "mutedInfo",
            TabField::Url => "url",
            TabField::Title => "title",
            TabField::FavIconUrl => "favIconUrl",
            TabField::Status => "status",
            TabField::Incognito => "incognito",
            TabField::Width => "width",
            TabField::Height => "height",
            TabField::SessionId => "sessionId",
            TabField::Visible => "visible",
        }
    }
}

impl fmt::Display for TabField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical state of one tab.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabRecord {
    pub id: TabId,
    /// Durable identifier used to correlate restored tabs across restarts.
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_id: Option<i64>,
    /// Weak back-reference; the opener may no longer exist.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opener_tab_id: Option<TabId>,
    #[serde(default)]
    pub selected: bool,
    #[serde(default)]
    pub highlighted: bool,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default)]
    pub audible: bool,
    #[serde(default)]
    pub discarded: bool,
    #[serde(default = "default_true")]
    pub auto_discardable: bool,
    #[serde(default)]
    pub muted_info: MutedInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fav_icon_url: Option<String>,
    #[serde(default)]
    pub status: TabStatus,
    #[serde(default)]
    pub incognito: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default = "default_true")]
    pub visible: bool,
}

fn default_true() -> bool {
    true
}

impl TabRecord {
    /// A freshly created record: loading, visible, inactive.
    pub fn new(id: TabId, session_id: impl Into<String>) -> Self {
        Self {
            id,
            session_id: session_id.into(),
            index: None,
            window_id: None,
            opener_tab_id: None,
            selected: false,
            highlighted: false,
            active: false,
            pinned: false,
            audible: false,
            discarded: false,
            auto_discardable: true,
            muted_info: MutedInfo::default(),
            url: None,
            title: None,
            fav_icon_url: None,
            status: TabStatus::Loading,
            incognito: false,
            width: None,
            height: None,
            visible: true,
        }
    }

    /// Copies every field present in `patch` onto the record.
    ///
    /// `id` and `sessionId` are identity and never overwritten here, and an
    /// opener pointing back at the record itself is ignored.
    pub fn merge(&mut self, patch: &TabPatch) {
        if let Some(index) = patch.index {
            self.index = Some(index);
        }
        if let Some(window_id) = patch.window_id {
            self.window_id = Some(window_id);
        }
        if let Some(opener) = patch.opener_tab_id {
            if opener == self.id {
                log::warn!("ignoring self-referencing openerTabId on tab {}", self.id);
            } else {
                self.opener_tab_id = Some(opener);
            }
        }
        merge_flag(&mut self.selected, patch.selected);
        merge_flag(&mut self.highlighted, patch.highlighted);
        merge_flag(&mut self.active, patch.active);
        merge_flag(&mut self.pinned, patch.pinned);
        merge_flag(&mut self.audible, patch.audible);
        merge_flag(&mut self.discarded, patch.discarded);
        merge_flag(&mut self.auto_discardable, patch.auto_discardable);
        if let Some(muted_info) = patch.muted_info {
            self.muted_info = muted_info;
        }
        if let Some(url) = &patch.url {
            self.url = Some(url.clone());
        }
        if let Some(title) = &patch.title {
            self.title = Some(title.clone());
        }
        if let Some(icon) = &patch.fav_icon_url {
            self.fav_icon_url = Some(icon.clone());
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        merge_flag(&mut self.incognito, patch.incognito);
        if let Some(width) = patch.width {
            self.width = Some(width);
        }
        if let Some(height) = patch.height {
            self.height = Some(height);
        }
        merge_flag(&mut self.visible, patch.visible);
    }

    /// Restores the per-record invariants after a merge: a discarded tab
    /// counts as loaded, and an active tab is never discarded.
    pub fn normalize(&mut self) {
        if self.discarded {
            self.status = TabStatus::Complete;
        }
        if self.active && self.discarded {
            self.discarded = false;
        }
    }

    /// Fields whose value differs between `self` and `other`, canonical order.
    pub fn diff(&self, other: &TabRecord) -> Vec<TabField> {
        TabField::MERGEABLE
            .iter()
            .copied()
            .filter(|field| !self.same_field(other, *field))
            .collect()
    }

    fn same_field(&self, other: &TabRecord, field: TabField) -> bool {
        match field {
            TabField::Id => self.id == other.id,
            TabField::Index => self.index == other.index,
            TabField::WindowId => self.window_id == other.window_id,
            TabField::OpenerTabId => self.opener_tab_id == other.opener_tab_id,
            TabField::Selected => self.selected == other.selected,
            TabField::Highlighted => self.highlighted == other.highlighted,
            TabField::Active => self.active == other.active,
            TabField::Pinned => self.pinned == other.pinned,
            TabField::Audible => self.audible == other.audible,
            TabField::Discarded => self.discarded == other.discarded,
            TabField::AutoDiscardable => self.auto_discardable == other.auto_discardable,
            TabField::MutedInfo => self.muted_info == other.muted_info,
            TabField::Url => self.url == other.url,
            TabField::Title => self.title == other.title,
            TabField::FavIconUrl => self.fav_icon_url == other.fav_icon_url,
            TabField::Status => self.status == other.status,
            TabField::Incognito => self.incognito == other.incognito,
            TabField::Width => self.width == other.width,
            TabField::Height => self.height == other.height,
            TabField::SessionId => self.session_id == other.session_id,
            TabField::Visible => self.visible == other.visible,
        }
    }
}

fn merge_flag(slot: &mut bool, value: Option<bool>) {
    if let Some(value) = value {
        *slot = value;
    }
}

/// Partial update. Absent (or JSON `null`) fields are never applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TabPatch {
    pub id: Option<TabId>,
    pub session_id: Option<String>,
    pub index: Option<i64>,
    pub window_id: Option<i64>,
    pub opener_tab_id: Option<TabId>,
    pub selected: Option<bool>,
    pub highlighted: Option<bool>,
    pub active: Option<bool>,
    pub pinned: Option<bool>,
    pub audible: Option<bool>,
    pub discarded: Option<bool>,
    pub auto_discardable: Option<bool>,
    pub muted_info: Option<MutedInfo>,
    pub url: Option<String>,
    pub title: Option<String>,
    pub fav_icon_url: Option<String>,
    pub status: Option<TabStatus>,
    pub incognito: Option<bool>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub visible: Option<bool>,
}

impl TabPatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// A patch targeting an existing tab.
    pub fn for_tab(id: TabId) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }

    /// Captures every field of `record`, including its identity. Used to
    /// replay a snapshot through `create` on restore.
    pub fn from_record(record: &TabRecord) -> Self {
        Self {
            id: Some(record.id),
            session_id: Some(record.session_id.clone()),
            index: record.index,
            window_id: record.window_id,
            opener_tab_id: record.opener_tab_id,
            selected: Some(record.selected),
            highlighted: Some(record.highlighted),
            active: Some(record.active),
            pinned: Some(record.pinned),
            audible: Some(record.audible),
            discarded: Some(record.discarded),
            auto_discardable: Some(record.auto_discardable),
            muted_info: Some(record.muted_info),
            url: record.url.clone(),
            title: record.title.clone(),
            fav_icon_url: record.fav_icon_url.clone(),
            status: Some(record.status),
            incognito: Some(record.incognito),
            width: record.width,
            height: record.height,
            visible: Some(record.visible),
        }
    }

    pub fn with_id(mut self, id: TabId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn fav_icon_url(mut self, url: impl Into<String>) -> Self {
        self.fav_icon_url = Some(url.into());
        self
    }

    pub fn status(mut self, status: TabStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn active(mut self, active: bool) -> Self {
        self.active = Some(active);
        self
    }

    pub fn selected(mut self, selected: bool) -> Self {
        self.selected = Some(selected);
        self
    }

    pub fn highlighted(mut self, highlighted: bool) -> Self {
        self.highlighted = Some(highlighted);
        self
    }

    pub fn discarded(mut self, discarded: bool) -> Self {
        self.discarded = Some(discarded);
        self
    }

    pub fn pinned(mut self, pinned: bool) -> Self {
        self.pinned = Some(pinned);
        self
    }

    pub fn audible(mut self, audible: bool) -> Self {
        self.audible = Some(audible);
        self
    }

    pub fn muted(mut self, muted: bool) -> Self {
        self.muted_info = Some(MutedInfo { muted });
        self
    }

    pub fn visible(mut self, visible: bool) -> Self {
        self.visible = Some(visible);
        self
    }

    pub fn opener(mut self, opener: TabId) -> Self {
        self.opener_tab_id = Some(opener);
        self
    }

    pub fn index(mut self, index: i64) -> Self {
        self.index = Some(index);
        self
    }

    pub fn window_id(mut self, window_id: i64) -> Self {
        self.window_id = Some(window_id);
        self
    }

    /// Mergeable fields this patch carries, canonical order.
    pub fn supplied_fields(&self) -> Vec<TabField> {
        TabField::MERGEABLE
            .iter()
            .copied()
            .filter(|field| self.supplies(*field))
            .collect()
    }

    fn supplies(&self, field: TabField) -> bool {
        match field {
            TabField::Id => self.id.is_some(),
            TabField::Index => self.index.is_some(),
            TabField::WindowId => self.window_id.is_some(),
            TabField::OpenerTabId => self.opener_tab_id.is_some(),
            TabField::Selected => self.selected.is_some(),
            TabField::Highlighted => self.highlighted.is_some(),
            TabField::Active => self.active.is_some(),
            TabField::Pinned => self.pinned.is_some(),
            TabField::Audible => self.audible.is_some(),
            TabField::Discarded => self.discarded.is_some(),
            TabField::AutoDiscardable => self.auto_discardable.is_some(),
            TabField::MutedInfo => self.muted_info.is_some(),
            TabField::Url => self.url.is_some(),
            TabField::Title => self.title.is_some(),
            TabField::FavIconUrl => self.fav_icon_url.is_some(),
            TabField::Status => self.status.is_some(),
            TabField::Incognito => self.incognito.is_some(),
            TabField::Width => self.width.is_some(),
            TabField::Height => self.height.is_some(),
            TabField::SessionId => self.session_id.is_some(),
            TabField::Visible => self.visible.is_some(),
        }
    }

    /// Names of the supplied fields, for trace output.
    pub fn describe(&self) -> String {
        let mut names: Vec<&str> = Vec::new();
        if self.id.is_some() {
            names.push(TabField::Id.as_str());
        }
        names.extend(self.supplied_fields().iter().map(|field| field.as_str()));
        names.join(",")
    }
}
