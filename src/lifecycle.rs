//! Rendering surfaces and the bridge that turns their signals into registry
//! writes.
//!
//! A surface is whatever displays a tab's document. It reports what happens
//! to it (location, load progress, title, icon, popups) through
//! [`SurfaceBridge`], and receives stop/reload/back/forward through the
//! action relay. [`SurfaceDeck`] keeps one headless [`HistorySurface`] per
//! tab and loads URLs the way a browser deck would.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tabdeck_api::{ApiResult, TabsApi};
use tabdeck_registry::{TabAction, TabId, TabPatch, TabRecord, TabStatus};

/// Something that happened inside a tab's surface.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SurfaceEvent {
    LocationChange(String),
    LoadStart,
    LoadEnd,
    Error,
    IconChange(String),
    TitleChange(String),
    /// The document asked for a new tab (`target=_blank`, middle click).
    OpenTab(String),
    /// The document called `window.open`.
    OpenWindow(String),
}

pub struct SurfaceBridge {
    api: Arc<TabsApi>,
}

impl SurfaceBridge {
    pub fn new(api: Arc<TabsApi>) -> Self {
        Self { api }
    }

    /// Applies `event` reported by the surface of `tab_id`. Returns the id of
    /// a tab the event opened, if any. Signals from a discarded tab come from
    /// its placeholder document and are ignored.
    pub fn handle(&self, tab_id: TabId, event: SurfaceEvent) -> ApiResult<Option<TabId>> {
        if self.api.registry().get(tab_id)?.discarded {
            log::trace!("ignoring {:?} from discarded tab {}", event, tab_id);
            return Ok(None);
        }

        let patch = match event {
            SurfaceEvent::LocationChange(url) => TabPatch::new().url(url),
            SurfaceEvent::LoadStart => TabPatch::new().status(TabStatus::Loading),
            SurfaceEvent::LoadEnd | SurfaceEvent::Error => {
                TabPatch::new().status(TabStatus::Complete)
            }
            SurfaceEvent::IconChange(href) => TabPatch::new().fav_icon_url(href),
            SurfaceEvent::TitleChange(title) => TabPatch::new().title(title),
            SurfaceEvent::OpenTab(url) | SurfaceEvent::OpenWindow(url) => {
                let opened = self
                    .api
                    .create(TabPatch::new().url(url).active(true).opener(tab_id))?;
                return Ok(Some(opened.id));
            }
        };
        self.api.update(Some(tab_id), patch)?;
        Ok(None)
    }
}

/// Receiver of relayed tab actions.
pub trait NavigationSurface: Send + Sync {
    fn stop(&self);
    fn reload(&self);
    fn go_back(&self);
    fn go_forward(&self);
}

/// Runs `action` on `surface`. Unknown actions are not for surfaces and are
/// dropped.
pub fn perform(surface: &dyn NavigationSurface, action: &TabAction) {
    match action {
        TabAction::Stop => surface.stop(),
        TabAction::Reload => surface.reload(),
        TabAction::Back => surface.go_back(),
        TabAction::Forward => surface.go_forward(),
        TabAction::Other(name) => log::debug!("surface ignores action '{}'", name),
    }
}

struct History {
    entries: Vec<String>,
    cursor: usize,
    /// What the surface currently shows; trails `cursor` while a
    /// back/forward load is starting.
    location: Option<String>,
}

/// A surface without a renderer: navigation only moves through a history
/// list and every load finishes immediately.
pub struct HistorySurface {
    tab_id: TabId,
    bridge: Weak<SurfaceBridge>,
    history: Mutex<History>,
}

impl HistorySurface {
    pub fn new(tab_id: TabId, bridge: &Arc<SurfaceBridge>) -> Self {
        Self {
            tab_id,
            bridge: Arc::downgrade(bridge),
            history: Mutex::new(History {
                entries: Vec::new(),
                cursor: 0,
                location: None,
            }),
        }
    }

    pub fn location(&self) -> Option<String> {
        self.history.lock().location.clone()
    }

    #[cfg(test)]
    fn history_len(&self) -> usize {
        self.history.lock().entries.len()
    }

    /// Loads `url` as a new history entry, dropping any forward entries.
    pub fn navigate(&self, url: &str) {
        {
            let mut history = self.history.lock();
            if !history.entries.is_empty() {
                let keep = history.cursor + 1;
                history.entries.truncate(keep);
            }
            history.entries.push(url.to_string());
            history.cursor = history.entries.len() - 1;
            history.location = Some(url.to_string());
        }
        self.load(url);
    }

    fn step(&self, forward: bool) {
        let target = {
            let mut history = self.history.lock();
            let next = if forward {
                history.cursor + 1
            } else {
                match history.cursor.checked_sub(1) {
                    Some(previous) => previous,
                    None => return,
                }
            };
            let Some(url) = history.entries.get(next).cloned() else {
                return;
            };
            history.cursor = next;
            url
        };
        self.load(&target);
    }

    fn load(&self, url: &str) {
        self.emit(SurfaceEvent::LoadStart);
        self.history.lock().location = Some(url.to_string());
        self.emit(SurfaceEvent::LocationChange(url.to_string()));
        self.emit(SurfaceEvent::LoadEnd);
    }

    fn emit(&self, event: SurfaceEvent) {
        let Some(bridge) = self.bridge.upgrade() else {
            return;
        };
        if let Err(e) = bridge.handle(self.tab_id, event) {
            log::debug!("surface of tab {}: {}", self.tab_id, e);
        }
    }
}

impl NavigationSurface for HistorySurface {
    fn stop(&self) {
        self.emit(SurfaceEvent::LoadEnd);
    }

    fn reload(&self) {
        if let Some(url) = self.location() {
            self.load(&url);
        }
    }

    fn go_back(&self) {
        self.step(false);
    }

    fn go_forward(&self) {
        self.step(true);
    }
}

/// One surface per tab, created on first sight and dropped on removal.
pub struct SurfaceDeck {
    bridge: Arc<SurfaceBridge>,
    surfaces: Mutex<HashMap<TabId, Arc<HistorySurface>>>,
}

impl SurfaceDeck {
    /// Subscribes through `api`: updates load URLs, removals drop surfaces,
    /// relayed actions reach the matching surface.
    pub fn attach(api: &Arc<TabsApi>, bridge: Arc<SurfaceBridge>) -> Arc<Self> {
        let deck = Arc::new(Self {
            bridge,
            surfaces: Mutex::new(HashMap::new()),
        });

        let weak = Arc::downgrade(&deck);
        api.on_updated(move |_, _, tab| {
            if let Some(deck) = weak.upgrade() {
                deck.sync(tab);
            }
        });
        let weak = Arc::downgrade(&deck);
        api.on_removed(move |id, _, _| {
            if let Some(deck) = weak.upgrade() {
                deck.surfaces.lock().remove(&id);
            }
        });
        let weak = Arc::downgrade(&deck);
        api.on_action(move |id, action| {
            if let Some(surface) = weak.upgrade().and_then(|deck| deck.surface(id)) {
                perform(surface.as_ref(), action);
            }
        });

        deck
    }

    pub fn surface(&self, id: TabId) -> Option<Arc<HistorySurface>> {
        self.surfaces.lock().get(&id).cloned()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.surfaces.lock().len()
    }

    /// Discarded background tabs stay unloaded until they are activated.
    fn sync(&self, tab: &TabRecord) {
        let surface = self
            .surfaces
            .lock()
            .entry(tab.id)
            .or_insert_with(|| Arc::new(HistorySurface::new(tab.id, &self.bridge)))
            .clone();

        let Some(url) = tab.url.as_deref() else {
            return;
        };
        if surface.location().as_deref() != Some(url) && (!tab.discarded || tab.active) {
            surface.navigate(url);
        }
    }
}
