//! Application state: the registry and everything wired around it.

use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Result, bail};
use tabdeck_api::{ExtensionPermissions, QueryInfo, TabsApi};
use tabdeck_registry::{ActionRelay, TabPatch, TabRecord, TabRegistry, TabStatus};
use tabdeck_session::SessionStore;

use super::actions::{Command, HELP};
use crate::groups::TabGroups;
use crate::lifecycle::{SurfaceBridge, SurfaceDeck, SurfaceEvent};
use crate::settings::AppSettings;

/// What the console loop should do after a command.
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    Continue(String),
    Quit,
}

pub struct AppState {
    pub(crate) settings: AppSettings,
    pub(crate) registry: Arc<TabRegistry>,
    pub(crate) api: Arc<TabsApi>,
    pub(crate) bridge: Arc<SurfaceBridge>,
    pub(crate) deck: Arc<SurfaceDeck>,
    pub(crate) groups: Arc<TabGroups>,
    pub(crate) session: Option<Arc<SessionStore>>,
}

impl AppState {
    /// Opens the profile's session store under the tabdeck data directory.
    pub fn new(settings: AppSettings) -> Result<Self> {
        let root = tabdeck_session::storage::default_storage_root()?;
        Self::with_storage_root(settings, Some(root))
    }

    /// `None` runs without persistence.
    pub fn with_storage_root(settings: AppSettings, root: Option<PathBuf>) -> Result<Self> {
        let registry = Arc::new(TabRegistry::with_defaults());
        let relay = Arc::new(ActionRelay::new(&registry));
        let extension =
            |permissions| Arc::new(TabsApi::new(registry.clone(), relay.clone(), permissions));

        let console_permissions = ExtensionPermissions {
            tabs: settings.grant_tabs_permission,
            active_tab: true,
        };
        let api = extension(console_permissions);
        let deck_api = extension(ExtensionPermissions::privileged());
        let bridge = Arc::new(SurfaceBridge::new(deck_api.clone()));
        let deck = SurfaceDeck::attach(&deck_api, bridge.clone());
        let groups = TabGroups::attach(extension(ExtensionPermissions::privileged()));

        let session = match root {
            Some(root) => Some(Arc::new(SessionStore::open(
                root,
                settings.profile.clone(),
                settings.save_debounce_ms,
            )?)),
            None => None,
        };

        Ok(Self {
            settings,
            registry,
            api,
            bridge,
            deck,
            groups,
            session,
        })
    }

    /// Restores the last session when enabled, starts autosaving, and makes
    /// sure there is at least one tab.
    pub fn start(&self) -> Result<()> {
        if let Some(session) = &self.session {
            if self.settings.restore_session {
                let restored = session.restore(&self.registry)?;
                log::info!(
                    "restored {} tabs from profile '{}'",
                    restored.len(),
                    self.settings.profile
                );
            }
            session.autosave(&self.registry);
        }
        if self.registry.is_empty() {
            self.new_tab(None)?;
        } else if self.registry.active_tab_id().is_none()
            && let Some(last) = self.registry.last_tab_id()
        {
            self.api.highlight(&[last])?;
        }
        Ok(())
    }

    /// Captures and writes the session, then tears the registry down.
    pub fn shutdown(&self) -> Result<()> {
        if let Some(session) = &self.session {
            session.stop_autosave();
            session.capture(&self.registry);
            session.flush()?;
        }
        self.registry.dispose();
        Ok(())
    }

    pub fn execute(&self, command: Command) -> Result<Outcome> {
        let output = match command {
            Command::NewTab(url) => {
                let tab = self.new_tab(url)?;
                format!("opened {}", describe(&tab))
            }
            Command::Open(url) => {
                let tab = self.api.open_url(url)?;
                describe(&tab)
            }
            Command::Close(id) => {
                let Some(id) = id.or_else(|| self.registry.active_tab_id()) else {
                    bail!("no tab to close");
                };
                self.api.remove(id)?;
                format!("closed #{}", id)
            }
            Command::Activate(id) => {
                self.api.highlight(&[id])?;
                describe(&self.api.get(id)?)
            }
            Command::Discard(id) => {
                if self.registry.get(id)?.active {
                    bail!("#{} is active; activate another tab first", id);
                }
                let tab = self.api.update(Some(id), TabPatch::new().discarded(true))?;
                describe(&tab)
            }
            Command::Title(id, title) => {
                self.bridge.handle(id, SurfaceEvent::TitleChange(title))?;
                describe(&self.api.get(id)?)
            }
            Command::Do(action, id) => match self.api.do_action(id, action.as_str()) {
                Some(target) => {
                    let location = self
                        .deck
                        .surface(target)
                        .and_then(|surface| surface.location())
                        .unwrap_or_default();
                    format!("{} -> #{} <{}>", action, target, location)
                }
                None => bail!("no target for '{}'", action),
            },
            Command::Reopen => match &self.session {
                Some(session) => match session.reopen_closed_tab(&self.registry)? {
                    Some(id) => format!("reopened {}", describe(&self.api.get(id)?)),
                    None => "nothing to reopen".to_string(),
                },
                None => bail!("session persistence is off"),
            },
            Command::List => self.list()?,
            Command::Tree => self.tree(),
            Command::GroupNew(name) => {
                let position = self.groups.create(name.as_str());
                format!("group {} '{}'", position, name)
            }
            Command::GroupSelect(position) => {
                if !self.groups.select(position)? {
                    bail!("no group {}", position);
                }
                self.list_groups()
            }
            Command::Groups => self.list_groups(),
            Command::Save => match &self.session {
                Some(session) => {
                    let count = session.capture(&self.registry);
                    session.flush()?;
                    format!("saved {} tabs", count)
                }
                None => bail!("session persistence is off"),
            },
            Command::Help => HELP.to_string(),
            Command::Quit => return Ok(Outcome::Quit),
        };
        Ok(Outcome::Continue(output))
    }

    fn new_tab(&self, url: Option<String>) -> Result<TabRecord> {
        let url = url.unwrap_or_else(|| self.settings.new_tab_url.clone());
        Ok(self.api.create(TabPatch::new().url(url).active(true))?)
    }

    fn list(&self) -> Result<String> {
        let mut out = String::new();
        for tab in self.api.query(&QueryInfo::new())? {
            let _ = writeln!(out, "{}", describe(&tab));
        }
        Ok(out.trim_end().to_string())
    }

    fn tree(&self) -> String {
        let mut out = String::new();
        for (id, depth) in self.registry.tree() {
            let line = match self.api.get(id) {
                Ok(tab) => describe(&tab),
                Err(_) => format!("#{}", id),
            };
            let _ = writeln!(out, "{}{}", "  ".repeat(depth), line);
        }
        out.trim_end().to_string()
    }

    fn list_groups(&self) -> String {
        let current = self.groups.current();
        let mut out = String::new();
        for (position, group) in self.groups.groups().iter().enumerate() {
            let marker = if position == current { "*" } else { " " };
            let _ = writeln!(
                out,
                "{} {} {} ({})",
                marker,
                position,
                group.name,
                group.tabs.len()
            );
        }
        out.trim_end().to_string()
    }
}

/// One-line summary: `#id [flags] title <url>`.
fn describe(tab: &TabRecord) -> String {
    let mut flags = String::new();
    if tab.active {
        flags.push('*');
    }
    if tab.discarded {
        flags.push('z');
    }
    if !tab.visible {
        flags.push('h');
    }
    if tab.status == TabStatus::Loading {
        flags.push('~');
    }
    format!(
        "#{} [{}] {} <{}>",
        tab.id,
        flags,
        tab.title.as_deref().unwrap_or("(untitled)"),
        tab.url.as_deref().unwrap_or("")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabdeck_registry::TabId;
    use tempfile::TempDir;

    fn settings() -> AppSettings {
        AppSettings {
            save_debounce_ms: 60_000,
            ..AppSettings::default()
        }
    }

    fn run(state: &AppState, line: &str) -> String {
        match state.execute(Command::parse(line).unwrap().unwrap()).unwrap() {
            Outcome::Continue(output) => output,
            Outcome::Quit => "quit".to_string(),
        }
    }

    fn id(raw: u64) -> TabId {
        TabId::new(raw).unwrap()
    }

    #[test]
    fn test_start_opens_new_tab_page() {
        let state = AppState::with_storage_root(settings(), None).unwrap();
        state.start().unwrap();
        let tab = state.api.get_current().unwrap();
        assert_eq!(tab.url.as_deref(), Some("about:newtab"));
        assert_eq!(state.deck.len(), 1);
    }

    #[test]
    fn test_console_session() {
        let state = AppState::with_storage_root(settings(), None).unwrap();
        state.start().unwrap();

        run(&state, "new https://a.example/");
        assert_eq!(state.registry.active_tab_id(), Some(id(2)));
        assert_eq!(state.registry.parent(id(2)), Some(id(1)));

        run(&state, "open https://b.example/");
        run(&state, "do back");
        assert_eq!(
            state.api.get(id(2)).unwrap().url.as_deref(),
            Some("https://a.example/")
        );

        run(&state, "title 2 Example");
        assert!(run(&state, "list").contains("#2 [*] Example <https://a.example/>"));

        run(&state, "close");
        assert_eq!(state.registry.active_tab_id(), Some(id(1)));
        assert_eq!(run(&state, "quit"), "quit");
    }

    #[test]
    fn test_discard_then_activate_reloads() {
        let state = AppState::with_storage_root(settings(), None).unwrap();
        state.start().unwrap();
        run(&state, "new https://a.example/");

        assert!(state.execute(Command::Discard(id(2))).is_err());
        run(&state, "discard 1");
        assert!(state.registry.get(id(1)).unwrap().discarded);

        run(&state, "activate 1");
        let tab = state.registry.get(id(1)).unwrap();
        assert!(tab.active && !tab.discarded);
        assert!(!state.registry.get(id(2)).unwrap().active);
    }

    #[test]
    fn test_groups_hide_and_show_tabs() {
        let state = AppState::with_storage_root(settings(), None).unwrap();
        state.start().unwrap();

        run(&state, "group new work");
        run(&state, "group select 1");
        run(&state, "new https://work.example/");
        assert!(!state.registry.get(id(1)).unwrap().visible);

        let listing = run(&state, "groups");
        assert!(listing.contains("* 1 work (1)"));

        run(&state, "group select 0");
        assert_eq!(state.registry.active_tab_id(), Some(id(1)));
        assert!(!state.registry.get(id(2)).unwrap().visible);
        assert!(state.execute(Command::GroupSelect(9)).is_err());
    }

    #[test]
    fn test_session_survives_restart() {
        let temp = TempDir::new().unwrap();
        let root = Some(temp.path().to_path_buf());
        {
            let state = AppState::with_storage_root(settings(), root.clone()).unwrap();
            state.start().unwrap();
            run(&state, "new https://a.example/");
            run(&state, "new https://b.example/");
            run(&state, "close 3");
            state.shutdown().unwrap();
        }

        let state = AppState::with_storage_root(settings(), root).unwrap();
        state.start().unwrap();
        assert_eq!(state.registry.len(), 2);
        assert_eq!(state.registry.active_tab_id(), Some(id(2)));
        assert_eq!(
            state.api.get(id(2)).unwrap().url.as_deref(),
            Some("https://a.example/")
        );

        run(&state, "reopen");
        assert_eq!(
            state.api.get_current().unwrap().url.as_deref(),
            Some("https://b.example/")
        );
        assert_eq!(state.registry.active_tab_id(), Some(id(3)));
    }
}
