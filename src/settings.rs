use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AppSettings {
    // Session
    #[serde(default = "default_profile")]
    pub profile: String,
    #[serde(default = "default_restore_session")]
    pub restore_session: bool,
    /// Delay before a captured session hits the disk.
    #[serde(default = "default_save_debounce_ms")]
    pub save_debounce_ms: u64,

    // Tabs
    #[serde(default = "default_new_tab_url")]
    pub new_tab_url: String,
    /// Lets the console see url/title/favIconUrl of every tab.
    #[serde(default = "default_grant_tabs_permission")]
    pub grant_tabs_permission: bool,

    // Debugging
    #[serde(default)]
    pub diagnostics: bool,
}

fn default_profile() -> String {
    "default".to_string()
}

fn default_restore_session() -> bool {
    true
}

fn default_save_debounce_ms() -> u64 {
    500
}

fn default_new_tab_url() -> String {
    "about:newtab".to_string()
}

fn default_grant_tabs_permission() -> bool {
    true
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            profile: default_profile(),
            restore_session: default_restore_session(),
            save_debounce_ms: default_save_debounce_ms(),
            new_tab_url: default_new_tab_url(),
            grant_tabs_permission: default_grant_tabs_permission(),
            diagnostics: false,
        }
    }
}

impl AppSettings {
    /// Get the settings file path
    fn settings_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("tabdeck").join("settings.toml"))
    }

    /// Load settings from file, or return defaults if file doesn't exist
    pub fn load() -> Self {
        Self::settings_path()
            .and_then(|path| {
                if path.exists() {
                    std::fs::read_to_string(&path).ok()
                } else {
                    None
                }
            })
            .and_then(|content| Self::parse(&content))
            .unwrap_or_default()
    }

    fn parse(content: &str) -> Option<Self> {
        match toml::from_str(content) {
            Ok(settings) => Some(settings),
            Err(e) => {
                log::warn!("ignoring unreadable settings.toml: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_fills_defaults() {
        let settings = AppSettings::parse("profile = \"work\"\ndiagnostics = true\n").unwrap();
        assert_eq!(settings.profile, "work");
        assert!(settings.diagnostics);
        assert!(settings.restore_session);
        assert_eq!(settings.save_debounce_ms, 500);
        assert_eq!(settings.new_tab_url, "about:newtab");
    }

    #[test]
    fn test_unparsable_file_is_ignored() {
        assert!(AppSettings::parse("profile = [").is_none());
    }

    #[test]
    fn test_toml_roundtrip() {
        let settings = AppSettings {
            save_debounce_ms: 50,
            ..AppSettings::default()
        };
        let content = toml::to_string_pretty(&settings).unwrap();
        assert_eq!(AppSettings::parse(&content), Some(settings));
    }
}
