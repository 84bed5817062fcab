use std::fs::{OpenOptions, create_dir_all};
use std::io::Write;
use std::path::PathBuf;
use std::sync::{
    OnceLock,
    atomic::{AtomicBool, Ordering},
};

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::paths;

const DIAG_ENV: &str = "TABDECK_DIAG";

static DIAG_ENABLED: AtomicBool = AtomicBool::new(false);
static DIAG_ENABLED_INIT: OnceLock<()> = OnceLock::new();

/// Explicitly set diagnostics enabled state. Call early in main().
/// If not called, falls back to checking the TABDECK_DIAG env var.
pub fn set_enabled(enabled: bool) {
    DIAG_ENABLED.store(enabled, Ordering::Relaxed);
    let _ = DIAG_ENABLED_INIT.set(());
}

/// Returns whether the diagnostics trace is currently written.
pub fn enabled() -> bool {
    if DIAG_ENABLED_INIT.get().is_some() {
        return DIAG_ENABLED.load(Ordering::Relaxed);
    }

    let env_enabled = std::env::var(DIAG_ENV)
        .map(|v| is_truthy(&v))
        .unwrap_or(false);
    if env_enabled {
        DIAG_ENABLED.store(true, Ordering::Relaxed);
    }
    let _ = DIAG_ENABLED_INIT.set(());
    env_enabled
}

fn is_truthy(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

fn diagnostics_path() -> Option<PathBuf> {
    static PATH: OnceLock<Option<PathBuf>> = OnceLock::new();
    PATH.get_or_init(|| log_dir().map(|dir| dir.join("diagnostics.log")))
        .clone()
}

pub fn log_dir() -> Option<PathBuf> {
    static DIR: OnceLock<Option<PathBuf>> = OnceLock::new();
    DIR.get_or_init(|| paths::data_dir().ok().map(|dir| dir.join("logs")))
        .clone()
}

/// Appends one timestamped line to the diagnostics log and echoes it through
/// the `log` facade at debug level. No-op unless diagnostics are enabled.
pub fn log(message: impl AsRef<str>) {
    if !enabled() {
        return;
    }

    let timestamp = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "unknown-time".to_string());
    let line = format_line(&timestamp, message.as_ref());

    if let Some(path) = diagnostics_path() {
        if let Some(parent) = path.parent() {
            let _ = create_dir_all(parent);
        }
        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(&path) {
            let _ = file.write_all(line.as_bytes());
        }
    }

    log::debug!(target: "tabdeck::diag", "{}", message.as_ref());
}

fn format_line(timestamp: &str, message: &str) -> String {
    format!("[{}] {}\n", timestamp, message)
}
