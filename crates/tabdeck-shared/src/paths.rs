use std::io;
use std::path::PathBuf;

/// Overrides the data directory, mainly for tests.
pub const HOME_ENV: &str = "TABDECK_HOME";

/// Get the tabdeck data directory.
/// Checks TABDECK_HOME first, then defaults to ~/.tabdeck
pub fn data_dir() -> io::Result<PathBuf> {
    if let Ok(custom_dir) = std::env::var(HOME_ENV) {
        if !custom_dir.trim().is_empty() {
            return Ok(PathBuf::from(custom_dir));
        }
    }
    let home = dirs::home_dir()
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "Home directory not found"))?;
    Ok(home.join(".tabdeck"))
}

/// Directory holding per-profile state (`profiles/<profile>`).
pub fn profile_dir(root: &std::path::Path, profile: &str) -> PathBuf {
    root.join("profiles").join(sanitize_profile_name(profile))
}

/// Keeps profile names usable as a single path component.
pub fn sanitize_profile_name(name: &str) -> String {
    let sanitized: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect();

    if sanitized.is_empty() {
        "default".to_string()
    } else {
        sanitized.to_lowercase()
    }
}
