//! `tabs.query` filters and URL match patterns.

use regex::Regex;
use serde::{Deserialize, Serialize};
use tabdeck_registry::{TabRecord, TabStatus};

use crate::error::{ApiError, ApiResult};

/// Every present field must match for a tab to be returned.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueryInfo {
    pub active: Option<bool>,
    pub pinned: Option<bool>,
    pub highlighted: Option<bool>,
    pub status: Option<TabStatus>,
    pub title: Option<String>,
    pub index: Option<i64>,
    pub audible: Option<bool>,
    pub muted: Option<bool>,
    pub window_id: Option<i64>,
    pub visible: Option<bool>,
    /// Match pattern; needs the `tabs` permission.
    pub url: Option<String>,
}

impl QueryInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(mut self, active: bool) -> Self {
        self.active = Some(active);
        self
    }

    pub fn url(mut self, pattern: impl Into<String>) -> Self {
        self.url = Some(pattern.into());
        self
    }

    /// Field filters only; the URL pattern is checked separately.
    pub fn matches(&self, tab: &TabRecord) -> bool {
        same(self.active, tab.active)
            && same(self.pinned, tab.pinned)
            && same(self.highlighted, tab.highlighted)
            && same(self.status, tab.status)
            && self
                .title
                .as_ref()
                .is_none_or(|title| tab.title.as_ref() == Some(title))
            && self.index.is_none_or(|index| tab.index == Some(index))
            && same(self.audible, tab.audible)
            && same(self.muted, tab.muted_info.muted)
            && self
                .window_id
                .is_none_or(|window_id| tab.window_id == Some(window_id))
            && same(self.visible, tab.visible)
    }
}

fn same<T: PartialEq>(wanted: Option<T>, actual: T) -> bool {
    wanted.is_none_or(|wanted| wanted == actual)
}

const ALL_URL_SCHEMES: &str = "(?:https?|wss?|ftp|file|data)";

/// A WebExtension-style match pattern: `<all_urls>` or
/// `scheme://host/path`, where scheme `*` means http or https, host `*`
/// matches any host, `*.example.com` matches the domain and its subdomains,
/// and `*` in the path matches anything.
#[derive(Debug, Clone)]
pub struct MatchPattern {
    source: String,
    regex: Regex,
}

impl MatchPattern {
    pub fn parse(pattern: &str) -> ApiResult<Self> {
        let invalid = || ApiError::InvalidPattern(pattern.to_string());

        let expression = if pattern == "<all_urls>" {
            format!("^{}:.*$", ALL_URL_SCHEMES)
        } else {
            let (scheme, rest) = pattern.split_once("://").ok_or_else(invalid)?;
            let scheme = match scheme {
                "*" => "https?".to_string(),
                "http" | "https" | "ws" | "wss" | "ftp" | "file" => regex::escape(scheme),
                _ => return Err(invalid()),
            };

            let (host, path) = match rest.find('/') {
                Some(slash) => rest.split_at(slash),
                None => return Err(invalid()),
            };
            let host = if host == "*" {
                "[^/]*".to_string()
            } else if let Some(domain) = host.strip_prefix("*.") {
                if domain.is_empty() || domain.contains('*') {
                    return Err(invalid());
                }
                format!(r"(?:[^/]*\.)?{}(?::\d+)?", regex::escape(domain))
            } else if host.contains('*') {
                return Err(invalid());
            } else {
                format!(r"{}(?::\d+)?", regex::escape(host))
            };
            let path = regex::escape(path).replace(r"\*", ".*");

            format!("^{}://{}{}$", scheme, host, path)
        };

        let regex = Regex::new(&expression).map_err(|_| invalid())?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, url: &str) -> bool {
        self.regex.is_match(url)
    }
}
