//! The tab control surface: the live browser window's tabs, and the
//! asynchronous notification stream the reconciliation engine consumes.
//!
//! Everything here is scoped to the current window; multi-window
//! reconciliation is out of scope.

#[cfg(test)]
pub mod fake;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::Result;

pub type TabId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TabStatus {
    Loading,
    Complete,
}

/// A live browser tab.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tab {
    pub id: TabId,
    pub url: String,
    pub title: String,
    pub favicon: Option<String>,
    /// Position in the window's tab strip.
    pub index: u32,
    pub pinned: bool,
    pub active: bool,
    pub status: TabStatus,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TabFilter {
    pub pinned: Option<bool>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TabUpdate {
    pub active: Option<bool>,
    pub pinned: Option<bool>,
}

/// The fields an update notification reports as changed.
#[derive(Debug, Clone, Default)]
pub struct TabChange {
    pub status: Option<TabStatus>,
    pub url: Option<String>,
}

/// Asynchronous tab notifications. Delivery order carries no guarantee
/// beyond "eventually all fire"; the engine re-derives state from fresh
/// queries rather than applying deltas.
#[derive(Debug, Clone)]
pub enum TabEvent {
    Created(Tab),
    Updated {
        id: TabId,
        change: TabChange,
        tab: Tab,
    },
    Removed {
        id: TabId,
    },
    Moved {
        id: TabId,
        to_index: u32,
    },
    Activated {
        id: TabId,
    },
}

/// Query/create/update/move/remove operations on live browser tabs.
/// Implemented by the browser bridge in production and by
/// `fake::FakeTabControl` in tests.
#[async_trait]
pub trait TabControl: Send + Sync {
    async fn query(&self, filter: TabFilter) -> Result<Vec<Tab>>;
    async fn get(&self, id: TabId) -> Result<Tab>;
    async fn create(&self, url: &str, active: bool) -> Result<Tab>;
    async fn remove(&self, ids: &[TabId]) -> Result<()>;
    async fn update(&self, id: TabId, update: TabUpdate) -> Result<Tab>;
    async fn move_to(&self, id: TabId, index: u32) -> Result<Tab>;
}

/// Browser-internal pages are invisible to reconciliation.
pub fn is_internal_url(url: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) => matches!(
            parsed.scheme(),
            "chrome" | "chrome-extension" | "about" | "devtools"
        ),
        Err(_) => false,
    }
}

/// Hostname without a leading `www.`, falling back to the raw input for
/// anything unparsable.
pub fn extract_domain(url: &str) -> String {
    let parsed = Url::parse(url).or_else(|_| Url::parse(&format!("https://{url}")));
    match parsed {
        Ok(parsed) => match parsed.host_str() {
            Some(host) => host.trim_start_matches("www.").to_string(),
            None => url.to_string(),
        },
        Err(_) => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_urls() {
        assert!(is_internal_url("chrome://settings"));
        assert!(is_internal_url("chrome-extension://abcdef/newtab.html"));
        assert!(is_internal_url("about:blank"));
        assert!(!is_internal_url("https://example.com/"));
        assert!(!is_internal_url("example.com"));
    }

    #[test]
    fn domain_extraction() {
        assert_eq!(extract_domain("https://www.example.com/path?q=1"), "example.com");
        assert_eq!(extract_domain("https://docs.rs/tokio"), "docs.rs");
        assert_eq!(extract_domain("example.com/path"), "example.com");
        // Unparsable input falls back to the raw string.
        assert_eq!(extract_domain("not a url"), "not a url");
    }
}
