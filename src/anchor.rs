use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::AnchorConfig;
use crate::error::Result;
use crate::retry::RetryPolicy;
use crate::tabs::{Tab, TabControl, TabFilter, TabId, TabUpdate};

/// Keeps the application's own UI tab pinned at index 0 of the tab strip,
/// regardless of other tab churn.
pub struct AnchorEnforcer {
    tabs: Arc<dyn TabControl>,
    anchor_url: String,
    policy: RetryPolicy,
    hot_policy: RetryPolicy,
}

impl AnchorEnforcer {
    pub fn new(tabs: Arc<dyn TabControl>, config: &AnchorConfig) -> Self {
        Self {
            tabs,
            anchor_url: config.url.clone(),
            policy: config.policy(),
            hot_policy: config.hot_policy(),
        }
    }

    pub fn anchor_url(&self) -> &str {
        &self.anchor_url
    }

    /// Locate the anchor tab by URL. The tab id is never remembered across
    /// calls; the browser may have recreated the tab under a new id.
    pub async fn find_anchor(&self) -> Result<Option<Tab>> {
        let tabs = self.tabs.query(TabFilter::default()).await?;
        Ok(tabs.into_iter().find(|t| t.url == self.anchor_url))
    }

    /// Enforce with the default retry budget. Used from move events, where
    /// a user drag may keep the strip busy for a while.
    pub async fn enforce(&self, id: TabId) -> bool {
        self.enforce_with(id, self.policy).await
    }

    /// Enforce with the short budget, for the tab create/update hot path.
    pub async fn enforce_hot(&self, id: TabId) -> bool {
        self.enforce_with(id, self.hot_policy).await
    }

    /// Pin the tab and move it to index 0, retrying until the re-read
    /// confirms both. Idempotent end state; safe to call redundantly and
    /// concurrently for the same tab id.
    async fn enforce_with(&self, id: TabId, policy: RetryPolicy) -> bool {
        let tabs = Arc::clone(&self.tabs);
        let settled = policy
            .run("anchor enforcement", move || {
                let tabs = Arc::clone(&tabs);
                async move {
                    let tab = tabs.get(id).await?;
                    if !tab.pinned {
                        tabs.update(id, TabUpdate { pinned: Some(true), ..Default::default() })
                            .await?;
                    }
                    if tab.index != 0 {
                        tabs.move_to(id, 0).await?;
                    }
                    let tab = tabs.get(id).await?;
                    Ok((tab.pinned && tab.index == 0).then_some(()))
                }
            })
            .await;

        match settled {
            Some(()) => {
                debug!(tab_id = id, "anchor tab pinned at index 0");
                true
            }
            None => {
                warn!(tab_id = id, "anchor tab not settled after retry budget");
                false
            }
        }
    }
}
