use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::store::keys;
use crate::tabs::{Tab, TabControl, TabFilter};
use crate::workspace::{SavedTab, WorkspaceManager, is_workspace_tab, merge_live};

/// Converges a workspace's saved-tab list with the live tab strip.
///
/// Reconciliation is idempotent: running it twice against an unchanged
/// strip produces the same list and the second run performs no write.
pub struct Reconciler {
    manager: Arc<WorkspaceManager>,
    tabs: Arc<dyn TabControl>,
}

impl Reconciler {
    pub fn new(manager: Arc<WorkspaceManager>, tabs: Arc<dyn TabControl>) -> Self {
        Self { manager, tabs }
    }

    /// Reconcile one workspace against the live strip. Returns whether an
    /// updated list was written.
    ///
    /// Skips silently while a workspace switch is in flight, and when the
    /// live strip cannot be queried: an unreadable strip must never be
    /// mistaken for an empty one.
    pub async fn reconcile(&self, workspace_id: &str) -> Result<bool> {
        if self.manager.is_switching().await? {
            debug!(workspace_id, "switch in flight, skipping reconcile");
            return Ok(false);
        }

        let live = match self.tabs.query(TabFilter::default()).await {
            Ok(tabs) => tabs,
            Err(err) => {
                debug!(workspace_id, error = %err, "tab query failed, skipping reconcile");
                return Ok(false);
            }
        };
        let live: Vec<Tab> = live
            .into_iter()
            .filter(|t| is_workspace_tab(t, self.manager.anchor_url()))
            .collect();

        let store = self.manager.store();
        let _guard = store.lock(keys::SAVED_TABS).await;
        let mut all: HashMap<String, Vec<SavedTab>> =
            store.get_or_default(keys::SAVED_TABS).await?;
        let existing = all.get(workspace_id).cloned().unwrap_or_default();
        let merged = merge_live(&existing, &live);
        if merged == existing {
            return Ok(false);
        }

        info!(
            workspace_id,
            before = existing.len(),
            after = merged.len(),
            "reconciled saved tabs"
        );
        all.insert(workspace_id.to_string(), merged);
        store.set(keys::SAVED_TABS, &all).await?;
        Ok(true)
    }

    /// Reconcile the active workspace, swallowing errors. Debounced tab
    /// events land here; a failed pass is retried by the next event.
    pub async fn reconcile_active(&self) {
        let workspace_id = match self.manager.active_workspace_id().await {
            Ok(id) => id,
            Err(err) => {
                warn!(error = %err, "could not resolve active workspace");
                return;
            }
        };
        if let Err(err) = self.reconcile(&workspace_id).await {
            warn!(workspace_id = %workspace_id, error = %err, "reconcile failed");
        }
    }
}
