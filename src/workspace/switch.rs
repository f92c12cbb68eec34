use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::SwitchConfig;
use crate::error::Result;
use crate::tabs::{Tab, TabControl, TabFilter, TabUpdate};
use crate::workspace::reconcile::Reconciler;
use crate::workspace::{WorkspaceManager, is_workspace_tab};

/// Drives workspace switches: snapshot the outgoing workspace's strip,
/// swap the live tabs for the incoming workspace's saved list, then settle.
///
/// The coordinator is a two-state machine (idle or switching) with the
/// switching state mirrored into the store as a persisted guard so that the
/// reconciler and event handlers stand down while tabs churn.
pub struct SwitchCoordinator {
    manager: Arc<WorkspaceManager>,
    tabs: Arc<dyn TabControl>,
    reconciler: Arc<Reconciler>,
    config: SwitchConfig,
    in_flight: Mutex<()>,
}

impl SwitchCoordinator {
    pub fn new(
        manager: Arc<WorkspaceManager>,
        tabs: Arc<dyn TabControl>,
        reconciler: Arc<Reconciler>,
        config: SwitchConfig,
    ) -> Self {
        Self {
            manager,
            tabs,
            reconciler,
            config,
            in_flight: Mutex::new(()),
        }
    }

    /// Clear a guard left behind by a crash mid-switch. Called at startup,
    /// before any reconcile can run.
    pub async fn recover(&self) -> Result<()> {
        if self.manager.is_switching().await? {
            warn!("stale switch guard found at startup, clearing");
            self.manager.set_switching(false).await?;
        }
        Ok(())
    }

    /// Switch to `target_id`. Returns false when the switch was a no-op
    /// (already active, or another switch is in flight); unknown targets
    /// are an error.
    pub async fn switch(&self, target_id: &str) -> Result<bool> {
        let Ok(_in_flight) = self.in_flight.try_lock() else {
            debug!(workspace_id = %target_id, "switch already in flight, ignoring");
            return Ok(false);
        };

        let previous_id = self.manager.active_workspace_id().await?;
        if previous_id == target_id {
            debug!(workspace_id = %target_id, "already active, nothing to switch");
            return Ok(false);
        }
        let target = self.manager.get_workspace(target_id).await?;

        info!(from = %previous_id, to = %target.id, name = %target.name, "switching workspace");
        let started = Instant::now();
        self.manager.set_switching(true).await?;

        if let Err(err) = self.run(&previous_id, target_id).await {
            // Fail open: a stuck guard would freeze reconciliation forever,
            // which is worse than one odd reconcile pass.
            if let Err(clear_err) = self.manager.set_switching(false).await {
                warn!(error = %clear_err, "could not clear switch guard after failure");
            }
            return Err(err);
        }

        // Hold the guard for the minimum duration so tab events fired by
        // the swap itself are still suppressed when they arrive.
        let elapsed = started.elapsed();
        if let Some(remaining) = self.config.min_duration().checked_sub(elapsed) {
            tokio::time::sleep(remaining).await;
        }
        self.manager.set_switching(false).await?;

        if let Err(err) = self.reconciler.reconcile(target_id).await {
            warn!(workspace_id = %target_id, error = %err, "post-switch reconcile failed");
        }

        // Let straggler events drain against the cleared guard before the
        // next switch can start.
        tokio::time::sleep(self.config.settle()).await;
        info!(workspace_id = %target_id, elapsed_ms = started.elapsed().as_millis() as u64, "switch complete");
        Ok(true)
    }

    async fn run(&self, previous_id: &str, target_id: &str) -> Result<()> {
        let anchor_url = self.manager.anchor_url();

        // Snapshot the outgoing strip first. An empty snapshot still counts:
        // the user closed everything, and the saved list must reflect that.
        let live = self.tabs.query(TabFilter::default()).await?;
        let outgoing: Vec<Tab> = live
            .iter()
            .filter(|t| is_workspace_tab(t, anchor_url))
            .cloned()
            .collect();
        self.manager.snapshot_tabs(previous_id, &outgoing).await?;

        self.manager.set_active_workspace_id(target_id).await?;

        let close: Vec<_> = outgoing.iter().map(|t| t.id).collect();
        if !close.is_empty() {
            self.tabs.remove(&close).await?;
        }

        let saved = self.manager.get_saved_tabs(target_id).await?;
        for tab in &saved {
            self.tabs.create(&tab.url, false).await?;
        }

        // Focus the first workspace tab, unless the anchor already has
        // focus (the strip may have been empty before the swap).
        let strip = self.tabs.query(TabFilter::default()).await?;
        let anchor_focused = strip
            .iter()
            .any(|t| t.active && t.url == anchor_url);
        if !anchor_focused {
            let wanted: HashSet<&str> = saved.iter().map(|t| t.url.as_str()).collect();
            let first = strip
                .iter()
                .find(|t| is_workspace_tab(t, anchor_url) && wanted.contains(t.url.as_str()));
            if let Some(tab) = first {
                self.tabs
                    .update(tab.id, TabUpdate { active: Some(true), pinned: None })
                    .await?;
            }
        }
        Ok(())
    }
}
