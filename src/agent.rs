//! The background agent: consumes tab notifications and turns them into
//! debounced reconciliation passes and anchor enforcement.

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info, warn};

use crate::anchor::AnchorEnforcer;
use crate::config::DebounceConfig;
use crate::debounce::{DebounceKey, Debouncer};
use crate::tabs::{Tab, TabEvent, TabStatus, is_internal_url};
use crate::workspace::WorkspaceManager;
use crate::workspace::reconcile::Reconciler;

pub struct WorkspaceAgent {
    manager: Arc<WorkspaceManager>,
    reconciler: Arc<Reconciler>,
    anchor: Arc<AnchorEnforcer>,
    debouncer: Debouncer,
    config: DebounceConfig,
}

impl WorkspaceAgent {
    pub fn new(
        manager: Arc<WorkspaceManager>,
        reconciler: Arc<Reconciler>,
        anchor: Arc<AnchorEnforcer>,
        config: DebounceConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            manager,
            reconciler,
            anchor,
            debouncer: Debouncer::new(),
            config,
        })
    }

    /// Consume tab notifications until the channel closes.
    pub async fn run(self: Arc<Self>, mut events: UnboundedReceiver<TabEvent>) {
        info!("agent event loop started");
        while let Some(event) = events.recv().await {
            self.handle_event(event).await;
        }
        info!("event channel closed, agent event loop exiting");
    }

    /// Cancel every pending debounced pass.
    pub async fn shutdown(&self) {
        self.debouncer.cancel_all().await;
    }

    async fn handle_event(&self, event: TabEvent) {
        // While a switch churns the strip, its events are not user actions.
        if self.switch_in_flight().await {
            debug!(?event, "switch in flight, dropping event");
            return;
        }

        match event {
            TabEvent::Created(tab) => self.on_tab_changed(&tab).await,
            TabEvent::Updated { change, tab, .. } => {
                // Only a finished load or a URL change can alter the saved
                // list; title/favicon churn rides along on the next pass.
                if change.url.is_some() || change.status == Some(TabStatus::Complete) {
                    self.on_tab_changed(&tab).await;
                }
            }
            TabEvent::Removed { id } => {
                debug!(tab_id = id, "tab removed, scheduling coalesced pass");
                let reconciler = self.reconciler.clone();
                self.debouncer
                    .schedule(DebounceKey::Removals, self.config.removal_delay(), async move {
                        reconciler.reconcile_active().await;
                    })
                    .await;
            }
            TabEvent::Moved { .. } => self.on_tab_moved().await,
            // Focus changes do not alter any saved list.
            TabEvent::Activated { .. } => {}
        }
    }

    async fn on_tab_changed(&self, tab: &Tab) {
        if tab.url == self.anchor.anchor_url() {
            // The short budget: this runs on every anchor update event.
            self.anchor.enforce_hot(tab.id).await;
            return;
        }
        if tab.pinned
            || tab.url.is_empty()
            || is_internal_url(&tab.url)
            || tab.status == TabStatus::Loading
        {
            return;
        }

        // Per-tab key: a redirect chain on one tab collapses to one pass,
        // while unrelated tabs keep their own timers.
        let reconciler = self.reconciler.clone();
        self.debouncer
            .schedule(DebounceKey::Tab(tab.id), self.config.tab_delay(), async move {
                reconciler.reconcile_active().await;
            })
            .await;
    }

    async fn on_tab_moved(&self) {
        match self.anchor.find_anchor().await {
            Ok(Some(anchor)) if anchor.index != 0 || !anchor.pinned => {
                if !self.anchor.enforce(anchor.id).await {
                    warn!(tab_id = anchor.id, "anchor tab could not be restored to index 0");
                }
            }
            Ok(_) => {}
            Err(err) => debug!(error = %err, "anchor lookup failed after move"),
        }
    }

    /// Store read errors count as "not switching": a transient read failure
    /// must not silence tab events forever.
    async fn switch_in_flight(&self) -> bool {
        match self.manager.is_switching().await {
            Ok(switching) => switching,
            Err(err) => {
                warn!(error = %err, "could not read switch guard");
                false
            }
        }
    }
}
