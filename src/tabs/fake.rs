//! In-memory tab strip for tests. Mutations emit the same notifications a
//! real browser would, so agent-level tests can drive the full
//! event -> debounce -> reconcile path.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::error::{Error, Result};
use crate::tabs::{Tab, TabChange, TabControl, TabEvent, TabFilter, TabId, TabStatus, TabUpdate};

pub struct FakeTabControl {
    tabs: Mutex<Vec<Tab>>,
    next_id: AtomicU64,
    events: UnboundedSender<TabEvent>,
    /// Remaining `move_to` calls that fail with a transient mid-drag error.
    drag_failures: AtomicU32,
    /// Remaining `query` calls that fail (window closed mid-operation).
    query_failures: AtomicU32,
}

impl FakeTabControl {
    pub fn new() -> (std::sync::Arc<Self>, UnboundedReceiver<TabEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let control = std::sync::Arc::new(Self {
            tabs: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            events: tx,
            drag_failures: AtomicU32::new(0),
            query_failures: AtomicU32::new(0),
        });
        (control, rx)
    }

    fn emit(&self, event: TabEvent) {
        // The receiver may have been dropped by a test that does not care
        // about notifications.
        let _ = self.events.send(event);
    }

    fn reindex(tabs: &mut [Tab]) {
        for (i, tab) in tabs.iter_mut().enumerate() {
            tab.index = i as u32;
        }
    }

    fn insert(&self, mut tab: Tab, active: bool) -> Tab {
        let mut tabs = self.tabs.lock().unwrap();
        if active {
            for t in tabs.iter_mut() {
                t.active = false;
            }
            tab.active = true;
        }
        tabs.push(tab);
        Self::reindex(&mut tabs);
        tabs.last().unwrap().clone()
    }

    // --- user-simulation helpers -------------------------------------

    /// The user opens a tab (page loads immediately).
    pub fn open_tab(&self, url: &str) -> Tab {
        let tab = Tab {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            url: url.to_string(),
            title: format!("Title of {url}"),
            favicon: None,
            index: 0,
            pinned: false,
            active: false,
            status: TabStatus::Complete,
        };
        let tab = self.insert(tab, true);
        self.emit(TabEvent::Created(tab.clone()));
        tab
    }

    /// The user pins a tab by hand (it stays out of reconciliation).
    pub fn open_pinned_tab(&self, url: &str) -> Tab {
        let tab = Tab {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            url: url.to_string(),
            title: format!("Title of {url}"),
            favicon: None,
            index: 0,
            pinned: true,
            active: false,
            status: TabStatus::Complete,
        };
        let tab = self.insert(tab, false);
        self.emit(TabEvent::Created(tab.clone()));
        tab
    }

    /// Page navigation: the tab's URL changes and the load completes.
    /// Emits one `Updated` notification per call, so a redirect chain is a
    /// burst of these.
    pub fn navigate(&self, id: TabId, url: &str) {
        let tab = {
            let mut tabs = self.tabs.lock().unwrap();
            let tab = tabs.iter_mut().find(|t| t.id == id).expect("navigate: no such tab");
            tab.url = url.to_string();
            tab.title = format!("Title of {url}");
            tab.status = TabStatus::Complete;
            tab.clone()
        };
        self.emit(TabEvent::Updated {
            id,
            change: TabChange {
                status: Some(TabStatus::Complete),
                url: Some(url.to_string()),
            },
            tab,
        });
    }

    /// The user closes a tab.
    pub fn close_tab(&self, id: TabId) {
        {
            let mut tabs = self.tabs.lock().unwrap();
            tabs.retain(|t| t.id != id);
            Self::reindex(&mut tabs);
        }
        self.emit(TabEvent::Removed { id });
    }

    /// The user drags a tab to a new position.
    pub fn drag_tab(&self, id: TabId, to_index: u32) {
        self.reposition(id, to_index).expect("drag_tab: no such tab");
        self.emit(TabEvent::Moved { id, to_index });
    }

    pub fn fail_next_moves_with_drag(&self, n: u32) {
        self.drag_failures.store(n, Ordering::SeqCst);
    }

    pub fn fail_next_queries(&self, n: u32) {
        self.query_failures.store(n, Ordering::SeqCst);
    }

    /// URLs in strip order.
    pub fn urls(&self) -> Vec<String> {
        self.tabs.lock().unwrap().iter().map(|t| t.url.clone()).collect()
    }

    pub fn tab_by_url(&self, url: &str) -> Option<Tab> {
        self.tabs.lock().unwrap().iter().find(|t| t.url == url).cloned()
    }

    fn reposition(&self, id: TabId, to_index: u32) -> Result<Tab> {
        let mut tabs = self.tabs.lock().unwrap();
        let from = tabs
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| Error::not_found("tab", id.to_string()))?;
        let tab = tabs.remove(from);
        let to = (to_index as usize).min(tabs.len());
        tabs.insert(to, tab);
        Self::reindex(&mut tabs);
        Ok(tabs[to].clone())
    }
}

#[async_trait]
impl TabControl for FakeTabControl {
    async fn query(&self, filter: TabFilter) -> Result<Vec<Tab>> {
        if decrement(&self.query_failures) {
            return Err(Error::tab("the window was closed"));
        }
        let tabs = self.tabs.lock().unwrap();
        Ok(tabs
            .iter()
            .filter(|t| filter.pinned.is_none_or(|p| t.pinned == p))
            .cloned()
            .collect())
    }

    async fn get(&self, id: TabId) -> Result<Tab> {
        let tabs = self.tabs.lock().unwrap();
        tabs.iter()
            .find(|t| t.id == id)
            .cloned()
            .ok_or_else(|| Error::not_found("tab", id.to_string()))
    }

    async fn create(&self, url: &str, active: bool) -> Result<Tab> {
        let tab = Tab {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            url: url.to_string(),
            title: format!("Title of {url}"),
            favicon: None,
            index: 0,
            pinned: false,
            active: false,
            status: TabStatus::Complete,
        };
        let tab = self.insert(tab, active);
        self.emit(TabEvent::Created(tab.clone()));
        Ok(tab)
    }

    async fn remove(&self, ids: &[TabId]) -> Result<()> {
        for &id in ids {
            {
                let mut tabs = self.tabs.lock().unwrap();
                if !tabs.iter().any(|t| t.id == id) {
                    return Err(Error::tab(format!("tab {id} already closed")));
                }
                tabs.retain(|t| t.id != id);
                Self::reindex(&mut tabs);
            }
            self.emit(TabEvent::Removed { id });
        }
        Ok(())
    }

    async fn update(&self, id: TabId, update: TabUpdate) -> Result<Tab> {
        let tab = {
            let mut tabs = self.tabs.lock().unwrap();
            if update.active == Some(true) {
                for t in tabs.iter_mut() {
                    t.active = false;
                }
            }
            let tab = tabs
                .iter_mut()
                .find(|t| t.id == id)
                .ok_or_else(|| Error::not_found("tab", id.to_string()))?;
            if let Some(active) = update.active {
                tab.active = active;
            }
            if let Some(pinned) = update.pinned {
                tab.pinned = pinned;
            }
            tab.clone()
        };
        self.emit(TabEvent::Updated {
            id,
            change: TabChange::default(),
            tab: tab.clone(),
        });
        Ok(tab)
    }

    async fn move_to(&self, id: TabId, index: u32) -> Result<Tab> {
        if decrement(&self.drag_failures) {
            return Err(Error::tab_transient(
                "tabs cannot be edited right now (user may be dragging a tab)",
            ));
        }
        let tab = self.reposition(id, index)?;
        self.emit(TabEvent::Moved { id, to_index: index });
        Ok(tab)
    }
}

/// Decrement a failure-injection counter; true while failures remain.
fn decrement(counter: &AtomicU32) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mutations_emit_events() {
        let (tabs, mut events) = FakeTabControl::new();

        let tab = tabs.open_tab("https://a.com/");
        tabs.navigate(tab.id, "https://b.com/");
        tabs.close_tab(tab.id);

        assert!(matches!(events.recv().await, Some(TabEvent::Created(_))));
        match events.recv().await {
            Some(TabEvent::Updated { change, .. }) => {
                assert_eq!(change.url.as_deref(), Some("https://b.com/"));
            }
            other => panic!("expected Updated, got {other:?}"),
        }
        assert!(matches!(events.recv().await, Some(TabEvent::Removed { .. })));
    }

    #[tokio::test]
    async fn query_filters_pinned() {
        let (tabs, _events) = FakeTabControl::new();
        tabs.open_tab("https://a.com/");
        tabs.open_pinned_tab("ext://app/ui");

        let unpinned = tabs.query(TabFilter { pinned: Some(false) }).await.unwrap();
        assert_eq!(unpinned.len(), 1);
        assert_eq!(unpinned[0].url, "https://a.com/");

        let all = tabs.query(TabFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn injected_drag_failure_is_transient() {
        let (tabs, _events) = FakeTabControl::new();
        let tab = tabs.open_tab("https://a.com/");
        tabs.open_tab("https://b.com/");

        tabs.fail_next_moves_with_drag(1);
        let err = tabs.move_to(tab.id, 1).await.unwrap_err();
        assert!(err.is_transient());

        // Next call succeeds.
        let moved = tabs.move_to(tab.id, 1).await.unwrap();
        assert_eq!(moved.index, 1);
    }
}
