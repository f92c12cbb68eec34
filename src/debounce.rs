use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::trace;

use crate::tabs::TabId;

/// Coalescing key for debounced actions.
///
/// Per-tab keys keep unrelated tabs from blocking each other; all removals
/// share one key so a burst of closed tabs triggers a single pass.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DebounceKey {
    Tab(TabId),
    Removals,
}

/// Collapses bursts of same-key events into one deferred action.
///
/// `schedule` cancels any pending action under the same key and arms a new
/// one; when the delay elapses with no further call under that key, the
/// action runs exactly once. Re-arming supersedes, never stacks.
#[derive(Default)]
pub struct Debouncer {
    pending: Mutex<HashMap<DebounceKey, JoinHandle<()>>>,
}

impl Debouncer {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn schedule<F>(&self, key: DebounceKey, delay: Duration, action: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            action.await;
        });

        let mut pending = self.pending.lock().await;
        if let Some(previous) = pending.insert(key.clone(), handle) {
            trace!(?key, "superseding pending debounced action");
            previous.abort();
        }
    }

    /// Cancel every pending action. Part of the agent shutdown/reset
    /// lifecycle so tests can construct fresh instances.
    pub async fn cancel_all(&self) {
        let mut pending = self.pending.lock().await;
        for (_, handle) in pending.drain() {
            handle.abort();
        }
    }

    /// Number of armed (not yet run) actions.
    pub async fn pending_count(&self) -> usize {
        let pending = self.pending.lock().await;
        pending.values().filter(|h| !h.is_finished()).count()
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        // No await in drop; abort whatever is still armed.
        if let Ok(mut pending) = self.pending.try_lock() {
            for (_, handle) in pending.drain() {
                handle.abort();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn counter_action(counter: &Arc<AtomicU32>) -> impl Future<Output = ()> + Send + 'static {
        let counter = Arc::clone(counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn burst_under_one_key_runs_once() {
        let debouncer = Debouncer::new();
        let runs = Arc::new(AtomicU32::new(0));

        for _ in 0..10 {
            debouncer
                .schedule(DebounceKey::Removals, Duration::from_millis(20), counter_action(&runs))
                .await;
        }

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn distinct_keys_do_not_block_each_other() {
        let debouncer = Debouncer::new();
        let runs = Arc::new(AtomicU32::new(0));

        debouncer
            .schedule(DebounceKey::Tab(1), Duration::from_millis(20), counter_action(&runs))
            .await;
        debouncer
            .schedule(DebounceKey::Tab(2), Duration::from_millis(20), counter_action(&runs))
            .await;
        debouncer
            .schedule(DebounceKey::Removals, Duration::from_millis(20), counter_action(&runs))
            .await;

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn rearming_resets_the_quiet_period() {
        let debouncer = Debouncer::new();
        let runs = Arc::new(AtomicU32::new(0));

        debouncer
            .schedule(DebounceKey::Tab(7), Duration::from_millis(40), counter_action(&runs))
            .await;
        tokio::time::sleep(Duration::from_millis(25)).await;
        // Re-arm before the first delay elapses; the first action never runs.
        debouncer
            .schedule(DebounceKey::Tab(7), Duration::from_millis(40), counter_action(&runs))
            .await;
        tokio::time::sleep(Duration::from_millis(25)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cancel_all_drops_pending_actions() {
        let debouncer = Debouncer::new();
        let runs = Arc::new(AtomicU32::new(0));

        debouncer
            .schedule(DebounceKey::Tab(1), Duration::from_millis(20), counter_action(&runs))
            .await;
        debouncer
            .schedule(DebounceKey::Removals, Duration::from_millis(20), counter_action(&runs))
            .await;
        assert_eq!(debouncer.pending_count().await, 2);

        debouncer.cancel_all().await;
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);
        assert_eq!(debouncer.pending_count().await, 0);
    }
}
