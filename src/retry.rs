use std::future::Future;
use std::time::Duration;

use tracing::{trace, warn};

use crate::error::Result;

/// A bounded attempt loop with fixed inter-attempt spacing.
///
/// Each attempt returns `Ok(Some(v))` when the desired end state is reached,
/// `Ok(None)` when it is not there yet, or an error. Transient errors
/// (`Error::is_transient`) are swallowed and retried quietly; other errors
/// are logged and the loop continues until the budget is exhausted.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub const fn new(max_attempts: u32, delay: Duration) -> Self {
        Self { max_attempts, delay }
    }

    /// Run `attempt` up to `max_attempts` times. Returns the success value,
    /// or `None` if the budget was exhausted without reaching it.
    pub async fn run<T, F, Fut>(&self, what: &'static str, mut attempt: F) -> Option<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Option<T>>>,
    {
        for n in 1..=self.max_attempts {
            match attempt().await {
                Ok(Some(value)) => return Some(value),
                Ok(None) => {
                    trace!(what, attempt = n, "end state not reached yet");
                }
                Err(e) if e.is_transient() => {
                    trace!(what, attempt = n, error = %e, "transient error, retrying");
                }
                Err(e) => {
                    warn!(what, attempt = n, error = %e, "attempt failed");
                }
            }
            if n < self.max_attempts {
                tokio::time::sleep(self.delay).await;
            }
        }
        None
    }
}
