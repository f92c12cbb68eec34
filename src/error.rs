use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Error taxonomy for the reconciliation engine.
///
/// Background passes (reconciliation, anchor enforcement) log and swallow
/// these; user-initiated operations propagate them to the caller.
/// `Protected` is always surfaced.
#[derive(Debug, Error)]
pub enum Error {
    #[error("storage error: {0}")]
    Store(String),

    #[error("tab operation failed: {message}")]
    TabOp {
        message: String,
        /// Transient failures (e.g. the tab strip is mid-drag) are swallowed
        /// and retried by `RetryPolicy`; everything else is logged as a real
        /// failure before the next attempt.
        transient: bool,
    },

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("protected entity: {0}")]
    Protected(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store(message.into())
    }

    pub fn tab(message: impl Into<String>) -> Self {
        Self::TabOp { message: message.into(), transient: false }
    }

    /// A tab operation failure expected to clear on its own, such as the
    /// browser rejecting edits while the user is dragging a tab.
    pub fn tab_transient(message: impl Into<String>) -> Self {
        Self::TabOp { message: message.into(), transient: true }
    }

    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound { kind, id: id.into() }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TabOp { transient: true, .. })
    }
}
