//! Workspace-tab reconciliation engine.
//!
//! Keeps per-workspace saved-tab lists converged with a live browser tab
//! strip: tab events are debounced and coalesced, an anchor tab is held
//! pinned at index 0, and workspace switches swap the whole strip behind a
//! persisted guard that silences reconciliation while tabs churn.

pub mod agent;
pub mod anchor;
pub mod cli;
pub mod config;
pub mod debounce;
pub mod error;
pub mod retry;
pub mod store;
pub mod tabs;
pub mod workspace;

pub use agent::WorkspaceAgent;
pub use anchor::AnchorEnforcer;
pub use config::Config;
pub use error::{Error, Result};
pub use workspace::reconcile::Reconciler;
pub use workspace::switch::SwitchCoordinator;
pub use workspace::{SavedTab, UNSAVED_WORKSPACE_ID, Workspace, WorkspaceManager};
