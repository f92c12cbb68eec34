//! CLI-only subcommand implementations: `status`, `tabs`, `release-guard`
//! and `check`.
//!
//! These commands do not start the agent. They open the state file directly
//! and are useful for inspecting or repairing persisted state.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;

use crate::config::Config;
use crate::store::Store;
use crate::store::file::FileStore;
use crate::workspace::{UNSAVED_WORKSPACE_ID, Workspace, WorkspaceManager};

/// Load a config from an optional path, falling back to defaults.
pub fn load_config(config_path: Option<PathBuf>) -> Result<Config> {
    match config_path {
        Some(path) => Config::load(&path),
        None => Ok(Config::default()),
    }
}

/// Open the persisted state file behind a [`WorkspaceManager`].
pub async fn open_manager(config: &Config) -> Result<Arc<WorkspaceManager>> {
    let backend = FileStore::open(
        config.storage.state_file.clone(),
        config.storage.legacy_state_file.as_deref(),
    )
    .await?;
    let store = Store::new(Arc::new(backend));
    Ok(Arc::new(WorkspaceManager::new(store, &config.anchor.url)))
}

// ---------------------------------------------------------------------------
// status
// ---------------------------------------------------------------------------

pub async fn run_status(config: &Config) -> Result<()> {
    let state_file = &config.storage.state_file;

    if !state_file.exists() {
        println!("No state file at {}", state_file.display());
        println!("Has the agent run yet? Try: tabspaces check --config config.toml");
        return Ok(());
    }

    let modified_ago = match std::fs::metadata(state_file) {
        Ok(meta) => match meta.modified() {
            Ok(mtime) => {
                let elapsed = mtime
                    .elapsed()
                    .unwrap_or(std::time::Duration::from_secs(0));
                format_duration(elapsed)
            }
            Err(_) => "unknown".to_string(),
        },
        Err(_) => "unknown".to_string(),
    };
    println!(
        "State file: {} (last modified: {})\n",
        state_file.display(),
        modified_ago
    );

    let manager = open_manager(config).await?;
    let workspaces = manager.list_workspaces().await?;
    let active = manager.active_workspace_id().await?;

    println!("Workspaces: {}", workspaces.len());
    for ws in &workspaces {
        let tabs = manager.get_saved_tabs(&ws.id).await?;
        let marker = if ws.id == active { "*" } else { " " };
        println!(
            "  {} {:<20}  {:<16}  {} tab{}",
            marker,
            ws.name,
            ws.id,
            tabs.len(),
            if tabs.len() == 1 { "" } else { "s" },
        );
    }

    if manager.is_switching().await? {
        println!("\nSwitch guard: SET (a switch is in flight, or a crash left it behind)");
        println!("If no switch is running: tabspaces release-guard");
    } else {
        println!("\nSwitch guard: clear");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// tabs
// ---------------------------------------------------------------------------

/// List the saved tabs of one workspace, addressed by id or by name.
pub async fn run_tabs(config: &Config, workspace: &str) -> Result<()> {
    let manager = open_manager(config).await?;
    let workspaces = manager.list_workspaces().await?;
    let found: Vec<&Workspace> = workspaces
        .iter()
        .filter(|w| w.id == workspace || w.name.eq_ignore_ascii_case(workspace))
        .collect();
    let ws = match found.as_slice() {
        [] => anyhow::bail!("no workspace matches '{workspace}'"),
        [ws] => *ws,
        many => anyhow::bail!(
            "'{workspace}' is ambiguous, matches: {}",
            many.iter().map(|w| w.id.as_str()).collect::<Vec<_>>().join(", ")
        ),
    };

    let tabs = manager.get_saved_tabs(&ws.id).await?;
    println!("{} ({}): {} tabs", ws.name, ws.id, tabs.len());
    for tab in &tabs {
        println!(
            "  {:<30}  {:<40}  saved {}",
            truncate(&tab.title, 30),
            truncate(&tab.url, 40),
            tab.saved_at.format("%Y-%m-%d %H:%M"),
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// release-guard
// ---------------------------------------------------------------------------

/// Clear a switching guard left behind by a crash mid-switch.
pub async fn run_release_guard(config: &Config) -> Result<()> {
    let manager = open_manager(config).await?;
    if manager.is_switching().await? {
        manager.set_switching(false).await?;
        println!("Switch guard cleared.");
    } else {
        println!("Switch guard already clear, nothing to do.");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// check
// ---------------------------------------------------------------------------

struct Check {
    label: &'static str,
    ok: bool,
    detail: String,
    fix: Option<String>,
}

impl Check {
    fn pass(label: &'static str, detail: impl Into<String>) -> Self {
        Self { label, ok: true, detail: detail.into(), fix: None }
    }

    fn fail(label: &'static str, detail: impl Into<String>, fix: impl Into<String>) -> Self {
        Self { label, ok: false, detail: detail.into(), fix: Some(fix.into()) }
    }
}

/// Run `tabspaces check`. Returns `Ok(())` if all checks pass.
pub async fn run_check(config: &Config) -> Result<()> {
    println!("Checking prerequisites...\n");

    let mut checks: Vec<Check> = Vec::new();
    checks.push(check_config(config));
    checks.push(check_state_dir(config));
    checks.push(check_state_file(config).await);
    checks.push(check_sentinel(config).await);

    let all_pass = checks.iter().all(|c| c.ok);
    for c in &checks {
        let icon = if c.ok { "\u{2713}" } else { "\u{2717}" };
        println!("  {} {} ({})", icon, c.label, c.detail);
        if !c.ok {
            if let Some(fix) = &c.fix {
                println!("    Fix: {}", fix);
            }
        }
    }

    println!();
    if all_pass {
        println!("All checks passed.");
        Ok(())
    } else {
        let failed = checks.iter().filter(|c| !c.ok).count();
        anyhow::bail!("{} check(s) failed", failed)
    }
}

fn check_config(config: &Config) -> Check {
    match config.validate() {
        Ok(()) => Check::pass("Config", format!("anchor URL {}", config.anchor.url)),
        Err(e) => Check::fail("Config", e.to_string(), "Fix the offending value in config.toml"),
    }
}

fn check_state_dir(config: &Config) -> Check {
    let Some(dir) = config.storage.state_file.parent() else {
        return Check::fail(
            "State directory",
            "state_file has no parent directory",
            "Use an absolute path for storage.state_file",
        );
    };
    if dir.is_dir() {
        Check::pass("State directory", dir.display().to_string())
    } else {
        Check::fail(
            "State directory",
            format!("{} does not exist", dir.display()),
            format!("mkdir -p {}", dir.display()),
        )
    }
}

async fn check_state_file(config: &Config) -> Check {
    if !config.storage.state_file.exists() {
        return Check::pass("State file", "not created yet (first run will create it)");
    }
    match open_manager(config).await {
        Ok(_) => Check::pass("State file", config.storage.state_file.display().to_string()),
        Err(e) => Check::fail(
            "State file",
            e.to_string(),
            "The state file is corrupt or from a newer version; move it aside to start fresh",
        ),
    }
}

async fn check_sentinel(config: &Config) -> Check {
    if !config.storage.state_file.exists() {
        return Check::pass("Unsaved workspace", "state not created yet");
    }
    let manager = match open_manager(config).await {
        Ok(m) => m,
        Err(_) => return Check::pass("Unsaved workspace", "skipped, state file unreadable"),
    };
    match manager.get_workspace(UNSAVED_WORKSPACE_ID).await {
        Ok(_) => Check::pass("Unsaved workspace", "present"),
        Err(_) => Check::fail(
            "Unsaved workspace",
            "missing from the workspace list",
            "Run the agent once; startup recreates it",
        ),
    }
}

// ---------------------------------------------------------------------------
// helpers
// ---------------------------------------------------------------------------

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}\u{2026}")
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        if secs == 1 {
            "1 second ago".to_string()
        } else {
            format!("{} seconds ago", secs)
        }
    } else if secs < 3600 {
        let mins = secs / 60;
        if mins == 1 {
            "1 minute ago".to_string()
        } else {
            format!("{} minutes ago", mins)
        }
    } else if secs < 86400 {
        let hours = secs / 3600;
        if hours == 1 {
            "1 hour ago".to_string()
        } else {
            format!("{} hours ago", hours)
        }
    } else {
        let days = secs / 86400;
        if days == 1 {
            "1 day ago".to_string()
        } else {
            format!("{} days ago", days)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_formatting() {
        use std::time::Duration;
        assert_eq!(format_duration(Duration::from_secs(1)), "1 second ago");
        assert_eq!(format_duration(Duration::from_secs(59)), "59 seconds ago");
        assert_eq!(format_duration(Duration::from_secs(120)), "2 minutes ago");
        assert_eq!(format_duration(Duration::from_secs(7200)), "2 hours ago");
        assert_eq!(format_duration(Duration::from_secs(172800)), "2 days ago");
    }

    #[test]
    fn truncation_is_char_safe() {
        assert_eq!(truncate("short", 30), "short");
        let long = "x".repeat(40);
        let cut = truncate(&long, 30);
        assert_eq!(cut.chars().count(), 30);
        assert!(cut.ends_with('\u{2026}'));
    }
}
