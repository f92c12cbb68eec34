use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::retry::RetryPolicy;

/// Top-level configuration for the tabspaces agent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub anchor: AnchorConfig,
    pub debounce: DebounceConfig,
    pub switch: SwitchConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("parsing config: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            !self.anchor.url.trim().is_empty(),
            "anchor.url must not be empty"
        );
        anyhow::ensure!(
            url::Url::parse(&self.anchor.url).is_ok(),
            "anchor.url is not a valid URL: {}",
            self.anchor.url
        );
        anyhow::ensure!(
            self.anchor.max_attempts >= 1,
            "anchor.max_attempts must be >= 1"
        );
        anyhow::ensure!(
            self.anchor.hot_max_attempts >= 1,
            "anchor.hot_max_attempts must be >= 1"
        );
        anyhow::ensure!(
            self.debounce.tab_delay_ms >= 1,
            "debounce.tab_delay_ms must be >= 1"
        );
        anyhow::ensure!(
            self.debounce.removal_delay_ms >= 1,
            "debounce.removal_delay_ms must be >= 1"
        );
        Ok(())
    }
}

/// Persistent store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// File the JSON state document is persisted to.
    pub state_file: PathBuf,
    /// Legacy state file folded into `state_file` once, on first load.
    /// Set to `None` once there is nothing left to migrate.
    pub legacy_state_file: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            state_file: PathBuf::from("/var/lib/tabspaces/state.json"),
            legacy_state_file: None,
        }
    }
}

/// Anchor tab enforcement configuration.
///
/// The anchor tab is the application's own UI tab; it is kept pinned at
/// index 0 of the tab strip regardless of other tab churn.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnchorConfig {
    /// URL of the application's own UI tab.
    pub url: String,
    /// Retry budget for enforcement triggered by move events.
    pub max_attempts: u32,
    pub retry_delay_ms: u64,
    /// Shorter budget used on the tab create/update hot path.
    pub hot_max_attempts: u32,
    pub hot_retry_delay_ms: u64,
}

impl Default for AnchorConfig {
    fn default() -> Self {
        Self {
            url: "ext://tabspaces/newtab".into(),
            max_attempts: 10,
            retry_delay_ms: 200,
            hot_max_attempts: 3,
            hot_retry_delay_ms: 50,
        }
    }
}

impl AnchorConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_millis(self.retry_delay_ms))
    }

    pub fn hot_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.hot_max_attempts,
            Duration::from_millis(self.hot_retry_delay_ms),
        )
    }
}

/// Event debouncing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DebounceConfig {
    /// Quiet period after a tab create/update before reconciling. Long
    /// enough to absorb redirect chains, short enough to feel live.
    pub tab_delay_ms: u64,
    /// Quiet period for the shared removal key, so closing N tabs in a
    /// burst triggers one reconciliation pass.
    pub removal_delay_ms: u64,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            tab_delay_ms: 500,
            removal_delay_ms: 500,
        }
    }
}

impl DebounceConfig {
    pub fn tab_delay(&self) -> Duration {
        Duration::from_millis(self.tab_delay_ms)
    }

    pub fn removal_delay(&self) -> Duration {
        Duration::from_millis(self.removal_delay_ms)
    }
}

/// Workspace switch transaction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SwitchConfig {
    /// Minimum wall-clock duration of a switch, start to guard release.
    /// Gives the UI spinner a perceivable, non-flickering lifetime.
    pub min_duration_ms: u64,
    /// Extra window the re-entrancy lock is held after the guard clears,
    /// so a double-click cannot start a second switch immediately.
    pub settle_ms: u64,
}

impl Default for SwitchConfig {
    fn default() -> Self {
        Self {
            min_duration_ms: 300,
            settle_ms: 100,
        }
    }
}

impl SwitchConfig {
    pub fn min_duration(&self) -> Duration {
        Duration::from_millis(self.min_duration_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn rejects_empty_anchor_url() {
        let mut config = Config::default();
        config.anchor.url = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_unparsable_anchor_url() {
        let mut config = Config::default();
        config.anchor.url = "not a url".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_retry_budget() {
        let mut config = Config::default();
        config.anchor.max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn loads_partial_toml_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[debounce]\ntab_delay_ms = 250\n\n[switch]\nmin_duration_ms = 150\n",
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.debounce.tab_delay_ms, 250);
        assert_eq!(config.switch.min_duration_ms, 150);
        // Untouched sections keep their defaults
        assert_eq!(config.anchor.max_attempts, 10);
        assert_eq!(config.debounce.removal_delay_ms, 500);
    }
}
