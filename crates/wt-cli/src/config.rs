//! Configuration loading and management.

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

/// Where ledgers are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// One JSON ledger file inside each workspace.
    #[default]
    File,
    /// All ledgers in one SQLite database, keyed by ledger path.
    Sqlite,
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Seconds without activity before tracking pauses. `0` disables auto-pause.
    pub idle_threshold_secs: u32,
    /// Name of the per-workspace ledger file.
    pub data_file_name: String,
    pub backend: Backend,
    /// Path to the database file, used by the sqlite backend.
    pub database_path: PathBuf,
    /// Whether `track` may create a ledger that does not exist yet.
    pub auto_create_file: bool,
    /// Whether `track` starts tracking right away or waits for `start`.
    pub auto_start: bool,
    /// Render the status line in compact form.
    pub compact_status: bool,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            idle_threshold_secs: 120,
            data_file_name: ".timetracker".to_string(),
            backend: Backend::File,
            database_path: data_dir.join("wt.db"),
            auto_create_file: true,
            auto_start: true,
            compact_status: false,
        }
    }
}

impl Config {
    /// Loads configuration from default locations.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load() -> Result<Self, figment::Error> {
        Self::load_from(None)
    }

    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (WT_*)
        figment = figment.merge(Env::prefixed("WT_"));

        figment.extract()
    }
}

/// Returns the platform-specific config directory for wt.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("wt"))
}

/// Returns the platform-specific data directory for wt.
///
/// On Linux: `~/.local/share/wt`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("wt"))
}
