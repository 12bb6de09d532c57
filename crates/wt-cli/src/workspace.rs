//! Resolving ledger locations and opening the configured store.

use std::path::Path;
use std::rc::Rc;

use anyhow::{Context, Result};
use wt_core::{LedgerStore, StorageIdentity};
use wt_db::{JsonFileStore, SqliteStore};

use crate::cli::LedgerArgs;
use crate::config::{Backend, Config};

/// Resolves the ledger identity from `--file`, `--workspace`, or the
/// current directory, in that order.
pub fn resolve_identity(config: &Config, args: &LedgerArgs) -> Result<StorageIdentity> {
    let path = match (&args.file, &args.workspace) {
        (Some(file), _) => file.clone(),
        (None, Some(dir)) => dir.join(&config.data_file_name),
        (None, None) => std::env::current_dir()
            .context("failed to determine current directory")?
            .join(&config.data_file_name),
    };
    identity_for(&path)
}

/// Turns a user-supplied path into an absolute storage identity.
pub fn identity_for(path: &Path) -> Result<StorageIdentity> {
    let absolute = std::path::absolute(path)
        .with_context(|| format!("failed to resolve {}", path.display()))?;
    StorageIdentity::new(absolute).context("invalid ledger location")
}

/// Opens the store for the configured backend.
pub fn open_store(config: &Config) -> Result<Rc<dyn LedgerStore>> {
    match config.backend {
        Backend::File => Ok(Rc::new(JsonFileStore::new())),
        Backend::Sqlite => {
            if let Some(parent) = config.database_path.parent() {
                std::fs::create_dir_all(parent).context("failed to create database directory")?;
            }
            let store = SqliteStore::open(&config.database_path).with_context(|| {
                format!("failed to open {}", config.database_path.display())
            })?;
            tracing::debug!(path = %config.database_path.display(), "opened sqlite store");
            Ok(Rc::new(store))
        }
    }
}

/// Whether the ledger already exists in the configured backend.
pub fn ledger_exists(
    config: &Config,
    store: &dyn LedgerStore,
    identity: &StorageIdentity,
) -> Result<bool> {
    match config.backend {
        Backend::File => Ok(identity.as_path().exists()),
        Backend::Sqlite => Ok(store
            .load(identity)
            .with_context(|| format!("failed to load ledger {identity}"))?
            .is_some()),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn file_overrides_workspace() {
        let config = Config::default();
        let args = LedgerArgs {
            workspace: Some(PathBuf::from("/ignored")),
            file: Some(PathBuf::from("/work/custom.json")),
        };
        let identity = resolve_identity(&config, &args).unwrap();
        assert_eq!(identity.as_path(), Path::new("/work/custom.json"));
    }

    #[test]
    fn workspace_joins_data_file_name() {
        let config = Config {
            data_file_name: "hours.json".to_string(),
            ..Config::default()
        };
        let args = LedgerArgs {
            workspace: Some(PathBuf::from("/work/project")),
            file: None,
        };
        let identity = resolve_identity(&config, &args).unwrap();
        assert_eq!(identity.as_path(), Path::new("/work/project/hours.json"));
    }

    #[test]
    fn relative_paths_become_absolute() {
        let identity = identity_for(Path::new("project/.timetracker")).unwrap();
        assert!(identity.as_path().is_absolute());
        assert!(identity.as_path().ends_with("project/.timetracker"));
    }

    #[test]
    fn sqlite_backend_creates_database_directory() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            backend: Backend::Sqlite,
            database_path: dir.path().join("nested/wt.db"),
            ..Config::default()
        };

        let store = open_store(&config).unwrap();
        let identity = identity_for(&dir.path().join(".timetracker")).unwrap();
        assert!(!ledger_exists(&config, store.as_ref(), &identity).unwrap());
        assert!(config.database_path.exists());
    }
}
