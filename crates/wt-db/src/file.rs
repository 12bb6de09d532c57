//! One JSON ledger file per workspace.

use std::fs::{self, File};
use std::hash::{DefaultHasher, Hash, Hasher};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use wt_core::{LedgerData, LedgerStore, StorageIdentity, StoreError};

/// Stores each ledger as a pretty-printed JSON file at its identity path.
///
/// Writes go to a temporary sibling that is renamed over the target, so a
/// crash mid-write never leaves a truncated ledger behind. Concurrent writers
/// are serialized by an exclusive lock on a per-ledger file in the system
/// temp directory, not in the workspace.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFileStore;

impl JsonFileStore {
    pub const fn new() -> Self {
        Self
    }
}

impl LedgerStore for JsonFileStore {
    fn load(&self, identity: &StorageIdentity) -> Result<Option<LedgerData>, StoreError> {
        let path = identity.as_path();
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StoreError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        // A freshly created, still empty file counts as no ledger.
        if content.trim().is_empty() {
            return Ok(None);
        }

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|source| StoreError::Malformed {
                path: path.to_path_buf(),
                source,
            })
    }

    fn save(&self, identity: &StorageIdentity, data: &LedgerData) -> Result<(), StoreError> {
        let path = identity.as_path();
        let write_err = |source: std::io::Error| StoreError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_err)?;
        }

        let lock_file = File::create(lock_path(path)).map_err(write_err)?;
        lock_file.lock_exclusive().map_err(write_err)?;

        let json = serde_json::to_string_pretty(data)
            .map_err(|e| StoreError::Backend(Box::new(e)))?;
        let tmp = sibling(path, "tmp");
        fs::write(&tmp, json).map_err(write_err)?;
        fs::rename(&tmp, path).map_err(write_err)?;

        tracing::debug!(path = %path.display(), sessions = data.sessions.len(), "ledger written");
        Ok(())
    }
}

/// Lock file for the ledger at `path`, outside the workspace.
fn lock_path(path: &Path) -> PathBuf {
    let mut hasher = DefaultHasher::new();
    path.hash(&mut hasher);
    std::env::temp_dir().join(format!("wt-{:016x}.lock", hasher.finish()))
}

/// `dir/.timetracker` -> `dir/.timetracker.<suffix>`
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}
