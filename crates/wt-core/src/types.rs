//! Core type definitions with validation.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// The provided path was the filesystem root.
    #[error("{field} cannot be the filesystem root")]
    Root { field: &'static str },
}

/// The lifecycle state of a tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TrackerState {
    /// Not tracking. Initial state.
    #[default]
    Stopped,
    /// A session is open and ticks are being delivered.
    Started,
    /// Tracking was paused, either by the user or by the idle timeout.
    Paused,
}

impl TrackerState {
    /// String representation for logs and machine-readable output.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Started => "started",
            Self::Paused => "paused",
        }
    }
}

impl fmt::Display for TrackerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A validated storage location for a ledger.
///
/// Identities are opaque keys: two ledgers are the same ledger iff their
/// identities compare equal. Empty paths and the filesystem root are rejected,
/// since neither can name a place to commit sessions to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "PathBuf", into = "PathBuf")]
pub struct StorageIdentity(PathBuf);

impl StorageIdentity {
    /// Creates a new identity after validation.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, ValidationError> {
        let path = path.into();
        if path.as_os_str().is_empty() {
            return Err(ValidationError::Empty {
                field: "storage identity",
            });
        }
        if path.parent().is_none() {
            return Err(ValidationError::Root {
                field: "storage identity",
            });
        }
        Ok(Self(path))
    }

    /// Returns the identity as a path.
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// Returns a string key suitable for indexing in a database.
    pub fn key(&self) -> String {
        self.0.to_string_lossy().into_owned()
    }
}

impl TryFrom<PathBuf> for StorageIdentity {
    type Error = ValidationError;

    fn try_from(value: PathBuf) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<StorageIdentity> for PathBuf {
    fn from(identity: StorageIdentity) -> Self {
        identity.0
    }
}

impl fmt::Display for StorageIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

impl AsRef<Path> for StorageIdentity {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_identity_rejects_empty() {
        assert_eq!(
            StorageIdentity::new(""),
            Err(ValidationError::Empty {
                field: "storage identity"
            })
        );
    }

    #[test]
    fn storage_identity_rejects_root() {
        assert!(matches!(
            StorageIdentity::new("/"),
            Err(ValidationError::Root { .. })
        ));
    }

    #[test]
    fn storage_identity_accepts_relative_and_absolute() {
        assert!(StorageIdentity::new(".timetracker").is_ok());
        assert!(StorageIdentity::new("/home/me/project/.timetracker").is_ok());
    }

    #[test]
    fn storage_identity_serde_roundtrip() {
        let id = StorageIdentity::new("/work/.timetracker").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"/work/.timetracker\"");
        let parsed: StorageIdentity = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn storage_identity_serde_rejects_empty() {
        let result: Result<StorageIdentity, _> = serde_json::from_str("\"\"");
        assert!(result.is_err());
    }

    #[test]
    fn tracker_state_as_str() {
        assert_eq!(TrackerState::Stopped.as_str(), "stopped");
        assert_eq!(TrackerState::Started.as_str(), "started");
        assert_eq!(TrackerState::Paused.to_string(), "paused");
        assert_eq!(TrackerState::default(), TrackerState::Stopped);
    }
}
