//! Per-repository metadata side-file.
//!
//! Each cloned repository carries a small JSON file recording when it was
//! created, last accessed, and last refreshed. The file is read-modify-written
//! on every access. A missing or corrupt file is treated as "no information"
//! (which downstream code interprets as outdated), never as a fatal error.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::warn;

/// Name of the metadata file inside each repository directory.
pub const METADATA_FILE: &str = ".mcp_metadata.json";

/// Timestamps tracked per cached repository, in seconds since the epoch.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RepoMetadata {
    /// Last time any read operation touched this repository.
    pub last_access: f64,

    /// When the repository was first cloned.
    pub created: f64,

    /// Last time the clone was refreshed from the remote.
    #[serde(default)]
    pub last_updated: f64,
}

impl RepoMetadata {
    /// Fresh metadata for a repository cloned right now.
    pub fn fresh() -> Self {
        let now = now_secs();
        Self {
            last_access: now,
            created: now,
            last_updated: now,
        }
    }
}

/// Current wall-clock time in seconds since the epoch.
pub fn now_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// Path of the metadata file for a repository directory.
pub fn metadata_path(repo_path: &Path) -> PathBuf {
    repo_path.join(METADATA_FILE)
}

/// Load metadata for a repository directory.
///
/// Returns `None` when the file is missing or unreadable; corrupt metadata
/// must degrade to "outdated", not abort the caller.
pub fn load(repo_path: &Path) -> Option<RepoMetadata> {
    let path = metadata_path(repo_path);
    let raw = fs::read_to_string(&path).ok()?;
    match serde_json::from_str(&raw) {
        Ok(meta) => Some(meta),
        Err(e) => {
            warn!("Corrupt metadata at {}: {}", path.display(), e);
            None
        }
    }
}

/// Write metadata for a repository directory. Best-effort; failures are
/// logged and swallowed since metadata loss only costs an extra refresh.
pub fn store(repo_path: &Path, meta: &RepoMetadata) {
    let path = metadata_path(repo_path);
    match serde_json::to_string(meta) {
        Ok(json) => {
            if let Err(e) = fs::write(&path, json) {
                warn!("Failed to write metadata at {}: {}", path.display(), e);
            }
        }
        Err(e) => warn!("Failed to serialize metadata: {}", e),
    }
}

/// Update `last_access` to now, preserving the other timestamps.
pub fn touch_access(repo_path: &Path) {
    let mut meta = load(repo_path).unwrap_or_else(RepoMetadata::fresh);
    meta.last_access = now_secs();
    store(repo_path, &meta);
}

/// Update `last_updated` (and `last_access`) to now, preserving `created`.
pub fn mark_updated(repo_path: &Path) {
    let mut meta = load(repo_path).unwrap_or_else(RepoMetadata::fresh);
    let now = now_secs();
    meta.last_updated = now;
    meta.last_access = now;
    store(repo_path, &meta);
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_missing_returns_none() {
        let dir = TempDir::new().unwrap();
        assert!(load(dir.path()).is_none());
    }

    #[test]
    fn test_load_corrupt_returns_none() {
        let dir = TempDir::new().unwrap();
        fs::write(metadata_path(dir.path()), "{not json").unwrap();
        assert!(load(dir.path()).is_none());
    }

    #[test]
    fn test_store_then_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let meta = RepoMetadata {
            last_access: 100.0,
            created: 50.0,
            last_updated: 75.0,
        };
        store(dir.path(), &meta);

        let loaded = load(dir.path()).unwrap();
        assert_eq!(loaded.last_access, 100.0);
        assert_eq!(loaded.created, 50.0);
        assert_eq!(loaded.last_updated, 75.0);
    }

    #[test]
    fn test_touch_access_preserves_created() {
        let dir = TempDir::new().unwrap();
        let meta = RepoMetadata {
            last_access: 1.0,
            created: 1.0,
            last_updated: 1.0,
        };
        store(dir.path(), &meta);

        touch_access(dir.path());

        let loaded = load(dir.path()).unwrap();
        assert_eq!(loaded.created, 1.0);
        assert_eq!(loaded.last_updated, 1.0);
        assert!(loaded.last_access > 1.0);
    }

    #[test]
    fn test_mark_updated_bumps_both_timestamps() {
        let dir = TempDir::new().unwrap();
        let meta = RepoMetadata {
            last_access: 1.0,
            created: 1.0,
            last_updated: 1.0,
        };
        store(dir.path(), &meta);

        mark_updated(dir.path());

        let loaded = load(dir.path()).unwrap();
        assert_eq!(loaded.created, 1.0);
        assert!(loaded.last_updated > 1.0);
        assert!(loaded.last_access > 1.0);
    }

    #[test]
    fn test_missing_last_updated_defaults_to_zero() {
        let dir = TempDir::new().unwrap();
        fs::write(
            metadata_path(dir.path()),
            r#"{"last_access": 10.0, "created": 5.0}"#,
        )
        .unwrap();

        let loaded = load(dir.path()).unwrap();
        assert_eq!(loaded.last_updated, 0.0);
    }
}
