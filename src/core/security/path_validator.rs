use std::io;
use std::path::{Path, PathBuf};

/// Errors that can occur during repository path validation
#[derive(Debug, thiserror::Error)]
pub enum RepoPathError {
    #[error("Path '{path}' escapes the repository root")]
    EscapesRepository { path: PathBuf },

    #[error("Path does not exist: '{path}'")]
    PathNotFound { path: PathBuf },

    #[error("Cannot canonicalize path '{path}': {error}")]
    CannotCanonicalize { path: PathBuf, error: io::Error },

    #[error("IO error for path '{path}': {error}")]
    IoError { path: PathBuf, error: io::Error },
}

/// Resolve a repository-relative path and verify it stays inside the clone.
///
/// Canonicalizes both the repository root and the joined path so that `..`
/// components and symlinks pointing outside the clone are rejected. Tool
/// callers hand in untrusted relative paths from the client; everything they
/// read must come from inside the cloned repository directory.
///
/// Returns the canonicalized absolute path on success.
pub fn resolve_repo_path(repo_root: &Path, relative: &str) -> Result<PathBuf, RepoPathError> {
    let canonical_root = repo_root
        .canonicalize()
        .map_err(|e| RepoPathError::IoError {
            path: repo_root.to_path_buf(),
            error: e,
        })?;

    let joined = canonical_root.join(relative);
    if !joined.exists() {
        return Err(RepoPathError::PathNotFound {
            path: PathBuf::from(relative),
        });
    }

    let canonical = joined
        .canonicalize()
        .map_err(|e| RepoPathError::CannotCanonicalize {
            path: joined.clone(),
            error: e,
        })?;

    if !canonical.starts_with(&canonical_root) {
        return Err(RepoPathError::EscapesRepository {
            path: PathBuf::from(relative),
        });
    }

    Ok(canonical)
}
