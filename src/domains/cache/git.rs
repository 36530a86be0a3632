//! Version-control engine abstraction.
//!
//! The cache manager only needs three capabilities from git: a shallow clone,
//! a pull, and a validity check. They sit behind a trait so tests can script
//! outcomes without a network or a git binary. The production implementation
//! shells out to the `git` executable; each invocation runs to completion, no
//! internal timeout is enforced.

use std::path::Path;
use std::process::Command;
use tracing::{debug, warn};

/// Result of a single git operation: `Ok` or the engine's error message.
pub type GitResult = Result<(), String>;

/// The operations the cache manager consumes from a version-control engine.
pub trait GitEngine: Send + Sync {
    /// Clone `url` into `dest` with depth 1 on a single branch. Full history
    /// is never needed for read-only navigation.
    fn clone_shallow(&self, url: &str, dest: &Path) -> GitResult;

    /// Fast-forward an existing clone at `dest` from its remote.
    fn pull(&self, dest: &Path) -> GitResult;

    /// Whether `path` holds a recognizable repository.
    fn is_valid_repo(&self, path: &Path) -> bool;
}

/// Engine backed by the system `git` binary.
pub struct SystemGit;

impl SystemGit {
    fn run(mut cmd: Command, what: &str) -> GitResult {
        debug!("Running git: {:?}", cmd);
        let output = cmd
            .output()
            .map_err(|e| format!("failed to spawn git for {}: {}", what, e))?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = stderr.trim();
            warn!("git {} failed: {}", what, detail);
            Err(format!("git {} failed: {}", what, detail))
        }
    }
}

impl GitEngine for SystemGit {
    fn clone_shallow(&self, url: &str, dest: &Path) -> GitResult {
        let mut cmd = Command::new("git");
        cmd.arg("clone")
            .arg("--depth")
            .arg("1")
            .arg("--single-branch")
            .arg(url)
            .arg(dest);
        Self::run(cmd, "clone")
    }

    fn pull(&self, dest: &Path) -> GitResult {
        let mut cmd = Command::new("git");
        cmd.arg("-C").arg(dest).arg("pull").arg("--ff-only");
        Self::run(cmd, "pull")
    }

    fn is_valid_repo(&self, path: &Path) -> bool {
        // A `.git` entry (directory, or file for worktrees) is the marker.
        // A subprocess probe per lookup would be needless cost on a path hit
        // by every read operation.
        path.is_dir() && path.join(".git").exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_is_valid_repo_requires_git_marker() {
        let dir = TempDir::new().unwrap();
        let engine = SystemGit;
        assert!(!engine.is_valid_repo(dir.path()));

        fs::create_dir(dir.path().join(".git")).unwrap();
        assert!(engine.is_valid_repo(dir.path()));
    }

    #[test]
    fn test_is_valid_repo_missing_dir() {
        let engine = SystemGit;
        assert!(!engine.is_valid_repo(Path::new("/nonexistent/path/12345")));
    }
}
