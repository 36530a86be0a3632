//! Shared helpers for the repository tools.
//!
//! Every read-style tool starts the same way: resolve the reference to a
//! cloned repository, refuse if it is busy or absent, and record the access.
//! The tools never trigger a clone themselves; that is `repo_clone`'s job.

use rmcp::model::{CallToolResult, Content};
use std::path::{Path, PathBuf};

use crate::domains::cache::{CacheManager, RepoState};

/// Resolve a reference to the path of an existing clone, recording the
/// access. On any other state, returns the error result the tool should
/// hand back unchanged.
pub fn require_cloned(cache: &CacheManager, repo_url: &str) -> Result<PathBuf, CallToolResult> {
    match cache.lookup(repo_url) {
        Ok(RepoState::Found(info)) => {
            cache.record_access(&info.path);
            Ok(info.path)
        }
        Ok(RepoState::Busy) => Err(CallToolResult::error(vec![Content::text(
            "Repository is still cloning. Please try again in a moment.",
        )])),
        Ok(RepoState::NotFound) => Err(CallToolResult::error(vec![Content::text(
            "Repository not cloned. Use repo_clone first.",
        )])),
        Err(e) => Err(CallToolResult::error(vec![Content::text(e.to_string())])),
    }
}

/// Whether any component of a repo-relative path is hidden (dot-prefixed).
/// Keeps `.git` internals and the metadata side-file out of search results.
pub fn is_hidden(relative: &Path) -> bool {
    relative
        .components()
        .any(|c| c.as_os_str().to_string_lossy().starts_with('.'))
}

/// Format file size in human-readable format.
pub fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];

    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", size as u64, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}

/// Render an epoch-seconds timestamp as RFC 3339, when representable.
pub fn iso_timestamp(secs: f64) -> Option<String> {
    chrono::DateTime::from_timestamp(secs as i64, 0).map(|dt| dt.to_rfc3339())
}
