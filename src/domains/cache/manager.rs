//! Local repository cache manager.
//!
//! Given a repository reference, guarantees that a reasonably fresh local
//! clone exists at a deterministic path, within a configurable storage
//! budget. State lives on disk (directories plus metadata side-files) and is
//! rediscovered on every call; the only in-process shared state is the set of
//! paths currently being cloned or updated, guarded by a single mutex held
//! only for membership changes, never across a clone or pull.

use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};
use walkdir::WalkDir;

use super::error::{CacheError, CacheResult};
use super::git::{GitEngine, SystemGit};
use super::identity::{self, RepoIdentity};
use super::metadata::{self, RepoMetadata, now_secs};
use crate::core::config::CacheConfig;

/// What `ensure_available` did to satisfy the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheAction {
    Accessed,
    Cloned,
    UpdatedViaPull,
    UpdatedViaReclone,
}

impl CacheAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accessed => "accessed",
            Self::Cloned => "cloned",
            Self::UpdatedViaPull => "updated_via_pull",
            Self::UpdatedViaReclone => "updated_via_reclone",
        }
    }
}

/// Successful outcome of `ensure_available`.
#[derive(Debug, Clone)]
pub struct Ensured {
    pub local_path: PathBuf,
    pub action: CacheAction,
}

/// Result of a cache lookup, consumed by explicit matching at the call site.
#[derive(Debug)]
pub enum RepoState {
    /// A valid clone exists.
    Found(CacheEntryInfo),
    /// The path is currently being cloned or updated.
    Busy,
    /// No clone exists at the derived path.
    NotFound,
}

/// Snapshot of one cached repository directory.
#[derive(Debug, Clone)]
pub struct CacheEntryInfo {
    pub path: PathBuf,
    pub name: String,
    /// `None` when the metadata side-file is missing or corrupt.
    pub metadata: Option<RepoMetadata>,
    pub size_bytes: u64,
}

impl CacheEntryInfo {
    fn last_access(&self) -> f64 {
        self.metadata.map(|m| m.last_access).unwrap_or(0.0)
    }
}

/// Outcome of an idle-cleanup sweep. Per-entry failures are collected rather
/// than swallowed so callers and tests can assert on partial failure.
#[derive(Debug, Default)]
pub struct SweepReport {
    pub removed: Vec<PathBuf>,
    pub failures: Vec<SweepFailure>,
}

/// A single entry the sweep could not remove.
#[derive(Debug)]
pub struct SweepFailure {
    pub path: PathBuf,
    pub reason: String,
}

/// Membership in the cloning set, released on drop.
///
/// Removal must happen on every exit path of a clone or update, including
/// early returns and panics; tying it to scope rather than per-exit
/// bookkeeping is what guarantees that.
struct CloneGuard<'a> {
    set: &'a Mutex<HashSet<PathBuf>>,
    path: PathBuf,
}

impl<'a> CloneGuard<'a> {
    /// Insert `path` into the set. Returns `None` when another operation
    /// already owns it.
    fn acquire(set: &'a Mutex<HashSet<PathBuf>>, path: &Path) -> Option<Self> {
        let mut members = set.lock().unwrap_or_else(|e| e.into_inner());
        if !members.insert(path.to_path_buf()) {
            return None;
        }
        Some(Self {
            set,
            path: path.to_path_buf(),
        })
    }
}

impl Drop for CloneGuard<'_> {
    fn drop(&mut self) {
        let mut members = self.set.lock().unwrap_or_else(|e| e.into_inner());
        members.remove(&self.path);
    }
}

/// Manages local repository storage and cloning operations.
///
/// Constructed once per process with the base path, storage limit, and
/// staleness thresholds as parameters, then shared via `Arc` with every tool
/// and resource that touches the cache.
pub struct CacheManager {
    base_path: PathBuf,
    storage_limit_bytes: Option<u64>,
    update_max_age_secs: f64,
    idle_max_age_secs: f64,
    cloning: Mutex<HashSet<PathBuf>>,
    engine: Arc<dyn GitEngine>,
}

impl CacheManager {
    /// Create a manager backed by the system git binary.
    pub fn new(config: &CacheConfig) -> std::io::Result<Self> {
        Self::with_engine(config, Arc::new(SystemGit))
    }

    /// Create a manager with a custom version-control engine.
    pub fn with_engine(config: &CacheConfig, engine: Arc<dyn GitEngine>) -> std::io::Result<Self> {
        let base_path = config.resolved_base_path();
        fs::create_dir_all(&base_path)?;

        Ok(Self {
            base_path,
            storage_limit_bytes: config.storage_limit_bytes(),
            update_max_age_secs: config.update_max_age_hours * 3600.0,
            idle_max_age_secs: config.idle_max_age_hours * 3600.0,
            cloning: Mutex::new(HashSet::new()),
            engine,
        })
    }

    /// The directory under which all clones live.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Configured storage limit, if any.
    pub fn storage_limit_bytes(&self) -> Option<u64> {
        self.storage_limit_bytes
    }

    /// Deterministic local path for a repository reference.
    pub fn local_path(&self, input: &str) -> CacheResult<PathBuf> {
        let identity = RepoIdentity::parse(input)?;
        Ok(self.base_path.join(identity.directory_name(input)))
    }

    /// Look up the current state of a repository reference.
    pub fn lookup(&self, input: &str) -> CacheResult<RepoState> {
        let path = self.local_path(input)?;
        if self.is_cloning(&path) {
            return Ok(RepoState::Busy);
        }
        if self.engine.is_valid_repo(&path) {
            return Ok(RepoState::Found(self.entry_info(path)));
        }
        Ok(RepoState::NotFound)
    }

    /// Record a read access against a cloned repository.
    pub fn record_access(&self, repo_path: &Path) {
        metadata::touch_access(repo_path);
    }

    /// Guarantee a fresh local clone for `input`, cloning or refreshing as
    /// needed.
    ///
    /// `estimated_bytes` feeds the storage budget check before a fresh clone;
    /// callers without a better guess pass a conservative default. Busy paths
    /// surface `InProgress` immediately; retry is the caller's
    /// responsibility.
    pub fn ensure_available(
        &self,
        input: &str,
        force_update: bool,
        estimated_bytes: u64,
    ) -> CacheResult<Ensured> {
        let identity = RepoIdentity::parse(input)?;
        let repo_path = self.base_path.join(identity.directory_name(input));

        let valid = self.engine.is_valid_repo(&repo_path);

        if valid && !force_update && !self.is_outdated(&repo_path) {
            metadata::touch_access(&repo_path);
            return Ok(Ensured {
                local_path: repo_path,
                action: CacheAction::Accessed,
            });
        }

        if self.is_cloning(&repo_path) {
            return Err(CacheError::InProgress(repo_path));
        }

        if !valid {
            self.check_before_clone(estimated_bytes)?;

            let _guard = CloneGuard::acquire(&self.cloning, &repo_path)
                .ok_or_else(|| CacheError::InProgress(repo_path.clone()))?;
            self.clone_fresh(input, &repo_path)?;

            return Ok(Ensured {
                local_path: repo_path,
                action: CacheAction::Cloned,
            });
        }

        let _guard = CloneGuard::acquire(&self.cloning, &repo_path)
            .ok_or_else(|| CacheError::InProgress(repo_path.clone()))?;
        let action = self.refresh(input, &repo_path)?;

        Ok(Ensured {
            local_path: repo_path,
            action,
        })
    }

    /// Whether a clone's last refresh is older than the update threshold.
    ///
    /// Missing or corrupt metadata, or a missing `last_updated`, reads as
    /// outdated; the failure mode leans toward refreshing.
    pub fn is_outdated(&self, repo_path: &Path) -> bool {
        let Some(meta) = metadata::load(repo_path) else {
            return true;
        };
        if meta.last_updated <= 0.0 {
            return true;
        }
        now_secs() - meta.last_updated > self.update_max_age_secs
    }

    /// Whether the path is currently being cloned or updated.
    pub fn is_cloning(&self, repo_path: &Path) -> bool {
        let members = self.cloning.lock().unwrap_or_else(|e| e.into_inner());
        members.contains(repo_path)
    }

    /// Total bytes on disk under the cache base directory.
    ///
    /// Recomputed by walking the tree every time; a persisted total could
    /// drift from reality after partial writes or external changes.
    pub fn usage_bytes(&self) -> u64 {
        directory_size(&self.base_path)
    }

    /// Snapshot of every entry directory under the base path.
    pub fn entries(&self) -> Vec<CacheEntryInfo> {
        let Ok(read_dir) = fs::read_dir(&self.base_path) else {
            return Vec::new();
        };

        read_dir
            .flatten()
            .filter(|e| e.path().is_dir())
            .map(|e| self.entry_info(e.path()))
            .collect()
    }

    fn entry_info(&self, path: PathBuf) -> CacheEntryInfo {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        CacheEntryInfo {
            metadata: metadata::load(&path),
            size_bytes: directory_size(&path),
            name,
            path,
        }
    }

    /// Verify the storage budget can absorb a clone of `estimated_bytes`,
    /// evicting least-recently-used entries if needed.
    fn check_before_clone(&self, estimated_bytes: u64) -> CacheResult<()> {
        let Some(limit) = self.storage_limit_bytes else {
            return Ok(());
        };

        let needed = self.usage_bytes().saturating_add(estimated_bytes);
        if needed <= limit {
            return Ok(());
        }

        if self.evict_to_free(needed - limit) {
            return Ok(());
        }

        Err(CacheError::StorageExceeded {
            needed_bytes: needed,
            limit_bytes: limit,
        })
    }

    /// Remove least-recently-accessed entries until `target_bytes` are freed
    /// or entries run out. Entries currently being cloned are never touched;
    /// per-entry removal errors are logged and skipped. Returns whether the
    /// target was met.
    pub fn evict_to_free(&self, target_bytes: u64) -> bool {
        let mut entries = self.entries();
        entries.sort_by(|a, b| {
            a.last_access()
                .partial_cmp(&b.last_access())
                .unwrap_or(Ordering::Equal)
        });

        let mut freed: u64 = 0;
        for entry in entries {
            if freed >= target_bytes {
                break;
            }
            if self.is_cloning(&entry.path) {
                continue;
            }
            match fs::remove_dir_all(&entry.path) {
                Ok(()) => {
                    info!(
                        "Evicted {} ({} bytes) to reclaim space",
                        entry.name, entry.size_bytes
                    );
                    freed = freed.saturating_add(entry.size_bytes);
                }
                Err(e) => {
                    warn!("Failed to evict {}: {}", entry.path.display(), e);
                }
            }
        }

        freed >= target_bytes
    }

    /// Remove entries whose last access is older than the idle threshold.
    ///
    /// Run once at process start. One bad directory must not abort cleanup of
    /// the rest; failures are collected into the report instead.
    pub fn sweep_idle(&self) -> SweepReport {
        let now = now_secs();
        let mut report = SweepReport::default();

        for entry in self.entries() {
            // Directories without metadata were not created by this server;
            // leave them alone.
            let Some(meta) = entry.metadata else {
                continue;
            };
            if now - meta.last_access <= self.idle_max_age_secs {
                continue;
            }
            if self.is_cloning(&entry.path) {
                continue;
            }
            match fs::remove_dir_all(&entry.path) {
                Ok(()) => {
                    info!("Removed idle repository {}", entry.name);
                    report.removed.push(entry.path);
                }
                Err(e) => {
                    warn!("Failed to remove idle {}: {}", entry.path.display(), e);
                    report.failures.push(SweepFailure {
                        path: entry.path,
                        reason: e.to_string(),
                    });
                }
            }
        }

        report
    }

    fn clone_fresh(&self, input: &str, repo_path: &Path) -> CacheResult<()> {
        if let Some(parent) = repo_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let url = identity::clone_url(input);
        info!("Cloning {} into {}", url, repo_path.display());

        if let Err(e) = self.engine.clone_shallow(&url, repo_path) {
            remove_partial(repo_path);
            return Err(CacheError::CloneFailed(e));
        }

        metadata::store(repo_path, &RepoMetadata::fresh());
        Ok(())
    }

    /// Refresh a stale clone: pull first, fall back to delete-and-reclone.
    fn refresh(&self, input: &str, repo_path: &Path) -> CacheResult<CacheAction> {
        info!("Refreshing clone at {}", repo_path.display());

        let pull_error = match self.engine.pull(repo_path) {
            Ok(()) => {
                metadata::mark_updated(repo_path);
                return Ok(CacheAction::UpdatedViaPull);
            }
            Err(e) => e,
        };

        warn!("Pull failed ({}), falling back to reclone", pull_error);
        remove_partial(repo_path);

        let url = identity::clone_url(input);
        match self.engine.clone_shallow(&url, repo_path) {
            Ok(()) => {
                metadata::store(repo_path, &RepoMetadata::fresh());
                Ok(CacheAction::UpdatedViaReclone)
            }
            Err(reclone_error) => {
                remove_partial(repo_path);
                Err(CacheError::UpdateFailed {
                    pull_error,
                    reclone_error,
                })
            }
        }
    }
}

/// Sum of file sizes under a directory. Symlinks are not followed.
fn directory_size(path: &Path) -> u64 {
    WalkDir::new(path)
        .follow_links(false)
        .into_iter()
        .flatten()
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.metadata().ok())
        .map(|m| m.len())
        .sum()
}

/// Best-effort removal of a partial or failed clone directory.
fn remove_partial(repo_path: &Path) {
    if repo_path.exists() {
        if let Err(e) = fs::remove_dir_all(repo_path) {
            warn!(
                "Failed to clean up partial clone at {}: {}",
                repo_path.display(),
                e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering as AtomicOrdering};
    use std::sync::mpsc;
    use tempfile::TempDir;

    const GB: u64 = 1024 * 1024 * 1024;

    /// Engine with scriptable failures and call counters.
    #[derive(Default)]
    struct ScriptedGit {
        fail_clone: AtomicBool,
        fail_pull: AtomicBool,
        /// When failing a clone, leave a half-written directory behind.
        partial_on_failure: AtomicBool,
        clone_calls: AtomicUsize,
        pull_calls: AtomicUsize,
    }

    impl ScriptedGit {
        fn clone_count(&self) -> usize {
            self.clone_calls.load(AtomicOrdering::SeqCst)
        }

        fn pull_count(&self) -> usize {
            self.pull_calls.load(AtomicOrdering::SeqCst)
        }
    }

    impl GitEngine for ScriptedGit {
        fn clone_shallow(&self, _url: &str, dest: &Path) -> super::super::git::GitResult {
            self.clone_calls.fetch_add(1, AtomicOrdering::SeqCst);
            if self.fail_clone.load(AtomicOrdering::SeqCst) {
                if self.partial_on_failure.load(AtomicOrdering::SeqCst) {
                    fs::create_dir_all(dest).map_err(|e| e.to_string())?;
                    fs::write(dest.join("partial.txt"), "half-written").map_err(|e| e.to_string())?;
                }
                return Err("simulated clone failure".to_string());
            }
            fs::create_dir_all(dest.join(".git")).map_err(|e| e.to_string())?;
            fs::write(dest.join("README.md"), "hello").map_err(|e| e.to_string())?;
            Ok(())
        }

        fn pull(&self, _dest: &Path) -> super::super::git::GitResult {
            self.pull_calls.fetch_add(1, AtomicOrdering::SeqCst);
            if self.fail_pull.load(AtomicOrdering::SeqCst) {
                Err("simulated pull failure".to_string())
            } else {
                Ok(())
            }
        }

        fn is_valid_repo(&self, path: &Path) -> bool {
            path.join(".git").exists()
        }
    }

    fn test_manager(base: &Path, limit_gb: Option<f64>) -> (CacheManager, Arc<ScriptedGit>) {
        let engine = Arc::new(ScriptedGit::default());
        let config = CacheConfig {
            base_path: Some(base.to_path_buf()),
            storage_limit_gb: limit_gb,
            ..CacheConfig::default()
        };
        let manager = CacheManager::with_engine(&config, engine.clone()).unwrap();
        (manager, engine)
    }

    fn write_entry(base: &Path, name: &str, size: usize, last_access: f64) -> PathBuf {
        let path = base.join(name);
        fs::create_dir_all(path.join(".git")).unwrap();
        fs::write(path.join("blob.bin"), vec![0u8; size]).unwrap();
        metadata::store(
            &path,
            &RepoMetadata {
                last_access,
                created: last_access,
                last_updated: last_access,
            },
        );
        path
    }

    #[test]
    fn test_local_path_deterministic() {
        let dir = TempDir::new().unwrap();
        let (manager, _) = test_manager(dir.path(), None);

        let a = manager.local_path("rust-lang/cargo").unwrap();
        let b = manager.local_path("rust-lang/cargo").unwrap();
        assert_eq!(a, b);
        assert!(a.starts_with(dir.path()));
    }

    #[test]
    fn test_invalid_reference_leaves_filesystem_untouched() {
        let dir = TempDir::new().unwrap();
        let (manager, engine) = test_manager(dir.path(), None);

        let err = manager.ensure_available("not a url", false, 0).unwrap_err();
        assert!(matches!(err, CacheError::InvalidReference(_)));

        let err = manager
            .ensure_available("http://notgithub.com/x", false, 0)
            .unwrap_err();
        assert!(matches!(err, CacheError::InvalidReference(_)));

        assert_eq!(engine.clone_count(), 0);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_clone_then_access_idempotent() {
        let dir = TempDir::new().unwrap();
        let (manager, engine) = test_manager(dir.path(), None);

        let first = manager.ensure_available("owner/repo", false, 0).unwrap();
        assert_eq!(first.action, CacheAction::Cloned);
        assert!(first.local_path.join(".git").exists());

        let second = manager.ensure_available("owner/repo", false, 0).unwrap();
        assert_eq!(second.action, CacheAction::Accessed);
        assert_eq!(second.local_path, first.local_path);

        assert_eq!(engine.clone_count(), 1);
        assert_eq!(engine.pull_count(), 0);
    }

    #[test]
    fn test_clone_writes_fresh_metadata() {
        let dir = TempDir::new().unwrap();
        let (manager, _) = test_manager(dir.path(), None);

        let ensured = manager.ensure_available("owner/repo", false, 0).unwrap();
        let meta = metadata::load(&ensured.local_path).unwrap();
        assert!(meta.created > 0.0);
        assert!(meta.last_updated > 0.0);
    }

    #[test]
    fn test_storage_exceeded_on_fresh_cache() {
        let dir = TempDir::new().unwrap();
        let (manager, engine) = test_manager(dir.path(), Some(1.0));

        let err = manager
            .ensure_available("owner/huge", false, 2 * GB)
            .unwrap_err();
        assert!(matches!(err, CacheError::StorageExceeded { .. }));
        assert_eq!(engine.clone_count(), 0);
    }

    #[test]
    fn test_eviction_removes_least_recently_used() {
        let dir = TempDir::new().unwrap();
        let (manager, _) = test_manager(dir.path(), None);

        let old = write_entry(dir.path(), "a_old_11111111", 4096, 100.0);
        let new = write_entry(dir.path(), "b_new_22222222", 4096, 200.0);

        assert!(manager.evict_to_free(1));
        assert!(!old.exists());
        assert!(new.exists());
    }

    #[test]
    fn test_eviction_frees_until_target_met() {
        let dir = TempDir::new().unwrap();
        let (manager, _) = test_manager(dir.path(), None);

        let first = write_entry(dir.path(), "a_11111111", 4096, 100.0);
        let second = write_entry(dir.path(), "b_22222222", 4096, 200.0);
        let third = write_entry(dir.path(), "c_33333333", 4096, 300.0);

        // Needs both of the two oldest entries, but not the newest.
        assert!(manager.evict_to_free(5000));
        assert!(!first.exists());
        assert!(!second.exists());
        assert!(third.exists());
    }

    #[test]
    fn test_eviction_reports_unmet_target() {
        let dir = TempDir::new().unwrap();
        let (manager, _) = test_manager(dir.path(), None);

        write_entry(dir.path(), "a_11111111", 1024, 100.0);
        assert!(!manager.evict_to_free(100 * GB));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_staleness_thresholds() {
        let dir = TempDir::new().unwrap();
        let (manager, _) = test_manager(dir.path(), None);

        let path = dir.path().join("repo");
        fs::create_dir_all(&path).unwrap();

        let now = now_secs();
        metadata::store(
            &path,
            &RepoMetadata {
                last_access: now,
                created: now,
                last_updated: now - 25.0 * 3600.0,
            },
        );
        assert!(manager.is_outdated(&path));

        metadata::store(
            &path,
            &RepoMetadata {
                last_access: now,
                created: now,
                last_updated: now - 3600.0,
            },
        );
        assert!(!manager.is_outdated(&path));
    }

    #[test]
    fn test_missing_metadata_is_outdated() {
        let dir = TempDir::new().unwrap();
        let (manager, _) = test_manager(dir.path(), None);

        let path = dir.path().join("repo");
        fs::create_dir_all(&path).unwrap();
        assert!(manager.is_outdated(&path));

        fs::write(path.join(metadata::METADATA_FILE), "{broken").unwrap();
        assert!(manager.is_outdated(&path));
    }

    #[test]
    fn test_stale_clone_updates_via_pull() {
        let dir = TempDir::new().unwrap();
        let (manager, engine) = test_manager(dir.path(), None);

        let ensured = manager.ensure_available("owner/repo", false, 0).unwrap();

        // Age the clone past the update threshold.
        let now = now_secs();
        metadata::store(
            &ensured.local_path,
            &RepoMetadata {
                last_access: now,
                created: now,
                last_updated: now - 48.0 * 3600.0,
            },
        );

        let refreshed = manager.ensure_available("owner/repo", false, 0).unwrap();
        assert_eq!(refreshed.action, CacheAction::UpdatedViaPull);
        assert_eq!(engine.pull_count(), 1);
        assert_eq!(engine.clone_count(), 1);

        let meta = metadata::load(&refreshed.local_path).unwrap();
        assert!(now - meta.last_updated < 60.0);
    }

    #[test]
    fn test_force_update_pulls_fresh_clone() {
        let dir = TempDir::new().unwrap();
        let (manager, engine) = test_manager(dir.path(), None);

        manager.ensure_available("owner/repo", false, 0).unwrap();
        let forced = manager.ensure_available("owner/repo", true, 0).unwrap();
        assert_eq!(forced.action, CacheAction::UpdatedViaPull);
        assert_eq!(engine.pull_count(), 1);
    }

    #[test]
    fn test_pull_failure_falls_back_to_reclone() {
        let dir = TempDir::new().unwrap();
        let (manager, engine) = test_manager(dir.path(), None);

        manager.ensure_available("owner/repo", false, 0).unwrap();
        engine.fail_pull.store(true, AtomicOrdering::SeqCst);

        let refreshed = manager.ensure_available("owner/repo", true, 0).unwrap();
        assert_eq!(refreshed.action, CacheAction::UpdatedViaReclone);
        assert_eq!(engine.clone_count(), 2);
        assert!(refreshed.local_path.join(".git").exists());
    }

    #[test]
    fn test_pull_and_reclone_failure_preserves_both_errors() {
        let dir = TempDir::new().unwrap();
        let (manager, engine) = test_manager(dir.path(), None);

        let ensured = manager.ensure_available("owner/repo", false, 0).unwrap();
        engine.fail_pull.store(true, AtomicOrdering::SeqCst);
        engine.fail_clone.store(true, AtomicOrdering::SeqCst);

        let err = manager.ensure_available("owner/repo", true, 0).unwrap_err();
        match err {
            CacheError::UpdateFailed {
                pull_error,
                reclone_error,
            } => {
                assert!(pull_error.contains("pull failure"));
                assert!(reclone_error.contains("clone failure"));
            }
            other => panic!("expected UpdateFailed, got {:?}", other),
        }

        // The failed update must not leave the path marked busy.
        assert!(!manager.is_cloning(&ensured.local_path));
    }

    #[test]
    fn test_failed_clone_cleans_up_partial_directory() {
        let dir = TempDir::new().unwrap();
        let (manager, engine) = test_manager(dir.path(), None);
        engine.fail_clone.store(true, AtomicOrdering::SeqCst);
        engine.partial_on_failure.store(true, AtomicOrdering::SeqCst);

        let err = manager.ensure_available("owner/repo", false, 0).unwrap_err();
        assert!(matches!(err, CacheError::CloneFailed(_)));

        let path = manager.local_path("owner/repo").unwrap();
        assert!(!path.exists());
        assert!(!manager.is_cloning(&path));
    }

    #[test]
    fn test_concurrent_ensure_single_clone() {
        /// Engine whose clone blocks until the test releases it.
        struct BlockingGit {
            clone_calls: AtomicUsize,
            started_tx: Mutex<mpsc::Sender<()>>,
            release_rx: Mutex<mpsc::Receiver<()>>,
        }

        impl GitEngine for BlockingGit {
            fn clone_shallow(&self, _url: &str, dest: &Path) -> super::super::git::GitResult {
                self.clone_calls.fetch_add(1, AtomicOrdering::SeqCst);
                self.started_tx.lock().unwrap().send(()).unwrap();
                self.release_rx.lock().unwrap().recv().unwrap();
                fs::create_dir_all(dest.join(".git")).map_err(|e| e.to_string())?;
                Ok(())
            }

            fn pull(&self, _dest: &Path) -> super::super::git::GitResult {
                Ok(())
            }

            fn is_valid_repo(&self, path: &Path) -> bool {
                path.join(".git").exists()
            }
        }

        let dir = TempDir::new().unwrap();
        let (started_tx, started_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let engine = Arc::new(BlockingGit {
            clone_calls: AtomicUsize::new(0),
            started_tx: Mutex::new(started_tx),
            release_rx: Mutex::new(release_rx),
        });

        let config = CacheConfig {
            base_path: Some(dir.path().to_path_buf()),
            ..CacheConfig::default()
        };
        let manager = Arc::new(CacheManager::with_engine(&config, engine.clone()).unwrap());

        let background = {
            let manager = manager.clone();
            std::thread::spawn(move || manager.ensure_available("owner/repo", false, 0))
        };

        // Wait until the background clone is inside the engine call.
        started_rx.recv().unwrap();

        let err = manager.ensure_available("owner/repo", false, 0).unwrap_err();
        assert!(matches!(err, CacheError::InProgress(_)));

        release_tx.send(()).unwrap();
        let result = background.join().unwrap().unwrap();
        assert_eq!(result.action, CacheAction::Cloned);
        assert_eq!(engine.clone_calls.load(AtomicOrdering::SeqCst), 1);

        // Set membership must be gone once the clone completes.
        assert!(!manager.is_cloning(&result.local_path));
    }

    #[test]
    fn test_lookup_states() {
        let dir = TempDir::new().unwrap();
        let (manager, _) = test_manager(dir.path(), None);

        assert!(matches!(
            manager.lookup("owner/repo").unwrap(),
            RepoState::NotFound
        ));

        manager.ensure_available("owner/repo", false, 0).unwrap();
        match manager.lookup("owner/repo").unwrap() {
            RepoState::Found(info) => {
                assert!(info.size_bytes > 0);
                assert!(info.metadata.is_some());
            }
            other => panic!("expected Found, got {:?}", other),
        }

        assert!(manager.lookup("garbage").is_err());
    }

    #[test]
    fn test_usage_bytes_counts_entry_files() {
        let dir = TempDir::new().unwrap();
        let (manager, _) = test_manager(dir.path(), None);

        assert_eq!(manager.usage_bytes(), 0);
        write_entry(dir.path(), "a_11111111", 2048, 100.0);
        assert!(manager.usage_bytes() >= 2048);
    }

    #[test]
    fn test_sweep_removes_only_idle_entries() {
        let dir = TempDir::new().unwrap();
        let (manager, _) = test_manager(dir.path(), None);

        let now = now_secs();
        let idle = write_entry(dir.path(), "idle_11111111", 128, now - 72.0 * 3600.0);
        let active = write_entry(dir.path(), "active_22222222", 128, now - 3600.0);

        let report = manager.sweep_idle();
        assert_eq!(report.removed, vec![idle.clone()]);
        assert!(report.failures.is_empty());
        assert!(!idle.exists());
        assert!(active.exists());
    }

    #[test]
    fn test_sweep_skips_directories_without_metadata() {
        let dir = TempDir::new().unwrap();
        let (manager, _) = test_manager(dir.path(), None);

        let foreign = dir.path().join("not_ours");
        fs::create_dir_all(&foreign).unwrap();

        let report = manager.sweep_idle();
        assert!(report.removed.is_empty());
        assert!(report.failures.is_empty());
        assert!(foreign.exists());
    }

    #[test]
    fn test_sweep_accounts_for_every_idle_entry() {
        let dir = TempDir::new().unwrap();
        let (manager, _) = test_manager(dir.path(), None);

        let now = now_secs();
        write_entry(dir.path(), "idle_a_11111111", 128, now - 72.0 * 3600.0);
        write_entry(dir.path(), "idle_b_22222222", 128, now - 96.0 * 3600.0);

        let report = manager.sweep_idle();
        assert_eq!(report.removed.len() + report.failures.len(), 2);
    }
}
