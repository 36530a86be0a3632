//! Repository clone tool definition.
//!
//! Clones a repository on first use and refreshes stale clones, reporting
//! which action satisfied the request.

use futures::FutureExt;
use rmcp::{
    ErrorData as McpError,
    handler::server::tool::{ToolCallContext, ToolRoute, schema_for_type},
    model::{CallToolResult, Content, Tool},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::domains::cache::{CacheError, CacheManager};

/// Budget estimate used when the caller has no better guess. Shallow clones
/// of typical repositories land well under this.
const DEFAULT_ESTIMATED_SIZE_MB: u64 = 50;

// ============================================================================
// Tool Parameters
// ============================================================================

/// Parameters for the repository clone tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct RepoCloneParams {
    /// GitHub repository URL (e.g., 'https://github.com/owner/repo' or 'owner/repo').
    pub repo_url: String,

    /// Refresh the clone from the remote even if it is not yet stale.
    #[serde(default)]
    pub force_update: bool,

    /// Estimated repository size in megabytes, used for the storage budget
    /// check before cloning.
    pub estimated_size_mb: Option<u64>,
}

// ============================================================================
// Output Structure (JSON format for AI agents)
// ============================================================================

/// Result of a clone request
#[derive(Debug, Serialize, JsonSchema)]
struct CloneOutcome {
    /// The reference as given
    repo_url: String,
    /// Always "available" on success
    status: String,
    /// What the cache did: "accessed", "cloned", "updated_via_pull", or
    /// "updated_via_reclone"
    action: String,
    /// Absolute path of the local clone
    local_path: String,
}

// ============================================================================
// Tool Definition
// ============================================================================

/// Clone tool - clones or verifies a repository is available locally.
pub struct RepoCloneTool;

impl RepoCloneTool {
    /// Tool name as registered in MCP.
    pub const NAME: &'static str = "repo_clone";

    /// Tool description shown to clients.
    pub const DESCRIPTION: &'static str = "Clone a GitHub repository locally or verify it is already available. Stale clones are refreshed automatically; pass force_update to refresh immediately.";

    /// Execute the tool logic.
    #[instrument(skip_all, fields(repo_url = %params.repo_url))]
    pub fn execute(params: &RepoCloneParams, cache: &CacheManager) -> CallToolResult {
        info!("Clone tool called for '{}'", params.repo_url);

        let estimated_bytes =
            params.estimated_size_mb.unwrap_or(DEFAULT_ESTIMATED_SIZE_MB) * 1024 * 1024;

        match cache.ensure_available(&params.repo_url, params.force_update, estimated_bytes) {
            Ok(ensured) => {
                info!(
                    "Repository '{}' available at {} ({})",
                    params.repo_url,
                    ensured.local_path.display(),
                    ensured.action.as_str()
                );

                let outcome = CloneOutcome {
                    repo_url: params.repo_url.clone(),
                    status: "available".to_string(),
                    action: ensured.action.as_str().to_string(),
                    local_path: ensured.local_path.display().to_string(),
                };

                let summary = format!(
                    "Repository '{}' is available at {} ({})",
                    params.repo_url,
                    ensured.local_path.display(),
                    ensured.action.as_str()
                );

                CallToolResult {
                    content: vec![Content::text(summary)],
                    structured_content: serde_json::to_value(&outcome).ok(),
                    is_error: Some(false),
                    meta: None,
                }
            }
            Err(CacheError::InProgress(_)) => {
                info!("Repository '{}' is already being cloned", params.repo_url);
                CallToolResult::error(vec![Content::text(
                    "Repository is still cloning. Please try again in a moment.",
                )])
            }
            Err(e) => {
                warn!("Clone tool failed for '{}': {}", params.repo_url, e);
                CallToolResult::error(vec![Content::text(e.to_string())])
            }
        }
    }

    /// Create a Tool model for this tool (metadata).
    pub fn to_tool() -> Tool {
        Tool {
            name: Self::NAME.into(),
            description: Some(Self::DESCRIPTION.into()),
            input_schema: schema_for_type::<RepoCloneParams>().into(),
            annotations: None,
            output_schema: Some(schema_for_type::<CloneOutcome>().into()),
            icons: None,
            meta: None,
            title: None,
        }
    }

    /// Create a ToolRoute for the transport router.
    pub fn create_route<S>(cache: Arc<CacheManager>) -> ToolRoute<S>
    where
        S: Send + Sync + 'static,
    {
        ToolRoute::new_dyn(Self::to_tool(), move |ctx: ToolCallContext<'_, S>| {
            let args = ctx.arguments.clone().unwrap_or_default();
            let cache = cache.clone();
            async move {
                let params: RepoCloneParams =
                    serde_json::from_value(serde_json::Value::Object(args))
                        .map_err(|e| McpError::invalid_params(e.to_string(), None))?;
                Ok(Self::execute(&params, &cache))
            }
            .boxed()
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::CacheConfig;
    use crate::domains::cache::GitEngine;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    struct FakeGit;

    impl GitEngine for FakeGit {
        fn clone_shallow(&self, _url: &str, dest: &Path) -> Result<(), String> {
            fs::create_dir_all(dest.join(".git")).map_err(|e| e.to_string())?;
            Ok(())
        }

        fn pull(&self, _dest: &Path) -> Result<(), String> {
            Ok(())
        }

        fn is_valid_repo(&self, path: &Path) -> bool {
            path.join(".git").exists()
        }
    }

    fn test_cache(base: &Path) -> CacheManager {
        let config = CacheConfig {
            base_path: Some(base.to_path_buf()),
            ..CacheConfig::default()
        };
        CacheManager::with_engine(&config, Arc::new(FakeGit)).unwrap()
    }

    #[test]
    fn test_clone_execute() {
        let dir = TempDir::new().unwrap();
        let cache = test_cache(dir.path());

        let params = RepoCloneParams {
            repo_url: "owner/repo".to_string(),
            force_update: false,
            estimated_size_mb: None,
        };

        let result = RepoCloneTool::execute(&params, &cache);
        assert!(result.is_error.is_none() || !result.is_error.unwrap());

        let structured = result.structured_content.unwrap();
        assert_eq!(structured["action"], "cloned");
        assert_eq!(structured["status"], "available");
    }

    #[test]
    fn test_clone_twice_reports_accessed() {
        let dir = TempDir::new().unwrap();
        let cache = test_cache(dir.path());

        let params = RepoCloneParams {
            repo_url: "owner/repo".to_string(),
            force_update: false,
            estimated_size_mb: None,
        };

        RepoCloneTool::execute(&params, &cache);
        let result = RepoCloneTool::execute(&params, &cache);

        let structured = result.structured_content.unwrap();
        assert_eq!(structured["action"], "accessed");
    }

    #[test]
    fn test_clone_invalid_reference() {
        let dir = TempDir::new().unwrap();
        let cache = test_cache(dir.path());

        let params = RepoCloneParams {
            repo_url: "not a url".to_string(),
            force_update: false,
            estimated_size_mb: None,
        };

        let result = RepoCloneTool::execute(&params, &cache);
        assert!(result.is_error.unwrap_or(false));
    }

    #[test]
    fn test_clone_storage_exceeded() {
        let dir = TempDir::new().unwrap();
        let config = CacheConfig {
            base_path: Some(dir.path().to_path_buf()),
            storage_limit_gb: Some(1.0),
            ..CacheConfig::default()
        };
        let cache = CacheManager::with_engine(&config, Arc::new(FakeGit)).unwrap();

        let params = RepoCloneParams {
            repo_url: "owner/huge".to_string(),
            force_update: false,
            estimated_size_mb: Some(2048),
        };

        let result = RepoCloneTool::execute(&params, &cache);
        assert!(result.is_error.unwrap_or(false));
    }
}
