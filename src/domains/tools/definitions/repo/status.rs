//! Repository status tool definition.
//!
//! Reports whether a repository is cloned, cloning, or absent, along with
//! its metadata timestamps and on-disk size.

use futures::FutureExt;
use rmcp::{
    ErrorData as McpError,
    handler::server::tool::{ToolCallContext, ToolRoute, schema_for_type},
    model::{CallToolResult, Content, Tool},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{instrument, warn};

use super::common::{format_size, iso_timestamp};
use crate::domains::cache::{CacheManager, RepoState};

// ============================================================================
// Tool Parameters
// ============================================================================

/// Parameters for the status tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct RepoStatusParams {
    /// GitHub repository URL or 'owner/repo' shorthand.
    pub repo_url: String,
}

/// Metadata timestamps for a cloned repository
#[derive(Debug, Serialize, JsonSchema)]
struct StatusTimestamps {
    last_access: f64,
    created: f64,
    last_updated: f64,
    last_access_iso: Option<String>,
    last_updated_iso: Option<String>,
}

/// Result of a status request
#[derive(Debug, Serialize, JsonSchema)]
struct StatusOutcome {
    repo_url: String,
    /// "available", "cloning", or "not_cloned"
    status: String,
    local_path: String,
    cloned: bool,
    cloning: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    size_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    size_human: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<StatusTimestamps>,
}

// ============================================================================
// Tool Definition
// ============================================================================

/// Status tool - checks repository clone status and metadata.
pub struct RepoStatusTool;

impl RepoStatusTool {
    /// Tool name as registered in MCP.
    pub const NAME: &'static str = "repo_status";

    /// Tool description shown to clients.
    pub const DESCRIPTION: &'static str =
        "Check whether a repository is cloned locally, along with its metadata and on-disk size.";

    /// Execute the tool logic.
    #[instrument(skip_all, fields(repo_url = %params.repo_url))]
    pub fn execute(params: &RepoStatusParams, cache: &CacheManager) -> CallToolResult {
        let local_path = match cache.local_path(&params.repo_url) {
            Ok(p) => p,
            Err(e) => {
                warn!("Status lookup failed: {}", e);
                return CallToolResult::error(vec![Content::text(e.to_string())]);
            }
        };

        let state = match cache.lookup(&params.repo_url) {
            Ok(s) => s,
            Err(e) => {
                return CallToolResult::error(vec![Content::text(e.to_string())]);
            }
        };

        let outcome = match state {
            RepoState::Found(info) => {
                cache.record_access(&info.path);
                let metadata = info.metadata.map(|m| StatusTimestamps {
                    last_access: m.last_access,
                    created: m.created,
                    last_updated: m.last_updated,
                    last_access_iso: iso_timestamp(m.last_access),
                    last_updated_iso: iso_timestamp(m.last_updated),
                });
                StatusOutcome {
                    repo_url: params.repo_url.clone(),
                    status: "available".to_string(),
                    local_path: local_path.display().to_string(),
                    cloned: true,
                    cloning: false,
                    size_bytes: Some(info.size_bytes),
                    size_human: Some(format_size(info.size_bytes)),
                    metadata,
                }
            }
            RepoState::Busy => StatusOutcome {
                repo_url: params.repo_url.clone(),
                status: "cloning".to_string(),
                local_path: local_path.display().to_string(),
                cloned: false,
                cloning: true,
                size_bytes: None,
                size_human: None,
                metadata: None,
            },
            RepoState::NotFound => StatusOutcome {
                repo_url: params.repo_url.clone(),
                status: "not_cloned".to_string(),
                local_path: local_path.display().to_string(),
                cloned: false,
                cloning: false,
                size_bytes: None,
                size_human: None,
                metadata: None,
            },
        };

        let summary = format!("Repository '{}' is {}", params.repo_url, outcome.status);

        CallToolResult {
            content: vec![Content::text(summary)],
            structured_content: serde_json::to_value(&outcome).ok(),
            is_error: Some(false),
            meta: None,
        }
    }

    /// Create a Tool model for this tool (metadata).
    pub fn to_tool() -> Tool {
        Tool {
            name: Self::NAME.into(),
            description: Some(Self::DESCRIPTION.into()),
            input_schema: schema_for_type::<RepoStatusParams>().into(),
            annotations: None,
            output_schema: Some(schema_for_type::<StatusOutcome>().into()),
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
                let params: RepoStatusParams =
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
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn test_cache(base: &Path) -> CacheManager {
        let config = CacheConfig {
            base_path: Some(base.to_path_buf()),
            ..CacheConfig::default()
        };
        CacheManager::new(&config).unwrap()
    }

    #[test]
    fn test_status_not_cloned() {
        let dir = TempDir::new().unwrap();
        let cache = test_cache(dir.path());

        let params = RepoStatusParams {
            repo_url: "owner/repo".to_string(),
        };
        let result = RepoStatusTool::execute(&params, &cache);
        let structured = result.structured_content.unwrap();
        assert_eq!(structured["status"], "not_cloned");
        assert_eq!(structured["cloned"], false);
    }

    #[test]
    fn test_status_available_with_metadata() {
        let dir = TempDir::new().unwrap();
        let cache = test_cache(dir.path());

        let path = cache.local_path("owner/repo").unwrap();
        fs::create_dir_all(path.join(".git")).unwrap();
        fs::write(path.join("file.txt"), "content").unwrap();
        cache.record_access(&path);

        let params = RepoStatusParams {
            repo_url: "owner/repo".to_string(),
        };
        let result = RepoStatusTool::execute(&params, &cache);
        let structured = result.structured_content.unwrap();
        assert_eq!(structured["status"], "available");
        assert_eq!(structured["cloned"], true);
        assert!(structured["size_bytes"].as_u64().unwrap() > 0);
        assert!(structured["metadata"]["last_access"].as_f64().unwrap() > 0.0);
    }

    #[test]
    fn test_status_invalid_reference() {
        let dir = TempDir::new().unwrap();
        let cache = test_cache(dir.path());

        let params = RepoStatusParams {
            repo_url: "not a url".to_string(),
        };
        let result = RepoStatusTool::execute(&params, &cache);
        assert!(result.is_error.unwrap_or(false));
    }
}
