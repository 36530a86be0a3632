//! Repository file finding tool definition.
//!
//! Finds files matching a glob pattern in a cloned repository.

use futures::FutureExt;
use globset::GlobBuilder;
use rmcp::{
    ErrorData as McpError,
    handler::server::tool::{ToolCallContext, ToolRoute, cached_schema_for_type},
    model::{CallToolResult, Content, Tool},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::UNIX_EPOCH;
use tracing::{info, instrument, warn};
use walkdir::WalkDir;

use super::common::{is_hidden, require_cloned};
use crate::core::security::resolve_repo_path;
use crate::domains::cache::CacheManager;

// ============================================================================
// Tool Parameters
// ============================================================================

/// Parameters for the file finding tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct RepoGlobParams {
    /// GitHub repository URL or 'owner/repo' shorthand.
    pub repo_url: String,

    /// Glob pattern to match files (e.g., '*.md' for the top level,
    /// '**/*.rs' for the whole tree).
    pub pattern: String,

    /// Directory within the repository to search (defaults to the root).
    pub path: Option<String>,
}

/// A matched file
#[derive(Debug, Serialize, JsonSchema)]
struct GlobEntry {
    /// Path relative to the search directory
    path: String,
    /// File size in bytes
    size: u64,
    /// Modification time in seconds since the epoch
    modified: f64,
}

/// Result of a file finding request
#[derive(Debug, Serialize, JsonSchema)]
struct GlobOutcome {
    repo_url: String,
    pattern: String,
    files: Vec<GlobEntry>,
    total_files: usize,
}

// ============================================================================
// Tool Definition
// ============================================================================

/// Glob tool - finds files matching patterns in a cloned repository.
pub struct RepoGlobTool;

impl RepoGlobTool {
    /// Tool name as registered in MCP.
    pub const NAME: &'static str = "repo_glob";

    /// Tool description shown to clients.
    pub const DESCRIPTION: &'static str = "Find files matching a glob pattern in a cloned repository. Use '**/' for recursive matching; hidden files are skipped.";

    /// Execute the tool logic.
    #[instrument(skip_all, fields(repo_url = %params.repo_url, pattern = %params.pattern))]
    pub fn execute(params: &RepoGlobParams, cache: &CacheManager) -> CallToolResult {
        let repo_path = match require_cloned(cache, &params.repo_url) {
            Ok(p) => p,
            Err(result) => return result,
        };

        let search_path = match params.path.as_deref() {
            Some(sub) => match resolve_repo_path(&repo_path, sub) {
                Ok(p) => p,
                Err(e) => {
                    warn!("Search path validation failed: {}", e);
                    return CallToolResult::error(vec![Content::text(e.to_string())]);
                }
            },
            None => repo_path.clone(),
        };

        // `*` stays within one path segment so that '*.md' means the top
        // level and '**/*.md' means the whole tree.
        let matcher = match GlobBuilder::new(&params.pattern)
            .literal_separator(true)
            .build()
        {
            Ok(glob) => glob.compile_matcher(),
            Err(e) => {
                return CallToolResult::error(vec![Content::text(format!(
                    "Invalid glob pattern: {}",
                    e
                ))]);
            }
        };

        let mut files = Vec::new();

        for entry in WalkDir::new(&search_path)
            .follow_links(false)
            .into_iter()
            .flatten()
        {
            if !entry.file_type().is_file() {
                continue;
            }

            let Ok(repo_relative) = entry.path().strip_prefix(&repo_path) else {
                continue;
            };
            if is_hidden(repo_relative) {
                continue;
            }

            let Ok(relative) = entry.path().strip_prefix(&search_path) else {
                continue;
            };
            if !matcher.is_match(relative) {
                continue;
            }

            let Ok(meta) = entry.metadata() else {
                continue;
            };
            let modified = meta
                .modified()
                .ok()
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_secs_f64())
                .unwrap_or(0.0);

            files.push(GlobEntry {
                path: relative.display().to_string(),
                size: meta.len(),
                modified,
            });
        }

        files.sort_by(|a, b| a.path.cmp(&b.path));

        info!("Found {} files for '{}'", files.len(), params.pattern);

        let outcome = GlobOutcome {
            repo_url: params.repo_url.clone(),
            pattern: params.pattern.clone(),
            total_files: files.len(),
            files,
        };

        let summary = format!("{} files match '{}'", outcome.total_files, params.pattern);

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
            input_schema: cached_schema_for_type::<RepoGlobParams>(),
            annotations: None,
            output_schema: None,
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
                let params: RepoGlobParams =
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
