//! Repository file read tool definition.
//!
//! Reads a line range from a file inside a cloned repository.

use futures::FutureExt;
use rmcp::{
    ErrorData as McpError,
    handler::server::tool::{ToolCallContext, ToolRoute, cached_schema_for_type},
    model::{CallToolResult, Content, Tool},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fs;
use std::sync::Arc;
use tracing::{instrument, warn};

use super::common::require_cloned;
use crate::core::security::resolve_repo_path;
use crate::domains::cache::CacheManager;

// ============================================================================
// Tool Parameters
// ============================================================================

/// Parameters for the file read tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct RepoReadParams {
    /// GitHub repository URL or 'owner/repo' shorthand.
    pub repo_url: String,

    /// Path to the file within the repository.
    pub file_path: String,

    /// Starting line number (1-indexed).
    #[serde(default = "default_start_line")]
    pub start_line: usize,

    /// Number of lines to read (all remaining lines if omitted).
    pub num_lines: Option<usize>,
}

fn default_start_line() -> usize {
    1
}

/// Result of a file read
#[derive(Debug, Serialize, JsonSchema)]
struct ReadOutcome {
    repo_url: String,
    file_path: String,
    content: String,
    start_line: usize,
    end_line: usize,
    total_lines: usize,
}

// ============================================================================
// Tool Definition
// ============================================================================

/// Read tool - reads file contents from a cloned repository.
pub struct RepoReadTool;

impl RepoReadTool {
    /// Tool name as registered in MCP.
    pub const NAME: &'static str = "repo_read";

    /// Tool description shown to clients.
    pub const DESCRIPTION: &'static str = "Read file contents from a cloned repository, optionally limited to a line range. The repository must be cloned with repo_clone first.";

    /// Execute the tool logic.
    #[instrument(skip_all, fields(repo_url = %params.repo_url, file_path = %params.file_path))]
    pub fn execute(params: &RepoReadParams, cache: &CacheManager) -> CallToolResult {
        let repo_path = match require_cloned(cache, &params.repo_url) {
            Ok(p) => p,
            Err(result) => return result,
        };

        let file_path = match resolve_repo_path(&repo_path, &params.file_path) {
            Ok(p) => p,
            Err(e) => {
                warn!("Path validation failed: {}", e);
                return CallToolResult::error(vec![Content::text(e.to_string())]);
            }
        };

        if !file_path.is_file() {
            return CallToolResult::error(vec![Content::text(format!(
                "Path '{}' is not a file",
                params.file_path
            ))]);
        }

        let bytes = match fs::read(&file_path) {
            Ok(b) => b,
            Err(e) => {
                warn!("Failed to read '{}': {}", params.file_path, e);
                return CallToolResult::error(vec![Content::text(format!(
                    "Failed to read '{}': {}",
                    params.file_path, e
                ))]);
            }
        };

        // Non-UTF-8 content degrades per character rather than failing the read.
        let text = String::from_utf8_lossy(&bytes);
        let all_lines: Vec<&str> = text.lines().collect();
        let total_lines = all_lines.len();

        let start_line = params.start_line.max(1);
        if start_line > total_lines {
            return CallToolResult::error(vec![Content::text(format!(
                "Start line {} exceeds file length ({} lines)",
                start_line, total_lines
            ))]);
        }

        let end_line = match params.num_lines {
            Some(n) => (start_line + n - 1).min(total_lines),
            None => total_lines,
        };

        let mut content = all_lines[start_line - 1..end_line].join("\n");
        if end_line > start_line - 1 {
            content.push('\n');
        }

        let outcome = ReadOutcome {
            repo_url: params.repo_url.clone(),
            file_path: params.file_path.clone(),
            start_line,
            end_line,
            total_lines,
            content,
        };

        let summary = format!(
            "{} (lines {}-{} of {})\n\n{}",
            params.file_path, start_line, end_line, total_lines, outcome.content
        );

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
            input_schema: cached_schema_for_type::<RepoReadParams>(),
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
                let params: RepoReadParams =
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
