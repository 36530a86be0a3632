//! Repository content search tool definition.
//!
//! Searches file contents in a cloned repository with a regular expression.

use futures::FutureExt;
use globset::Glob;
use regex::Regex;
use rmcp::{
    ErrorData as McpError,
    handler::server::tool::{ToolCallContext, ToolRoute, cached_schema_for_type},
    model::{CallToolResult, Content, Tool},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fs;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use walkdir::WalkDir;

use super::common::{is_hidden, require_cloned};
use crate::core::security::resolve_repo_path;
use crate::domains::cache::CacheManager;

// ============================================================================
// Tool Parameters
// ============================================================================

/// Parameters for the content search tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct RepoGrepParams {
    /// GitHub repository URL or 'owner/repo' shorthand.
    pub repo_url: String,

    /// Regular expression pattern to search for.
    pub pattern: String,

    /// Glob filter on repository-relative paths (e.g., '*.rs').
    pub include: Option<String>,

    /// Directory within the repository to search (defaults to the root).
    pub path: Option<String>,
}

/// A single matching line
#[derive(Debug, Serialize, JsonSchema)]
struct GrepMatch {
    /// Repository-relative file path
    file: String,
    /// 1-indexed line number
    line: usize,
    /// The matching line, trimmed
    content: String,
    /// The matched fragment
    matched: String,
}

/// Result of a content search
#[derive(Debug, Serialize, JsonSchema)]
struct GrepOutcome {
    repo_url: String,
    pattern: String,
    matches: Vec<GrepMatch>,
    total_matches: usize,
    files_searched: usize,
}

// ============================================================================
// Tool Definition
// ============================================================================

/// Grep tool - searches for patterns in repository files.
pub struct RepoGrepTool;

impl RepoGrepTool {
    /// Tool name as registered in MCP.
    pub const NAME: &'static str = "repo_grep";

    /// Tool description shown to clients.
    pub const DESCRIPTION: &'static str = "Search for a regular expression in the files of a cloned repository. Hidden files and binary content are skipped; an optional glob filters which files are searched.";

    /// Execute the tool logic.
    #[instrument(skip_all, fields(repo_url = %params.repo_url, pattern = %params.pattern))]
    pub fn execute(params: &RepoGrepParams, cache: &CacheManager) -> CallToolResult {
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

        let regex = match Regex::new(&params.pattern) {
            Ok(r) => r,
            Err(e) => {
                return CallToolResult::error(vec![Content::text(format!(
                    "Invalid regex pattern: {}",
                    e
                ))]);
            }
        };

        // `*` crosses directory separators here, matching the loose filter
        // semantics clients expect from an include pattern.
        let include = match params.include.as_deref().map(Glob::new) {
            Some(Ok(glob)) => Some(glob.compile_matcher()),
            Some(Err(e)) => {
                return CallToolResult::error(vec![Content::text(format!(
                    "Invalid include pattern: {}",
                    e
                ))]);
            }
            None => None,
        };

        let mut matches = Vec::new();
        let mut files_searched = 0;

        for entry in WalkDir::new(&search_path)
            .follow_links(false)
            .into_iter()
            .flatten()
        {
            if !entry.file_type().is_file() {
                continue;
            }

            let Ok(relative) = entry.path().strip_prefix(&repo_path) else {
                continue;
            };
            if is_hidden(relative) {
                continue;
            }
            if let Some(ref matcher) = include {
                if !matcher.is_match(relative) {
                    continue;
                }
            }

            // Skip binary files.
            let Ok(bytes) = fs::read(entry.path()) else {
                continue;
            };
            let Ok(content) = String::from_utf8(bytes) else {
                continue;
            };

            files_searched += 1;

            for (index, line) in content.lines().enumerate() {
                if let Some(found) = regex.find(line) {
                    matches.push(GrepMatch {
                        file: relative.display().to_string(),
                        line: index + 1,
                        content: line.trim().to_string(),
                        matched: found.as_str().to_string(),
                    });
                }
            }
        }

        info!(
            "Found {} matches across {} files for '{}'",
            matches.len(),
            files_searched,
            params.pattern
        );

        let outcome = GrepOutcome {
            repo_url: params.repo_url.clone(),
            pattern: params.pattern.clone(),
            total_matches: matches.len(),
            files_searched,
            matches,
        };

        let summary = format!(
            "{} matches in {} files searched",
            outcome.total_matches, outcome.files_searched
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
            input_schema: cached_schema_for_type::<RepoGrepParams>(),
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
                let params: RepoGrepParams =
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
