//! Cache usage tool definition.
//!
//! Reports total cache storage usage, the configured limit, and a per-entry
//! breakdown.

use futures::FutureExt;
use rmcp::{
    ErrorData as McpError,
    handler::server::tool::{ToolCallContext, ToolRoute, schema_for_type},
    model::{CallToolResult, Content, Tool},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;

use super::repo::common::{format_size, iso_timestamp};
use crate::domains::cache::CacheManager;

// ============================================================================
// Tool Parameters
// ============================================================================

/// Parameters for the cache usage tool (none).
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct CacheUsageParams {}

/// One cached repository in the breakdown
#[derive(Debug, Serialize, JsonSchema)]
struct UsageEntry {
    /// Directory name under the cache base
    name: String,
    size_bytes: u64,
    size_human: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_access_iso: Option<String>,
}

/// Result of a usage request
#[derive(Debug, Serialize, JsonSchema)]
struct UsageOutcome {
    base_path: String,
    total_bytes: u64,
    total_human: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    limit_bytes: Option<u64>,
    entry_count: usize,
    entries: Vec<UsageEntry>,
}

// ============================================================================
// Tool Definition
// ============================================================================

/// Cache usage tool - reports storage used by cached repositories.
pub struct CacheUsageTool;

impl CacheUsageTool {
    /// Tool name as registered in MCP.
    pub const NAME: &'static str = "cache_usage";

    /// Tool description shown to clients.
    pub const DESCRIPTION: &'static str = "Report total storage used by the repository cache, the configured limit, and a per-repository breakdown.";

    /// Execute the tool logic.
    #[instrument(skip_all)]
    pub fn execute(_params: &CacheUsageParams, cache: &CacheManager) -> CallToolResult {
        let mut entries: Vec<UsageEntry> = cache
            .entries()
            .into_iter()
            .map(|e| UsageEntry {
                name: e.name,
                size_bytes: e.size_bytes,
                size_human: format_size(e.size_bytes),
                last_access_iso: e.metadata.and_then(|m| iso_timestamp(m.last_access)),
            })
            .collect();
        entries.sort_by(|a, b| b.size_bytes.cmp(&a.size_bytes));

        let total_bytes = cache.usage_bytes();

        let outcome = UsageOutcome {
            base_path: cache.base_path().display().to_string(),
            total_bytes,
            total_human: format_size(total_bytes),
            limit_bytes: cache.storage_limit_bytes(),
            entry_count: entries.len(),
            entries,
        };

        let summary = match outcome.limit_bytes {
            Some(limit) => format!(
                "Cache: {} used of {} limit across {} repositories",
                outcome.total_human,
                format_size(limit),
                outcome.entry_count
            ),
            None => format!(
                "Cache: {} used across {} repositories (no limit)",
                outcome.total_human, outcome.entry_count
            ),
        };

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
            input_schema: schema_for_type::<CacheUsageParams>().into(),
            annotations: None,
            output_schema: Some(schema_for_type::<UsageOutcome>().into()),
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
                let params: CacheUsageParams =
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
