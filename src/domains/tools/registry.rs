//! Tool Registry - central registration for all tools.
//!
//! This module provides:
//! - A registry of all available tools
//! - Tool metadata for listing

use rmcp::model::Tool;

use super::definitions::{
    CacheUsageTool, RepoCloneTool, RepoGlobTool, RepoGrepTool, RepoReadTool, RepoStatusTool,
};

// ============================================================================
// Tool Registry
// ============================================================================

/// Tool registry - manages all available tools.
///
/// This struct provides a central point for listing all available tools;
/// the router in `router.rs` must stay in sync with it.
pub struct ToolRegistry;

impl ToolRegistry {
    /// Get all tool names.
    pub fn tool_names() -> Vec<&'static str> {
        vec![
            CacheUsageTool::NAME,
            RepoCloneTool::NAME,
            RepoGlobTool::NAME,
            RepoGrepTool::NAME,
            RepoReadTool::NAME,
            RepoStatusTool::NAME,
        ]
    }

    /// Get all tools as Tool models (metadata).
    ///
    /// This is the single source of truth for all available tools.
    pub fn get_all_tools() -> Vec<Tool> {
        vec![
            CacheUsageTool::to_tool(),
            RepoCloneTool::to_tool(),
            RepoGlobTool::to_tool(),
            RepoGrepTool::to_tool(),
            RepoReadTool::to_tool(),
            RepoStatusTool::to_tool(),
        ]
    }
}
