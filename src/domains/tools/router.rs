//! Tool Router - builds the rmcp ToolRouter from the tool definitions.
//!
//! Each tool knows how to create its own route; this module only wires them
//! together with the shared cache manager.

use std::sync::Arc;

use rmcp::handler::server::tool::ToolRouter;

use crate::domains::cache::CacheManager;

use super::definitions::{
    CacheUsageTool, RepoCloneTool, RepoGlobTool, RepoGrepTool, RepoReadTool, RepoStatusTool,
};

/// Build the tool router with all registered tools.
pub fn build_tool_router<S>(cache: Arc<CacheManager>) -> ToolRouter<S>
where
    S: Send + Sync + 'static,
{
    ToolRouter::new()
        .with_route(CacheUsageTool::create_route(cache.clone()))
        .with_route(RepoCloneTool::create_route(cache.clone()))
        .with_route(RepoGlobTool::create_route(cache.clone()))
        .with_route(RepoGrepTool::create_route(cache.clone()))
        .with_route(RepoReadTool::create_route(cache.clone()))
        .with_route(RepoStatusTool::create_route(cache))
}
