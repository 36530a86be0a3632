//! MCP Server Entry Point
//!
//! This is the main entry point for the MCP server. It initializes logging,
//! loads configuration, builds the repository cache manager, sweeps idle
//! clones left over from previous runs, and starts the server with the
//! configured transport.

use anyhow::Result;
use std::sync::Arc;
use tracing::{Level, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use repo_clone_mcp_server::core::{Config, McpServer, TransportService};
use repo_clone_mcp_server::domains::cache::CacheManager;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration from environment
    let config = Config::from_env();

    // Initialize logging
    init_logging(&config.logging.level);

    info!("Starting {} v{}", config.server.name, config.server.version);

    // Build the cache manager (creates the base directory if absent)
    let cache = Arc::new(CacheManager::new(&config.cache)?);
    info!("Repository cache at {}", cache.base_path().display());

    // Remove repositories left idle since previous runs. Each invocation is
    // a short-lived process, so the sweep runs once at startup rather than
    // on a timer.
    let report = cache.sweep_idle();
    if !report.removed.is_empty() {
        info!(
            "Startup sweep removed {} idle repositories",
            report.removed.len()
        );
    }
    for failure in &report.failures {
        warn!(
            "Startup sweep could not remove {}: {}",
            failure.path.display(),
            failure.reason
        );
    }

    // Create the MCP server
    let server = McpServer::new(config.clone(), cache);

    info!("Server initialized");

    // Create and run the transport service
    let transport = TransportService::new(config.transport);
    transport.run(server).await?;

    info!("Server shutting down");

    Ok(())
}

/// Initialize the logging subsystem.
///
/// Configures tracing with the specified log level and format. Logs go to
/// stderr; stdout belongs to the MCP transport.
fn init_logging(level: &str) {
    let level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .init();
}
