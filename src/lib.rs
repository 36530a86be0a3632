//! Repository Clone MCP Server Library
//!
//! This crate provides a Model Context Protocol (MCP) server that clones
//! GitHub repositories locally and offers filesystem-like navigation over
//! the clones, eliminating API rate limits for read-heavy workloads.
//!
//! # Architecture
//!
//! The server is organized into the following modules:
//!
//! - **core**: Core infrastructure including configuration, error handling, and the main server
//! - **domains**: Business logic organized by bounded contexts
//!   - **cache**: The repository cache manager (clone-on-demand, staleness
//!     detection, storage-bounded eviction)
//!   - **tools**: MCP tools that can be executed by clients
//!   - **resources**: Data resources that can be read by clients
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use repo_clone_mcp_server::core::{Config, McpServer};
//! use repo_clone_mcp_server::domains::cache::CacheManager;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env();
//!     let cache = Arc::new(CacheManager::new(&config.cache)?);
//!     let server = McpServer::new(config, cache);
//!     // Start the server...
//!     Ok(())
//! }
//! ```

pub mod core;
pub mod domains;

// Re-export commonly used types for convenience
pub use core::{Config, Error, McpServer, Result};
pub use domains::cache::CacheManager;
