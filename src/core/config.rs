//! Configuration management for the MCP server.
//!
//! This module provides a centralized configuration structure that can be
//! populated from environment variables, configuration files, or defaults.

use super::transport::TransportConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{info, warn};

/// Main configuration structure for the MCP server.
///
/// This struct contains all configurable aspects of the server, organized
/// by domain for clarity and maintainability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server identification and metadata.
    pub server: ServerConfig,

    /// Repository cache configuration.
    pub cache: CacheConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,

    /// Transport configuration.
    pub transport: TransportConfig,
}

/// Server identification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The name of the server as reported to clients.
    pub name: String,

    /// The version of the server.
    pub version: String,
}

/// Configuration for the repository cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Base directory for cloned repositories.
    /// If None, a platform-specific application data directory is used.
    pub base_path: Option<PathBuf>,

    /// Storage budget for the cache in gigabytes.
    /// If None, storage is unlimited.
    pub storage_limit_gb: Option<f64>,

    /// A clone whose last refresh is older than this is considered stale.
    pub update_max_age_hours: f64,

    /// A clone not accessed for longer than this is removed by the startup
    /// sweep. Independent of the update threshold: one clock tracks refresh,
    /// the other tracks reads.
    pub idle_max_age_hours: f64,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "trace").
    pub level: String,

    /// Whether to include timestamps in log output.
    pub with_timestamps: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            base_path: None,
            storage_limit_gb: None,
            update_max_age_hours: 24.0,
            idle_max_age_hours: 48.0,
        }
    }
}

impl CacheConfig {
    /// The effective base directory for clones.
    ///
    /// Falls back to `{data_dir}/repo-clone-mcp/github-repos`, or a path
    /// under the current directory when the platform reports no data dir.
    pub fn resolved_base_path(&self) -> PathBuf {
        if let Some(ref path) = self.base_path {
            return path.clone();
        }
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("repo-clone-mcp")
            .join("github-repos")
    }

    /// The storage limit converted to bytes, if configured.
    pub fn storage_limit_bytes(&self) -> Option<u64> {
        self.storage_limit_gb
            .map(|gb| (gb * 1024.0 * 1024.0 * 1024.0) as u64)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                name: "repo-clone-mcp".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            cache: CacheConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
                with_timestamps: true,
            },
            transport: TransportConfig::default(),
        }
    }
}

impl Config {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables.
    ///
    /// Environment variables are expected to be prefixed with `MCP_`.
    /// For example: `MCP_SERVER_NAME`, `MCP_CACHE_DIR`, `MCP_CACHE_LIMIT_GB`.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let mut config = Self::default();

        if let Ok(name) = std::env::var("MCP_SERVER_NAME") {
            config.server.name = name;
        }

        if let Ok(level) = std::env::var("MCP_LOG_LEVEL") {
            config.logging.level = level;
        }

        if let Ok(dir) = std::env::var("MCP_CACHE_DIR") {
            config.cache.base_path = Some(PathBuf::from(dir));
            info!("Cache directory set to {:?}", config.cache.base_path);
        }

        if let Ok(limit) = std::env::var("MCP_CACHE_LIMIT_GB") {
            match limit.parse::<f64>() {
                Ok(gb) if gb > 0.0 => {
                    config.cache.storage_limit_gb = Some(gb);
                    info!("Cache storage limit set to {} GB", gb);
                }
                _ => warn!("Ignoring invalid MCP_CACHE_LIMIT_GB value: {}", limit),
            }
        } else {
            warn!("MCP_CACHE_LIMIT_GB not set - cache storage is unlimited");
        }

        if let Ok(hours) = std::env::var("MCP_CACHE_UPDATE_MAX_AGE_HOURS") {
            if let Ok(parsed) = hours.parse::<f64>() {
                config.cache.update_max_age_hours = parsed;
            }
        }

        if let Ok(hours) = std::env::var("MCP_CACHE_IDLE_MAX_AGE_HOURS") {
            if let Ok(parsed) = hours.parse::<f64>() {
                config.cache.idle_max_age_hours = parsed;
            }
        }

        // Load transport configuration from environment
        config.transport = TransportConfig::from_env();

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Mutex to ensure env var tests run serially
    static ENV_TEST_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_cache_limit_from_env() {
        let _lock = ENV_TEST_LOCK.lock().unwrap();
        unsafe {
            std::env::set_var("MCP_CACHE_LIMIT_GB", "2.5");
        }
        let config = Config::from_env();
        assert_eq!(config.cache.storage_limit_gb, Some(2.5));
        unsafe {
            std::env::remove_var("MCP_CACHE_LIMIT_GB");
        }
    }

    #[test]
    fn test_invalid_cache_limit_ignored() {
        let _lock = ENV_TEST_LOCK.lock().unwrap();
        unsafe {
            std::env::set_var("MCP_CACHE_LIMIT_GB", "lots");
        }
        let config = Config::from_env();
        assert_eq!(config.cache.storage_limit_gb, None);
        unsafe {
            std::env::remove_var("MCP_CACHE_LIMIT_GB");
        }
    }

    #[test]
    fn test_cache_dir_from_env() {
        let _lock = ENV_TEST_LOCK.lock().unwrap();
        unsafe {
            std::env::set_var("MCP_CACHE_DIR", "/tmp/test-cache");
        }
        let config = Config::from_env();
        assert_eq!(
            config.cache.resolved_base_path(),
            PathBuf::from("/tmp/test-cache")
        );
        unsafe {
            std::env::remove_var("MCP_CACHE_DIR");
        }
    }

    #[test]
    fn test_default_thresholds() {
        let config = CacheConfig::default();
        assert_eq!(config.update_max_age_hours, 24.0);
        assert_eq!(config.idle_max_age_hours, 48.0);
        assert_eq!(config.storage_limit_bytes(), None);
    }

    #[test]
    fn test_storage_limit_bytes_conversion() {
        let config = CacheConfig {
            storage_limit_gb: Some(1.0),
            ..CacheConfig::default()
        };
        assert_eq!(config.storage_limit_bytes(), Some(1024 * 1024 * 1024));
    }
}
