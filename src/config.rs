//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.
//! Resolved once at startup and threaded into the components that need it.

use std::env;
use std::path::PathBuf;

/// Default cache entry lifetime: 24 hours.
pub const DEFAULT_TTL_SECONDS: u64 = 86_400;

/// Application directory name used under the platform cache path.
const APP_DIR_NAME: &str = "cedar-mcp";

/// Settings consumed by the search cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// TTL stamped onto every newly written record
    pub ttl_seconds: u64,
    /// Directory holding the SQLite database
    pub cache_directory: PathBuf,
}

impl CacheConfig {
    /// Creates a cache configuration for an explicit directory and TTL.
    pub fn new(cache_directory: impl Into<PathBuf>, ttl_seconds: u64) -> Self {
        Self {
            ttl_seconds,
            cache_directory: cache_directory.into(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: DEFAULT_TTL_SECONDS,
            cache_directory: default_cache_directory(),
        }
    }
}

/// Base URLs of the two remote metadata services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamConfig {
    /// BioPortal REST API root
    pub bioportal_url: String,
    /// CEDAR resource server (templates, instances, search)
    pub cedar_resource_url: String,
    /// CEDAR repository prefix used in template identifiers
    pub cedar_repo_url: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            bioportal_url: "https://data.bioontology.org".to_string(),
            cedar_resource_url: "https://resource.metadatacenter.org".to_string(),
            cedar_repo_url: "https://repo.metadatacenter.org".to_string(),
        }
    }
}

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// CEDAR API key
    pub cedar_api_key: Option<String>,
    /// BioPortal API key
    pub bioportal_api_key: Option<String>,
    /// Search cache settings
    pub cache: CacheConfig,
    /// Remote service endpoints
    pub upstream: UpstreamConfig,
    /// HTTP server port (http transport only)
    pub server_port: u16,
    /// Background sweep interval in seconds, 0 disables it
    pub cleanup_interval: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CEDAR_API_KEY` / `BIOPORTAL_API_KEY` - service credentials
    /// - `CEDAR_MCP_CACHE_DIR` - cache directory (default: platform cache dir)
    /// - `CEDAR_MCP_CACHE_TTL_SECONDS` - record TTL (default: 86400)
    /// - `CEDAR_MCP_SERVER_PORT` - HTTP port (default: 8000)
    /// - `CEDAR_MCP_CLEANUP_INTERVAL` - sweep frequency in seconds (default: 3600)
    /// - `BIOPORTAL_API_URL`, `CEDAR_RESOURCE_URL`, `CEDAR_REPO_URL` - endpoints
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let upstream = defaults.upstream;

        Self {
            cedar_api_key: non_empty_var("CEDAR_API_KEY"),
            bioportal_api_key: non_empty_var("BIOPORTAL_API_KEY"),
            cache: CacheConfig {
                ttl_seconds: parsed_var("CEDAR_MCP_CACHE_TTL_SECONDS")
                    .unwrap_or(DEFAULT_TTL_SECONDS),
                cache_directory: non_empty_var("CEDAR_MCP_CACHE_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.cache.cache_directory),
            },
            upstream: UpstreamConfig {
                bioportal_url: non_empty_var("BIOPORTAL_API_URL")
                    .unwrap_or(upstream.bioportal_url),
                cedar_resource_url: non_empty_var("CEDAR_RESOURCE_URL")
                    .unwrap_or(upstream.cedar_resource_url),
                cedar_repo_url: non_empty_var("CEDAR_REPO_URL").unwrap_or(upstream.cedar_repo_url),
            },
            server_port: parsed_var("CEDAR_MCP_SERVER_PORT").unwrap_or(defaults.server_port),
            cleanup_interval: parsed_var("CEDAR_MCP_CLEANUP_INTERVAL")
                .unwrap_or(defaults.cleanup_interval),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cedar_api_key: None,
            bioportal_api_key: None,
            cache: CacheConfig::default(),
            upstream: UpstreamConfig::default(),
            server_port: 8000,
            cleanup_interval: 3600,
        }
    }
}

/// Platform cache directory for this application.
///
/// `~/.cache/cedar-mcp` on Linux, `~/Library/Caches/cedar-mcp` on macOS,
/// `%LOCALAPPDATA%\cedar-mcp` on Windows.
pub fn default_cache_directory() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join(APP_DIR_NAME)
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parsed_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.cache.ttl_seconds, 86_400);
        assert_eq!(config.server_port, 8000);
        assert_eq!(config.cleanup_interval, 3600);
        assert!(config.cedar_api_key.is_none());
        assert_eq!(config.upstream.bioportal_url, "https://data.bioontology.org");
    }

    #[test]
    fn test_default_cache_directory_is_app_scoped() {
        let dir = default_cache_directory();
        assert!(dir.ends_with(APP_DIR_NAME));
    }

    // Single test touching the environment so parallel tests don't race on it.
    #[test]
    fn test_config_from_env() {
        env::remove_var("CEDAR_MCP_SERVER_PORT");
        env::remove_var("CEDAR_MCP_CLEANUP_INTERVAL");
        env::set_var("CEDAR_MCP_CACHE_TTL_SECONDS", "not-a-number");
        env::set_var("CEDAR_MCP_CACHE_DIR", "/tmp/cedar-mcp-test-cache");

        let config = Config::from_env();
        assert_eq!(config.cache.ttl_seconds, DEFAULT_TTL_SECONDS);
        assert_eq!(
            config.cache.cache_directory,
            PathBuf::from("/tmp/cedar-mcp-test-cache")
        );
        assert_eq!(config.server_port, 8000);

        env::set_var("CEDAR_MCP_CACHE_TTL_SECONDS", " 120 ");
        let config = Config::from_env();
        assert_eq!(config.cache.ttl_seconds, 120);

        env::remove_var("CEDAR_MCP_CACHE_TTL_SECONDS");
        env::remove_var("CEDAR_MCP_CACHE_DIR");
    }
}
