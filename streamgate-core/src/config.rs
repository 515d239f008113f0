//! Centralized configuration for Streamgate.
//!
//! All tunable parameters and settings are defined here to avoid
//! hard-coded values scattered throughout the codebase.

use std::time::Duration;

/// Central configuration for all Streamgate components.
///
/// Groups related configuration settings into logical sections.
#[derive(Debug, Clone, Default)]
pub struct StreamgateConfig {
    pub gateway: GatewayConfig,
    pub network: NetworkConfig,
    pub pool: PoolConfig,
}

/// Streaming gateway configuration.
///
/// Controls chunk fetch sizing and metadata caching behavior.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Fixed size of remote chunk fetches in bytes
    pub chunk_size: u64,
    /// Maximum resolved-metadata entries cached per session
    pub resolved_cache_entries: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1_048_576, // 1 MiB
            resolved_cache_entries: 256,
        }
    }
}

/// Network communication configuration for the upstream proxy.
///
/// Controls HTTP client timeouts and request identification for
/// third-party passthrough fetches.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Timeout for upstream HTTP requests
    pub upstream_timeout: Duration,
    /// User agent presented to upstream servers
    pub user_agent: &'static str,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            upstream_timeout: Duration::from_secs(10),
            user_agent: "Mozilla/5.0",
        }
    }
}

/// Backend session pool configuration.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Number of backend sessions created at startup
    pub session_count: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self { session_count: 4 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_chunk_size_is_one_mebibyte() {
        let config = StreamgateConfig::default();
        assert_eq!(config.gateway.chunk_size, 1024 * 1024);
    }

    #[test]
    fn test_default_pool_has_sessions() {
        let config = StreamgateConfig::default();
        assert!(config.pool.session_count > 0);
    }
}
