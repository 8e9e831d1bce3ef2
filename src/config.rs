//! Configuration types for discovery runs

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default timeout for a single echo probe in milliseconds
pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 1000;
/// Default number of addresses probed concurrently during a sweep
pub const DEFAULT_BATCH_SIZE: usize = 10;
/// Default look-back window for announced prefixes in hours
pub const DEFAULT_LOOKBACK_HOURS: u64 = 24;
/// Default minimum number of RIS peers that must see a prefix
pub const DEFAULT_MIN_PEERS: u32 = 10;
/// Default timeout for upstream HTTP requests in milliseconds
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 10_000;

/// Configuration for a discovery run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Timeout for each echo probe (default: 1000ms)
    pub probe_timeout: Duration,
    /// Maximum in-flight probes per sweep batch (default: 10)
    pub batch_size: usize,
    /// How far back to look for announced prefixes (default: 24h)
    pub lookback: Duration,
    /// Minimum peer visibility for a prefix to be considered (default: 10)
    pub min_peers: u32,
    /// Timeout for HTTP requests to upstream data sources (default: 10s)
    pub http_timeout: Duration,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            probe_timeout: Duration::from_millis(DEFAULT_PROBE_TIMEOUT_MS),
            batch_size: DEFAULT_BATCH_SIZE,
            lookback: Duration::from_secs(DEFAULT_LOOKBACK_HOURS * 3600),
            min_peers: DEFAULT_MIN_PEERS,
            http_timeout: Duration::from_millis(DEFAULT_HTTP_TIMEOUT_MS),
        }
    }
}

impl DiscoveryConfig {
    /// Create a new DiscoveryConfig builder
    pub fn builder() -> DiscoveryConfigBuilder {
        DiscoveryConfigBuilder::new()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.probe_timeout.is_zero() {
            return Err("probe_timeout must be greater than 0".to_string());
        }
        if self.batch_size < 1 {
            return Err("batch_size must be at least 1".to_string());
        }
        if self.lookback.is_zero() {
            return Err("lookback must be greater than 0".to_string());
        }
        if self.http_timeout.is_zero() {
            return Err("http_timeout must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// Builder for DiscoveryConfig
pub struct DiscoveryConfigBuilder {
    config: DiscoveryConfig,
}

impl DiscoveryConfigBuilder {
    /// Create a new builder with default values
    pub fn new() -> Self {
        Self {
            config: DiscoveryConfig::default(),
        }
    }

    /// Set the per-probe timeout
    pub fn probe_timeout(mut self, timeout: Duration) -> Self {
        self.config.probe_timeout = timeout;
        self
    }

    /// Set the sweep batch size
    pub fn batch_size(mut self, size: usize) -> Self {
        self.config.batch_size = size;
        self
    }

    /// Set the prefix look-back window
    pub fn lookback(mut self, lookback: Duration) -> Self {
        self.config.lookback = lookback;
        self
    }

    /// Set the minimum peer visibility for announced prefixes
    pub fn min_peers(mut self, peers: u32) -> Self {
        self.config.min_peers = peers;
        self
    }

    /// Set the upstream HTTP timeout
    pub fn http_timeout(mut self, timeout: Duration) -> Self {
        self.config.http_timeout = timeout;
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<DiscoveryConfig, String> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for DiscoveryConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
