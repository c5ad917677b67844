//! Stream-resolution configuration.

use std::time::Duration;

/// Fixed cap on a single network sub-range fetch.
///
/// Providers' signed URLs may themselves be range-limited, and fetching more
/// than is imminently needed wastes bandwidth when the user may seek away.
pub const DEFAULT_CHUNK_LENGTH: u64 = 512 * 1024;

/// Configuration for the resolution coordinator and its collaborators.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Length of a network-sourced sub-range fetch in bytes (default: 512 KiB).
    /// Never applied to disk-cache reads.
    pub chunk_length: u64,

    /// TCP connect timeout for resolution and media traffic (default: 16s)
    pub connect_timeout: Duration,

    /// Read timeout for resolution and media traffic (default: 8s)
    pub read_timeout: Duration,

    /// Capacity of the recent-resolution cache (default: 2).
    ///
    /// Deliberately tiny: it only needs to cover the track currently playing
    /// and the one immediately previous (rapid skip-back). General caching is
    /// the disk cache's job.
    pub recent_capacity: usize,

    /// What to do when a previously resolved URL fails mid-chunk.
    pub retry_on_expiry: RetryOnExpiry,

    /// User agent sent with resolution and media requests.
    pub user_agent: String,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            chunk_length: DEFAULT_CHUNK_LENGTH,
            connect_timeout: Duration::from_secs(16),
            read_timeout: Duration::from_secs(8),
            recent_capacity: 2,
            retry_on_expiry: RetryOnExpiry::Never,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; rv:91.0) Gecko/20100101 Firefox/91.0"
                .to_string(),
        }
    }
}

impl StreamConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the network sub-range chunk length.
    pub fn with_chunk_length(mut self, bytes: u64) -> Self {
        self.chunk_length = bytes;
        self
    }

    /// Set the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the read timeout.
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Set the recent-resolution cache capacity.
    pub fn with_recent_capacity(mut self, capacity: usize) -> Self {
        self.recent_capacity = capacity;
        self
    }

    /// Set the retry-on-expiry policy.
    pub fn with_retry_on_expiry(mut self, policy: RetryOnExpiry) -> Self {
        self.retry_on_expiry = policy;
        self
    }

    /// Set the user agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.chunk_length == 0 {
            return Err("chunk_length must be greater than 0".to_string());
        }

        if self.recent_capacity == 0 {
            return Err("recent_capacity must be at least 1".to_string());
        }

        if self.connect_timeout.is_zero() || self.read_timeout.is_zero() {
            return Err("timeouts must be greater than 0".to_string());
        }

        if self.user_agent.is_empty() {
            return Err("user_agent cannot be empty".to_string());
        }

        Ok(())
    }
}

/// Policy for a resolved URL that stops working mid-session.
///
/// The provider does not declare an explicit expiry for resolved URLs; they
/// normally live until the recent-resolution cache evicts them. Whether an
/// expired-looking transport error should trigger re-resolution is left to
/// the host rather than guessed here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryOnExpiry {
    /// Surface the failure; the caller decides what to do.
    Never,

    /// Drop the recent-resolution entry so the next request re-resolves.
    ReResolve,
}

impl RetryOnExpiry {
    /// Returns a human-readable description of the policy.
    pub fn description(&self) -> &'static str {
        match self {
            RetryOnExpiry::Never => "Surface URL failures to the caller",
            RetryOnExpiry::ReResolve => "Forget the URL and re-resolve on the next request",
        }
    }
}
