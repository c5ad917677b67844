//! # Stream Error Types
//!
//! Error taxonomy for the stream-resolution and caching layer.
//!
//! The taxonomy deliberately separates transient failures (network) from
//! permanent ones (unplayable tracks), because only the former are worth
//! retrying with the same inputs. Local cache failures are their own kind:
//! the coordinator degrades them to cache misses instead of failing a read.

use thiserror::Error;

/// Errors that can occur while resolving and serving byte-range requests.
#[derive(Error, Debug)]
pub enum StreamError {
    // ========================================================================
    // Resolution Errors
    // ========================================================================
    /// The metadata provider could not be reached. Retryable.
    #[error("Couldn't reach the internet: {0}")]
    Network(String),

    /// The provider reported the track as not streamable, or no playable
    /// encoding was offered. Permanent for this track in this session.
    #[error("Track is not playable: {0}")]
    Unplayable(String),

    // ========================================================================
    // Cache Errors
    // ========================================================================
    /// Local storage failure (permissions, disk full, corruption).
    #[error("Cache I/O error: {0}")]
    CacheIo(#[from] std::io::Error),

    /// The span index sidecar could not be read or written.
    #[error("Cache index error: {0}")]
    CacheIndex(String),

    /// A read was requested for a range the cache does not fully cover.
    #[error("Range not cached for track {track_id}")]
    NotCached {
        /// The track whose range was requested.
        track_id: String,
    },

    // ========================================================================
    // Request Errors
    // ========================================================================
    /// The byte range in a request is malformed.
    #[error("Invalid byte range: {0}")]
    InvalidRange(String),

    /// Internal error (should not occur in normal operation).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl StreamError {
    /// Returns `true` if this error is transient and the same request can be
    /// retried.
    pub fn is_transient(&self) -> bool {
        matches!(self, StreamError::Network(_))
    }

    /// Returns `true` if this error is due to network issues.
    pub fn is_network_error(&self) -> bool {
        matches!(self, StreamError::Network(_))
    }

    /// Returns `true` if this error came from the local cache rather than the
    /// network or the provider.
    pub fn is_cache_error(&self) -> bool {
        matches!(
            self,
            StreamError::CacheIo(_) | StreamError::CacheIndex(_) | StreamError::NotCached { .. }
        )
    }
}

/// Result type for stream operations.
pub type Result<T> = std::result::Result<T, StreamError>;
