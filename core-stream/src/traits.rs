//! # Core Stream Traits
//!
//! This module defines the core abstractions for stream resolution. The
//! `MetadataProvider` trait is the seam to the remote catalog service;
//! everything else here is the data model that flows between the resolver,
//! the caches and the coordinator.
//!
//! ## Threading Model
//!
//! Providers are shared behind `Arc<dyn MetadataProvider>` and must be
//! `Send + Sync`; a small, bounded number of read requests may resolve
//! concurrently.

use crate::error::{Result, StreamError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// ============================================================================
// Identifiers and Ranges
// ============================================================================

/// Opaque, stable identifier for a playable audio item.
///
/// The identifier is used verbatim as the cache key in every lookup tier;
/// callers must not derive different keys for the same logical track.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(String);

impl TrackId {
    /// Wrap a raw identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TrackId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for TrackId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for TrackId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A byte range within a track's media stream.
///
/// `length` of `None` means "to end of stream". Unbounded lengths are legal
/// for playback reads but are always clamped to the configured chunk length
/// before a network fetch is issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ByteRange {
    /// Start offset in bytes.
    pub offset: u64,
    /// Length in bytes, or `None` for "to end of stream".
    pub length: Option<u64>,
}

impl ByteRange {
    /// A bounded range `[offset, offset + length)`.
    pub fn new(offset: u64, length: u64) -> Self {
        Self {
            offset,
            length: Some(length),
        }
    }

    /// An unbounded range `[offset, ..)`.
    pub fn to_end(offset: u64) -> Self {
        Self {
            offset,
            length: None,
        }
    }

    /// Exclusive end offset, if bounded.
    pub fn end(&self) -> Option<u64> {
        self.length.map(|len| self.offset + len)
    }

    /// Validate the range for use in a read request.
    pub fn validate(&self) -> Result<()> {
        if self.length == Some(0) {
            return Err(StreamError::InvalidRange(
                "length must be greater than 0".to_string(),
            ));
        }
        if let Some(len) = self.length {
            if self.offset.checked_add(len).is_none() {
                return Err(StreamError::InvalidRange(format!(
                    "offset {} + length {} overflows",
                    self.offset, len
                )));
            }
        }
        Ok(())
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.length {
            Some(len) => write!(f, "[{}, {})", self.offset, self.offset + len),
            None => write!(f, "[{}, ..)", self.offset),
        }
    }
}

// ============================================================================
// Provider Contract
// ============================================================================

/// What the metadata provider reports for a track: a playability status
/// string and the candidate encodings on offer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackMetadata {
    /// Provider-reported status; `"OK"` means streamable.
    pub playability_status: String,
    /// Candidate encodings, each tagged with a format identifier.
    pub formats: Vec<CandidateFormat>,
}

/// One candidate encoding of a track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFormat {
    /// Provider-specific format identifier distinguishing encodings/bitrates.
    pub itag: u32,
    /// Signed media URL; absent when the provider withholds the stream.
    pub url: Option<String>,
}

/// Errors reported by a metadata provider implementation.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Transport failure reaching the provider (DNS, timeout, connect).
    #[error("Network error: {0}")]
    Network(String),

    /// The provider answered with a non-success status code.
    #[error("Provider API error (status {status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body or reason.
        message: String,
    },

    /// The provider's response body could not be parsed.
    #[error("Failed to parse provider response: {0}")]
    Parse(String),
}

impl ProviderError {
    /// Returns `true` if retrying the same call may succeed.
    ///
    /// Server errors and rate limiting count as transient; client errors and
    /// malformed bodies do not.
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::Network(_) => true,
            ProviderError::Api { status, .. } => *status == 429 || (500..600).contains(status),
            ProviderError::Parse(_) => false,
        }
    }
}

/// Async metadata-provider seam.
///
/// Implementations call the remote catalog's player endpoint and translate
/// its wire format into [`TrackMetadata`]. They must enforce the configured
/// connect and read timeouts so a resolution can never block unboundedly.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Fetch playability status and candidate encodings for a track.
    async fn player(&self, track_id: &TrackId) -> std::result::Result<TrackMetadata, ProviderError>;
}

// ============================================================================
// Resolution Outcomes
// ============================================================================

/// A successfully resolved media URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedUrl {
    /// The signed media URL.
    pub url: String,
    /// The format identifier the URL was selected for.
    pub itag: u32,
}

/// Result of one resolution attempt. Exactly one variant is produced per
/// attempt; deduplicated callers all observe the same value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayabilityOutcome {
    /// A playable encoding was selected.
    Success(ResolvedUrl),
    /// The provider could not be reached; retryable.
    NetworkError,
    /// The track cannot be streamed in this session.
    Unplayable(String),
}

/// Concrete fetch instruction handed to the playback engine's I/O layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchInstruction {
    /// The requested range is fully present in the disk cache; read locally.
    ReadFromCache {
        /// The track to read.
        track_id: TrackId,
        /// The range to read. Never clamped to the chunk length.
        range: ByteRange,
    },
    /// Fetch the sub-range from the resolved URL.
    FetchRemote {
        /// The track the bytes belong to (cache key for write-through).
        track_id: TrackId,
        /// The signed media URL.
        url: String,
        /// The sub-range to request, already clamped to the chunk length.
        range: ByteRange,
    },
}
