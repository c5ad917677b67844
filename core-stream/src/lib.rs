//! # Core Stream
//!
//! Stream-resolution and chunked-caching layer for the streaming core. Given
//! an opaque track identifier and a byte-range read request, this crate
//! decides whether to serve from the persistent disk cache, a tiny cache of
//! recently resolved URLs, or a fresh (deduplicated) network resolution, and
//! produces a concrete fetch instruction for the playback engine's I/O layer.

pub mod cache;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod planner;
pub mod recent;
pub mod resolver;
pub mod traits;

#[cfg(feature = "http-fetch")]
pub mod fetch;

pub use cache::{CacheConfig, CacheStats, ChunkedDiskCache};
pub use config::{RetryOnExpiry, StreamConfig, DEFAULT_CHUNK_LENGTH};
pub use coordinator::ResolutionCoordinator;
pub use error::{Result, StreamError};
pub use planner::StreamRequestPlanner;
pub use recent::RecentResolutionCache;
pub use resolver::StreamResolver;
pub use traits::{
    ByteRange, CandidateFormat, FetchInstruction, MetadataProvider, PlayabilityOutcome,
    ProviderError, ResolvedUrl, TrackId, TrackMetadata,
};

#[cfg(feature = "http-fetch")]
pub use fetch::ChunkFetcher;
