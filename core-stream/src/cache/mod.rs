//! # Chunked Disk Cache Module
//!
//! Persistent byte-range cache for media streams.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────┐
//! │     ChunkedDiskCache                   │
//! │  - is_cached()                         │
//! │  - open_for_read()                     │
//! │  - write()                             │
//! └────────┬───────────────────────────────┘
//!          │
//!          ├──> SpanSet        (coverage bookkeeping)
//!          ├──> <track>.bin    (bytes at stream offsets)
//!          └──> <track>.json   (persisted span index)
//! ```
//!
//! The default configuration never evicts; a size bound opts into
//! least-recently-written whole-track eviction.

pub mod config;
pub mod spans;
pub mod stats;
pub mod store;

// Re-export commonly used types
pub use config::CacheConfig;
pub use spans::{CacheSpan, SpanSet};
pub use stats::CacheStats;
pub use store::ChunkedDiskCache;
