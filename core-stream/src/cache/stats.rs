//! Cache statistics

use serde::Serialize;

/// Point-in-time snapshot of disk-cache activity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Number of tracks with at least one cached span.
    pub tracks: usize,
    /// Total cached bytes across all tracks.
    pub total_bytes: u64,
    /// Presence checks answered from disk.
    pub hits: u64,
    /// Presence checks that fell through to the network tiers.
    pub misses: u64,
    /// Number of successful write operations.
    pub writes: u64,
    /// Tracks evicted under storage pressure.
    pub evictions: u64,
}

impl CacheStats {
    /// Fraction of presence checks answered from disk, or `None` before any
    /// lookups happened.
    pub fn hit_ratio(&self) -> Option<f64> {
        let total = self.hits + self.misses;
        if total == 0 {
            None
        } else {
            Some(self.hits as f64 / total as f64)
        }
    }
}
