//! # Recent-Resolution Cache
//!
//! A deliberately tiny, fixed-capacity cache of the last few resolved
//! `(track, url)` pairs. Its only job is to avoid re-resolving the URL for
//! the track currently playing or the one immediately previous during rapid
//! skip-back; general caching belongs to the disk cache.
//!
//! The backing store is an array of optional entries plus a write cursor
//! advancing modulo capacity. Re-inserting a track that already occupies a
//! slot overwrites that slot in place without rotating the cursor; otherwise
//! the currently playing track's URL would be evicted by its own
//! re-resolution.
//!
//! The cache itself is not synchronized; the coordinator guards it with a
//! mutex around each read-modify-write.

use crate::traits::{ResolvedUrl, TrackId};

/// Fixed-capacity, insertion-ordered cache of recently resolved URLs.
#[derive(Debug)]
pub struct RecentResolutionCache {
    slots: Vec<Option<(TrackId, ResolvedUrl)>>,
    cursor: usize,
}

impl RecentResolutionCache {
    /// Create a cache with the given capacity (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: vec![None; capacity],
            cursor: 0,
        }
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Look up the resolved URL for a track, if still cached.
    pub fn get(&self, track_id: &TrackId) -> Option<ResolvedUrl> {
        self.slots.iter().flatten().find_map(|(id, resolved)| {
            if id == track_id {
                Some(resolved.clone())
            } else {
                None
            }
        })
    }

    /// Insert or refresh a resolution.
    ///
    /// If `track_id` already occupies a slot, its URL is overwritten in place
    /// and the cursor does not move. Otherwise the entry lands in the slot at
    /// the cursor (evicting whatever was there) and the cursor advances.
    pub fn put(&mut self, track_id: TrackId, resolved: ResolvedUrl) {
        if let Some(slot) = self
            .slots
            .iter_mut()
            .flatten()
            .find(|(id, _)| *id == track_id)
        {
            slot.1 = resolved;
            return;
        }

        self.slots[self.cursor] = Some((track_id, resolved));
        self.cursor = (self.cursor + 1) % self.slots.len();
    }

    /// Drop the entry for a track, if present.
    ///
    /// Used by the retry-on-expiry policy to force the next request for the
    /// track through a fresh resolution.
    pub fn forget(&mut self, track_id: &TrackId) {
        for slot in self.slots.iter_mut() {
            if matches!(slot, Some((id, _)) if id == track_id) {
                *slot = None;
            }
        }
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    /// Whether no resolutions are cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
