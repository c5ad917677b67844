//! Byte-span bookkeeping for the chunked disk cache.
//!
//! A `SpanSet` records which byte ranges of one track are present on disk.
//! Spans are kept sorted, non-overlapping and coalesced, so a requested range
//! is covered iff it falls inside a single stored span.

use serde::{Deserialize, Serialize};

/// One contiguous cached byte range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSpan {
    /// Start offset in bytes.
    pub offset: u64,
    /// Length in bytes; always greater than zero.
    pub length: u64,
}

impl CacheSpan {
    /// Exclusive end offset.
    pub fn end(&self) -> u64 {
        self.offset + self.length
    }
}

/// Sorted, coalesced set of cached spans for a single track.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanSet {
    spans: Vec<CacheSpan>,
}

impl SpanSet {
    /// An empty span set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `[offset, offset + length)` as cached, merging with any
    /// overlapping or adjacent spans. Re-recording cached bytes is harmless.
    pub fn insert(&mut self, offset: u64, length: u64) {
        if length == 0 {
            return;
        }

        let mut new_offset = offset;
        let mut new_end = offset + length;

        // Drain every span that overlaps or touches the incoming range.
        let mut merged = Vec::with_capacity(self.spans.len() + 1);
        for span in self.spans.drain(..) {
            if span.end() < new_offset || span.offset > new_end {
                merged.push(span);
            } else {
                new_offset = new_offset.min(span.offset);
                new_end = new_end.max(span.end());
            }
        }

        merged.push(CacheSpan {
            offset: new_offset,
            length: new_end - new_offset,
        });
        merged.sort_by_key(|s| s.offset);
        self.spans = merged;
    }

    /// Whether `[offset, offset + length)` is fully covered.
    ///
    /// The check is conservative: partial overlap counts as a miss for the
    /// whole range. Because spans are coalesced, full coverage means the
    /// range sits inside one stored span.
    pub fn covers(&self, offset: u64, length: u64) -> bool {
        if length == 0 {
            return true;
        }
        let end = offset + length;
        self.spans
            .iter()
            .any(|span| span.offset <= offset && span.end() >= end)
    }

    /// Total number of cached bytes.
    pub fn total_bytes(&self) -> u64 {
        self.spans.iter().map(|s| s.length).sum()
    }

    /// The stored spans, sorted by offset.
    pub fn spans(&self) -> &[CacheSpan] {
        &self.spans
    }

    /// Whether nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }
}
