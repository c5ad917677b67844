//! # Stream Request Planner
//!
//! Boundary adapter between the playback engine's I/O layer and the
//! resolution coordinator. The I/O layer hands over a byte-range read request
//! for a track and receives a concrete fetch instruction back; cache
//! internals stay hidden behind this seam.

use crate::coordinator::ResolutionCoordinator;
use crate::error::Result;
use crate::traits::{ByteRange, FetchInstruction, TrackId};
use std::sync::Arc;
use tracing::instrument;

/// Translates byte-range read requests into fetch instructions.
#[derive(Debug, Clone)]
pub struct StreamRequestPlanner {
    coordinator: Arc<ResolutionCoordinator>,
}

impl StreamRequestPlanner {
    /// Create a planner over a coordinator.
    pub fn new(coordinator: Arc<ResolutionCoordinator>) -> Self {
        Self { coordinator }
    }

    /// Plan one byte-range read.
    ///
    /// Returns either a local-read instruction or a `(URL, sub-range)`
    /// instruction, or a typed error. Never corrupted or truncated bytes.
    #[instrument(skip(self), fields(track_id = %track_id, range = %range))]
    pub async fn plan(&self, track_id: &TrackId, range: ByteRange) -> Result<FetchInstruction> {
        self.coordinator.resolve_range(track_id, range).await
    }

    /// Apply the retry-on-expiry policy after a planned URL failed downstream.
    ///
    /// Returns `true` when the caller should plan the request again.
    pub fn invalidate_resolved(&self, track_id: &TrackId) -> bool {
        self.coordinator.invalidate_resolved(track_id)
    }
}
