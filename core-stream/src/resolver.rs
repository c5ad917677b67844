//! # Stream Resolver
//!
//! Calls the metadata provider for a track, selects a playable encoding and
//! maps provider failures into the layer's playability taxonomy.
//!
//! The resolver owns no cache state; the coordinator decides what to do with
//! an outcome.

use crate::traits::{MetadataProvider, PlayabilityOutcome, ResolvedUrl, TrackId};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Playability status reported by the provider for a streamable track.
const PLAYABLE_STATUS_OK: &str = "OK";

/// Format identifiers in preference order. 251 is the higher-quality Opus
/// encoding; 140 is the AAC fallback.
const PREFERRED_ITAGS: [u32; 2] = [251, 140];

/// Resolves a track identifier into a playable media URL.
pub struct StreamResolver {
    provider: Arc<dyn MetadataProvider>,
}

impl StreamResolver {
    /// Create a resolver over the given metadata provider.
    pub fn new(provider: Arc<dyn MetadataProvider>) -> Self {
        Self { provider }
    }

    /// Resolve a track to a playable URL.
    ///
    /// Exactly one [`PlayabilityOutcome`] is produced per attempt:
    /// - transport failures map to [`PlayabilityOutcome::NetworkError`];
    /// - a non-`"OK"` playability status, or the absence of any preferred
    ///   encoding, maps to [`PlayabilityOutcome::Unplayable`] with the
    ///   provider's status string for diagnostics;
    /// - otherwise the first URL in preference order (251, then 140) wins.
    #[instrument(skip(self), fields(track_id = %track_id))]
    pub async fn resolve(&self, track_id: &TrackId) -> PlayabilityOutcome {
        let metadata = match self.provider.player(track_id).await {
            Ok(metadata) => metadata,
            Err(e) if e.is_transient() => {
                warn!("Provider unreachable: {}", e);
                return PlayabilityOutcome::NetworkError;
            }
            Err(e) => {
                warn!("Provider rejected track: {}", e);
                return PlayabilityOutcome::Unplayable(e.to_string());
            }
        };

        if metadata.playability_status != PLAYABLE_STATUS_OK {
            debug!(
                status = %metadata.playability_status,
                "Track reported as not streamable"
            );
            return PlayabilityOutcome::Unplayable(metadata.playability_status);
        }

        for itag in PREFERRED_ITAGS {
            if let Some(url) = metadata
                .formats
                .iter()
                .find(|f| f.itag == itag)
                .and_then(|f| f.url.clone())
            {
                debug!(itag, "Selected encoding");
                return PlayabilityOutcome::Success(ResolvedUrl { url, itag });
            }
        }

        PlayabilityOutcome::Unplayable("no playable audio format found".to_string())
    }
}
