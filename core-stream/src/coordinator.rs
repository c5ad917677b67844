//! # Resolution Coordinator
//!
//! Per-request pipeline turning `(track, byte range)` into a concrete fetch
//! location. Each request walks the tiers in order:
//!
//! ```text
//! CheckDisk ──hit──> Done(ReadFromCache)
//!     │miss
//! CheckRecent ──hit──> Done(FetchRemote, clamped to chunk length)
//!     │miss
//! Resolving (deduplicated per track) ──> Done(FetchRemote | error)
//! ```
//!
//! ## Deduplication
//!
//! At most one resolution per track is in flight. The first caller becomes
//! the leader and runs the resolver; concurrent callers for the same track
//! join through a `watch` channel and observe the identical outcome. A drop
//! guard clears the in-flight entry when the leader finishes *or is
//! cancelled*, so an abandoned resolution can never wedge the track.
//!
//! Requests for different tracks share nothing but briefly-held map locks.

use crate::cache::ChunkedDiskCache;
use crate::config::{RetryOnExpiry, StreamConfig};
use crate::error::{Result, StreamError};
use crate::recent::RecentResolutionCache;
use crate::resolver::StreamResolver;
use crate::traits::{ByteRange, FetchInstruction, PlayabilityOutcome, ResolvedUrl, TrackId};
use core_runtime::events::{CacheEvent, CacheTier, CoreEvent, EventBus, ResolutionEvent};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, instrument, warn};

type OutcomeReceiver = watch::Receiver<Option<PlayabilityOutcome>>;

/// Orchestrates the three-tier lookup and deduplicates resolutions.
pub struct ResolutionCoordinator {
    config: StreamConfig,
    resolver: StreamResolver,
    disk_cache: Arc<ChunkedDiskCache>,
    recent: Mutex<RecentResolutionCache>,
    in_flight: Mutex<HashMap<TrackId, OutcomeReceiver>>,
    event_bus: Option<Arc<EventBus>>,
}

impl ResolutionCoordinator {
    /// Create a coordinator over the given resolver and disk cache.
    pub fn new(
        config: StreamConfig,
        resolver: StreamResolver,
        disk_cache: Arc<ChunkedDiskCache>,
    ) -> Result<Self> {
        config
            .validate()
            .map_err(|e| StreamError::Internal(format!("Invalid stream configuration: {}", e)))?;

        let recent = RecentResolutionCache::new(config.recent_capacity);
        Ok(Self {
            config,
            resolver,
            disk_cache,
            recent: Mutex::new(recent),
            in_flight: Mutex::new(HashMap::new()),
            event_bus: None,
        })
    }

    /// Set event bus for resolution and cache events.
    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// The active configuration.
    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// The disk cache the coordinator consults.
    pub fn disk_cache(&self) -> &Arc<ChunkedDiskCache> {
        &self.disk_cache
    }

    /// Produce a fetch location for one byte-range read request.
    ///
    /// Disk hits carry the requested range untouched; network instructions
    /// are always sub-ranged to the configured chunk length. Local cache
    /// failures degrade to misses rather than failing the request.
    ///
    /// # Errors
    ///
    /// - [`StreamError::Network`] when the provider is unreachable (retryable)
    /// - [`StreamError::Unplayable`] when the track cannot be streamed
    /// - [`StreamError::InvalidRange`] for malformed ranges
    #[instrument(skip(self), fields(track_id = %track_id, range = %range))]
    pub async fn resolve_range(
        &self,
        track_id: &TrackId,
        range: ByteRange,
    ) -> Result<FetchInstruction> {
        range.validate()?;

        // CheckDisk. Unbounded requests are probed chunk-wise, matching how
        // the I/O layer actually reads.
        let probe = clamp_unbounded(range, self.config.chunk_length);
        if self.disk_cache.is_cached(track_id, probe).await {
            debug!("Disk cache hit");
            self.emit(CoreEvent::Cache(CacheEvent::Hit {
                track_id: track_id.to_string(),
                tier: CacheTier::Disk,
            }));
            let serve = if range.length.is_some() { range } else { probe };
            return Ok(FetchInstruction::ReadFromCache {
                track_id: track_id.clone(),
                range: serve,
            });
        }

        // CheckRecent
        if let Some(resolved) = self.recent.lock().get(track_id) {
            debug!("Recent-resolution cache hit");
            self.emit(CoreEvent::Cache(CacheEvent::Hit {
                track_id: track_id.to_string(),
                tier: CacheTier::Recent,
            }));
            return Ok(self.remote_instruction(track_id, range.offset, resolved));
        }

        self.emit(CoreEvent::Cache(CacheEvent::Miss {
            track_id: track_id.to_string(),
        }));

        // Resolving
        match self.resolve_deduplicated(track_id).await {
            PlayabilityOutcome::Success(resolved) => {
                Ok(self.remote_instruction(track_id, range.offset, resolved))
            }
            PlayabilityOutcome::NetworkError => Err(StreamError::Network(
                "Couldn't reach the internet".to_string(),
            )),
            PlayabilityOutcome::Unplayable(reason) => Err(StreamError::Unplayable(reason)),
        }
    }

    /// Apply the retry-on-expiry policy after a resolved URL failed.
    ///
    /// Returns `true` when the recent entry was dropped and the caller should
    /// re-plan the request (forcing a fresh resolution).
    pub fn invalidate_resolved(&self, track_id: &TrackId) -> bool {
        match self.config.retry_on_expiry {
            RetryOnExpiry::Never => false,
            RetryOnExpiry::ReResolve => {
                warn!(track_id = %track_id, "Dropping resolved URL after failure");
                self.recent.lock().forget(track_id);
                true
            }
        }
    }

    fn remote_instruction(
        &self,
        track_id: &TrackId,
        offset: u64,
        resolved: ResolvedUrl,
    ) -> FetchInstruction {
        FetchInstruction::FetchRemote {
            track_id: track_id.clone(),
            url: resolved.url,
            range: ByteRange::new(offset, self.config.chunk_length),
        }
    }

    /// Run a resolution, joining an in-flight one for the same track if any.
    async fn resolve_deduplicated(&self, track_id: &TrackId) -> PlayabilityOutcome {
        enum Role {
            Leader(watch::Sender<Option<PlayabilityOutcome>>),
            Joiner(OutcomeReceiver),
        }

        let role = {
            let mut in_flight = self.in_flight.lock();
            match in_flight.get(track_id) {
                Some(rx) => Role::Joiner(rx.clone()),
                None => {
                    let (tx, rx) = watch::channel(None);
                    in_flight.insert(track_id.clone(), rx);
                    Role::Leader(tx)
                }
            }
        };

        match role {
            Role::Leader(tx) => {
                self.emit(CoreEvent::Resolution(ResolutionEvent::Started {
                    track_id: track_id.to_string(),
                }));

                // Cleared on completion or cancellation alike.
                let _guard = InFlightGuard {
                    in_flight: &self.in_flight,
                    track_id: track_id.clone(),
                };

                let outcome = self.resolver.resolve(track_id).await;

                match &outcome {
                    PlayabilityOutcome::Success(resolved) => {
                        self.recent.lock().put(track_id.clone(), resolved.clone());
                        self.emit(CoreEvent::Resolution(ResolutionEvent::Resolved {
                            track_id: track_id.to_string(),
                            itag: resolved.itag,
                        }));
                    }
                    PlayabilityOutcome::NetworkError => {
                        self.emit(CoreEvent::Resolution(ResolutionEvent::Failed {
                            track_id: track_id.to_string(),
                            message: "Couldn't reach the internet".to_string(),
                            transient: true,
                        }));
                    }
                    PlayabilityOutcome::Unplayable(reason) => {
                        self.emit(CoreEvent::Resolution(ResolutionEvent::Failed {
                            track_id: track_id.to_string(),
                            message: reason.clone(),
                            transient: false,
                        }));
                    }
                }

                let _ = tx.send(Some(outcome.clone()));
                outcome
            }
            Role::Joiner(mut rx) => {
                self.emit(CoreEvent::Resolution(ResolutionEvent::Joined {
                    track_id: track_id.to_string(),
                }));

                loop {
                    {
                        let value = rx.borrow_and_update();
                        if let Some(outcome) = value.as_ref() {
                            return outcome.clone();
                        }
                    }
                    // A dropped sender means the leader was cancelled before
                    // producing an outcome; report the transient kind so the
                    // caller may retry.
                    if rx.changed().await.is_err() {
                        return PlayabilityOutcome::NetworkError;
                    }
                }
            }
        }
    }

    fn emit(&self, event: CoreEvent) {
        if let Some(bus) = &self.event_bus {
            bus.emit(event).ok();
        }
    }
}

impl std::fmt::Debug for ResolutionCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolutionCoordinator")
            .field("chunk_length", &self.config.chunk_length)
            .field("in_flight", &self.in_flight.lock().len())
            .finish()
    }
}

/// Removes the in-flight entry for a track when the leader finishes or is
/// dropped mid-resolution.
struct InFlightGuard<'a> {
    in_flight: &'a Mutex<HashMap<TrackId, OutcomeReceiver>>,
    track_id: TrackId,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.in_flight.lock().remove(&self.track_id);
    }
}

/// Clamp an unbounded range to the chunk length; bounded ranges pass through.
fn clamp_unbounded(range: ByteRange, chunk_length: u64) -> ByteRange {
    match range.length {
        Some(_) => range,
        None => ByteRange::new(range.offset, chunk_length),
    }
}
