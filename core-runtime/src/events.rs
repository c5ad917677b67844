//! # Event Bus System
//!
//! Provides an event-driven architecture for the streaming core using
//! `tokio::sync::broadcast`. Modules publish typed events; hosts subscribe to
//! observe resolution progress and cache activity without coupling to the
//! resolution layer's internals.
//!
//! ## Overview
//!
//! The event bus system consists of:
//! - **Event Types**: Strongly-typed enum hierarchies per domain
//! - **EventBus**: Central broadcast channel for publishing events
//! - **Subscription Management**: Multiple subscribers can listen independently
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{EventBus, CoreEvent, CacheEvent, CacheTier};
//!
//! let event_bus = EventBus::new(100);
//! let _stream = event_bus.subscribe();
//!
//! event_bus
//!     .emit(CoreEvent::Cache(CacheEvent::Hit {
//!         track_id: "dQw4w9WgXcQ".to_string(),
//!         tier: CacheTier::Disk,
//!     }))
//!     .ok();
//! ```
//!
//! ## Error Handling
//!
//! The bus uses `tokio::sync::broadcast`, which can produce two receive errors:
//!
//! - **`RecvError::Lagged(n)`**: Subscriber was too slow and missed `n` events.
//!   Non-fatal; the subscriber keeps receiving new events.
//! - **`RecvError::Closed`**: All senders have been dropped. Treat as shutdown.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

// Re-export commonly used types
pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
///
/// Subscribers that can't keep up will receive `RecvError::Lagged`.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum encompassing all event categories.
///
/// This is the main event type published and received through the event bus.
/// It wraps domain-specific event types for different modules.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Stream-resolution events
    Resolution(ResolutionEvent),
    /// Disk-cache events
    Cache(CacheEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Resolution(e) => e.description(),
            CoreEvent::Cache(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Resolution(ResolutionEvent::Failed { transient, .. }) => {
                if *transient {
                    EventSeverity::Warning
                } else {
                    EventSeverity::Error
                }
            }
            CoreEvent::Resolution(ResolutionEvent::Resolved { .. }) => EventSeverity::Info,
            CoreEvent::Cache(CacheEvent::Evicted { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    /// Debug-level events (verbose)
    Debug,
    /// Informational events
    Info,
    /// Warning events
    Warning,
    /// Error events
    Error,
}

/// Which lookup tier satisfied a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheTier {
    /// Byte range fully present in the chunked disk cache.
    Disk,
    /// URL found in the recent-resolution cache.
    Recent,
}

// ============================================================================
// Resolution Events
// ============================================================================

/// Events related to stream-URL resolution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum ResolutionEvent {
    /// A fresh resolution was started for a track.
    Started {
        /// The track being resolved.
        track_id: String,
    },
    /// A caller joined a resolution already in flight for the same track.
    Joined {
        /// The track being resolved.
        track_id: String,
    },
    /// Resolution produced a playable URL.
    Resolved {
        /// The resolved track.
        track_id: String,
        /// The encoding that was selected.
        itag: u32,
    },
    /// Resolution failed.
    Failed {
        /// The track that failed to resolve.
        track_id: String,
        /// Human-readable failure reason.
        message: String,
        /// Whether the failure is transient (network) or permanent (unplayable).
        transient: bool,
    },
}

impl ResolutionEvent {
    fn description(&self) -> &str {
        match self {
            ResolutionEvent::Started { .. } => "Resolution started",
            ResolutionEvent::Joined { .. } => "Joined in-flight resolution",
            ResolutionEvent::Resolved { .. } => "Resolution completed",
            ResolutionEvent::Failed { .. } => "Resolution failed",
        }
    }
}

// ============================================================================
// Cache Events
// ============================================================================

/// Events related to the caching tiers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum CacheEvent {
    /// A read request was satisfied without a fresh resolution.
    Hit {
        /// The requested track.
        track_id: String,
        /// Which tier answered.
        tier: CacheTier,
    },
    /// No tier could satisfy the request; a fresh resolution is required.
    Miss {
        /// The requested track.
        track_id: String,
    },
    /// Bytes were written into the disk cache.
    Written {
        /// The track the bytes belong to.
        track_id: String,
        /// Start offset of the written range.
        offset: u64,
        /// Number of bytes written.
        length: u64,
    },
    /// A track's cached data was evicted under storage pressure.
    Evicted {
        /// The evicted track.
        track_id: String,
        /// Bytes freed by the eviction.
        bytes_freed: u64,
    },
}

impl CacheEvent {
    fn description(&self) -> &str {
        match self {
            CacheEvent::Hit { .. } => "Cache hit",
            CacheEvent::Miss { .. } => "Cache miss",
            CacheEvent::Written { .. } => "Cache write",
            CacheEvent::Evicted { .. } => "Cache eviction",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to events.
///
/// Uses `tokio::sync::broadcast` internally, which provides:
/// - Multiple producers (clone the `EventBus`)
/// - Multiple consumers (each `subscribe()` creates a new receiver)
/// - Non-blocking sends (events are cloned for each subscriber)
/// - Lagging detection (slow subscribers get `RecvError::Lagged`)
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    ///
    /// # Arguments
    ///
    /// * `capacity` - Maximum number of events to buffer per subscriber.
    ///   When a subscriber falls behind by more than this amount, it will
    ///   receive a `RecvError::Lagged` error.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Creates a new event bus with the default buffer size.
    #[allow(clippy::should_implement_trait)]
    pub fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event.
    /// Returns an error if there are no active subscribers.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber to receive events.
    ///
    /// Each call creates an independent receiver that will receive all future
    /// events. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit_event() -> CoreEvent {
        CoreEvent::Cache(CacheEvent::Hit {
            track_id: "abc".to_string(),
            tier: CacheTier::Disk,
        })
    }

    #[tokio::test]
    async fn test_emit_and_receive() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.emit(hit_event()).unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received, hit_event());
    }

    #[tokio::test]
    async fn test_multiple_subscribers() {
        let bus = EventBus::new(16);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        let delivered = bus.emit(hit_event()).unwrap();
        assert_eq!(delivered, 2);

        assert_eq!(rx1.recv().await.unwrap(), hit_event());
        assert_eq!(rx2.recv().await.unwrap(), hit_event());
    }

    #[test]
    fn test_emit_without_subscribers_errors() {
        let bus = EventBus::new(16);
        assert!(bus.emit(hit_event()).is_err());
    }

    #[test]
    fn test_severity_classification() {
        let transient = CoreEvent::Resolution(ResolutionEvent::Failed {
            track_id: "abc".to_string(),
            message: "Couldn't reach the internet".to_string(),
            transient: true,
        });
        assert_eq!(transient.severity(), EventSeverity::Warning);

        let permanent = CoreEvent::Resolution(ResolutionEvent::Failed {
            track_id: "abc".to_string(),
            message: "LOGIN_REQUIRED".to_string(),
            transient: false,
        });
        assert_eq!(permanent.severity(), EventSeverity::Error);

        assert_eq!(hit_event().severity(), EventSeverity::Debug);
    }

    #[test]
    fn test_event_serialization_round_trip() {
        let event = CoreEvent::Resolution(ResolutionEvent::Resolved {
            track_id: "abc".to_string(),
            itag: 251,
        });

        let json = serde_json::to_string(&event).unwrap();
        let parsed: CoreEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);
    }

    #[test]
    fn test_descriptions() {
        assert_eq!(hit_event().description(), "Cache hit");
        let started = CoreEvent::Resolution(ResolutionEvent::Started {
            track_id: "abc".to_string(),
        });
        assert_eq!(started.description(), "Resolution started");
    }
}
