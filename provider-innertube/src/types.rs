//! Innertube player API types
//!
//! Data structures for the player endpoint's JSON request and response
//! bodies. Only the fields this layer consumes are modeled.

use serde::{Deserialize, Serialize};

/// Player endpoint request body
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRequest {
    /// Client context sent with every innertube call
    pub context: RequestContext,

    /// The track identifier to look up
    pub video_id: String,
}

/// Innertube request context
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestContext {
    pub client: ClientInfo,
}

/// Client identification inside the request context
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientInfo {
    pub client_name: String,
    pub client_version: String,
}

/// Player endpoint response body
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerResponse {
    /// Whether the track may currently be streamed
    pub playability_status: PlayabilityStatus,

    /// Stream candidates; omitted when the track is not streamable
    #[serde(default)]
    pub streaming_data: Option<StreamingData>,
}

/// Playability verdict for a track
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayabilityStatus {
    /// Status string; `"OK"` means streamable
    pub status: String,

    /// Optional human-readable explanation
    #[serde(default)]
    pub reason: Option<String>,
}

/// Candidate encodings for a streamable track
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamingData {
    /// Audio/video encodings tagged with format identifiers
    #[serde(default)]
    pub adaptive_formats: Vec<AdaptiveFormat>,
}

/// One adaptive encoding of a track
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdaptiveFormat {
    /// Format identifier distinguishing encodings/bitrates
    pub itag: u32,

    /// Signed media URL; absent for ciphered streams
    #[serde(default)]
    pub url: Option<String>,
}
