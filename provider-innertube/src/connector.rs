//! Innertube player endpoint connector
//!
//! Implements the `MetadataProvider` trait over the catalog's player API.

use async_trait::async_trait;
use core_stream::{
    CandidateFormat, MetadataProvider, ProviderError, StreamConfig, TrackId, TrackMetadata,
};
use tracing::{debug, instrument, warn};

use crate::error::InnertubeError;
use crate::types::{ClientInfo, PlayerRequest, PlayerResponse, RequestContext};

/// Innertube API base URL
const INNERTUBE_API_BASE: &str = "https://music.youtube.com/youtubei/v1";

/// Client identity sent in the request context
const CLIENT_NAME: &str = "WEB_REMIX";
const CLIENT_VERSION: &str = "1.20220606.03.00";

/// Retry attempts for rate-limited or failing calls
const MAX_RETRIES: u32 = 3;

/// Innertube player API connector
///
/// Implements [`MetadataProvider`] for the catalog's player endpoint.
///
/// # Features
///
/// - Player lookups by track identifier
/// - Connect/read timeouts from [`StreamConfig`]
/// - Exponential backoff for rate limiting and server errors
///
/// # Example
///
/// ```ignore
/// use provider_innertube::InnertubeConnector;
/// use core_stream::{MetadataProvider, StreamConfig, TrackId};
///
/// let connector = InnertubeConnector::new(&StreamConfig::default())?;
/// let metadata = connector.player(&TrackId::new("dQw4w9WgXcQ")).await?;
/// ```
pub struct InnertubeConnector {
    /// HTTP client with timeouts and user agent applied
    client: reqwest::Client,

    /// API base URL (overridable for tests)
    base_url: String,
}

impl InnertubeConnector {
    /// Create a connector with the stream configuration's timeouts and
    /// user agent.
    pub fn new(config: &StreamConfig) -> crate::error::Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.read_timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| InnertubeError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: INNERTUBE_API_BASE.to_string(),
        })
    }

    /// Override the API base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn player_request(track_id: &TrackId) -> PlayerRequest {
        PlayerRequest {
            context: RequestContext {
                client: ClientInfo {
                    client_name: CLIENT_NAME.to_string(),
                    client_version: CLIENT_VERSION.to_string(),
                },
            },
            video_id: track_id.as_str().to_string(),
        }
    }

    /// Execute the player call with retry logic.
    ///
    /// Rate limiting and server errors back off exponentially; client errors
    /// fail immediately.
    #[instrument(skip(self, request), fields(video_id = %request.video_id))]
    async fn execute_with_retry(
        &self,
        request: &PlayerRequest,
    ) -> crate::error::Result<PlayerResponse> {
        let url = format!("{}/player", self.base_url);
        let mut attempt = 0;

        loop {
            let result = self.client.post(&url).json(request).send().await;

            match result {
                Ok(response) => {
                    let status = response.status().as_u16();

                    if (200..300).contains(&status) {
                        debug!(status, "Player request succeeded");
                        let body = response.bytes().await.map_err(|e| {
                            InnertubeError::Network(format!("Failed to read response body: {}", e))
                        })?;
                        return serde_json::from_slice(&body).map_err(|e| {
                            InnertubeError::ParseError(format!(
                                "Failed to parse player response: {}",
                                e
                            ))
                        });
                    } else if status == 429 || (500..600).contains(&status) {
                        attempt += 1;
                        if attempt >= MAX_RETRIES {
                            warn!(status, "Player request failed after {} attempts", MAX_RETRIES);
                            return Err(InnertubeError::ApiError {
                                status_code: status,
                                message: format!("Request failed after {} retries", MAX_RETRIES),
                            });
                        }

                        let backoff_ms = 100u64 * 2u64.pow(attempt);
                        warn!(
                            status,
                            attempt, "Player request failed, retrying in {}ms", backoff_ms
                        );
                        tokio::time::sleep(tokio::time::Duration::from_millis(backoff_ms)).await;
                    } else {
                        warn!(status, "Player request rejected");
                        let message = response.text().await.unwrap_or_default();
                        return Err(InnertubeError::ApiError {
                            status_code: status,
                            message,
                        });
                    }
                }
                Err(e) => {
                    attempt += 1;
                    if attempt >= MAX_RETRIES {
                        warn!("Player request failed after {} attempts: {}", MAX_RETRIES, e);
                        return Err(InnertubeError::Network(e.to_string()));
                    }

                    let backoff_ms = 100u64 * 2u64.pow(attempt);
                    warn!(
                        attempt,
                        "Player request failed: {}, retrying in {}ms", e, backoff_ms
                    );
                    tokio::time::sleep(tokio::time::Duration::from_millis(backoff_ms)).await;
                }
            }
        }
    }

    fn convert_response(response: PlayerResponse) -> TrackMetadata {
        let formats = response
            .streaming_data
            .map(|data| {
                data.adaptive_formats
                    .into_iter()
                    .map(|f| CandidateFormat {
                        itag: f.itag,
                        url: f.url,
                    })
                    .collect()
            })
            .unwrap_or_default();

        TrackMetadata {
            playability_status: response.playability_status.status,
            formats,
        }
    }
}

#[async_trait]
impl MetadataProvider for InnertubeConnector {
    #[instrument(skip(self), fields(track_id = %track_id))]
    async fn player(
        &self,
        track_id: &TrackId,
    ) -> std::result::Result<TrackMetadata, ProviderError> {
        let request = Self::player_request(track_id);
        let response = self.execute_with_retry(&request).await?;
        Ok(Self::convert_response(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AdaptiveFormat, PlayabilityStatus, StreamingData};

    #[test]
    fn test_player_request_carries_track_id() {
        let request = InnertubeConnector::player_request(&TrackId::new("abc"));
        assert_eq!(request.video_id, "abc");
        assert_eq!(request.context.client.client_name, CLIENT_NAME);
    }

    #[test]
    fn test_convert_playable_response() {
        let response = PlayerResponse {
            playability_status: PlayabilityStatus {
                status: "OK".to_string(),
                reason: None,
            },
            streaming_data: Some(StreamingData {
                adaptive_formats: vec![AdaptiveFormat {
                    itag: 251,
                    url: Some("https://media.example.com/opus".to_string()),
                }],
            }),
        };

        let metadata = InnertubeConnector::convert_response(response);
        assert_eq!(metadata.playability_status, "OK");
        assert_eq!(metadata.formats.len(), 1);
        assert_eq!(metadata.formats[0].itag, 251);
    }

    #[test]
    fn test_convert_unplayable_response_has_no_formats() {
        let response = PlayerResponse {
            playability_status: PlayabilityStatus {
                status: "LOGIN_REQUIRED".to_string(),
                reason: Some("Sign in".to_string()),
            },
            streaming_data: None,
        };

        let metadata = InnertubeConnector::convert_response(response);
        assert_eq!(metadata.playability_status, "LOGIN_REQUIRED");
        assert!(metadata.formats.is_empty());
    }
}
