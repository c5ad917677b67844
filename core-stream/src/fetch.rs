//! # Chunk Fetcher (write-through)
//!
//! Reference executor for [`FetchInstruction`]s: local reads go straight to
//! the disk cache; remote fetches issue an HTTP `Range` request against the
//! resolved URL and write the received bytes through into the cache so later
//! requests for the same range become disk hits.
//!
//! The playback engine may bring its own I/O layer instead; this type only
//! has to honor the same contract.

use crate::cache::ChunkedDiskCache;
use crate::config::StreamConfig;
use crate::error::{Result, StreamError};
use crate::traits::{ByteRange, FetchInstruction};
use bytes::Bytes;
use core_runtime::logging::redact_signed_url;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Executes fetch instructions with write-through caching.
pub struct ChunkFetcher {
    client: reqwest::Client,
    cache: Arc<ChunkedDiskCache>,
}

impl ChunkFetcher {
    /// Build a fetcher with the configured timeouts and user agent.
    pub fn new(config: &StreamConfig, cache: Arc<ChunkedDiskCache>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.read_timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| StreamError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, cache })
    }

    /// Fetch the bytes an instruction points at.
    ///
    /// Remote bytes are written into the disk cache on the way through; a
    /// cache write failure is logged and swallowed since the fetched bytes
    /// are still valid for playback.
    #[instrument(skip(self, instruction))]
    pub async fn fetch(&self, instruction: &FetchInstruction) -> Result<Bytes> {
        match instruction {
            FetchInstruction::ReadFromCache { track_id, range } => {
                self.cache.open_for_read(track_id, *range).await
            }
            FetchInstruction::FetchRemote {
                track_id,
                url,
                range,
            } => {
                let data = self.fetch_remote(url, *range).await?;

                if let Err(e) = self.cache.write(track_id, range.offset, &data).await {
                    warn!(track_id = %track_id, "Write-through cache store failed: {}", e);
                }

                Ok(data)
            }
        }
    }

    async fn fetch_remote(&self, url: &str, range: ByteRange) -> Result<Bytes> {
        let length = range.length.ok_or_else(|| {
            StreamError::InvalidRange("remote fetches require a bounded range".to_string())
        })?;
        let range_header = format!("bytes={}-{}", range.offset, range.offset + length - 1);

        debug!(url = %redact_signed_url(url), range = %range, "Fetching remote chunk");

        let response = self
            .client
            .get(url)
            .header(reqwest::header::RANGE, range_header)
            .send()
            .await
            .map_err(|e| StreamError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_client_error() {
            // Expired signatures surface as 403/410 here; the caller decides
            // whether to re-resolve via the retry-on-expiry policy.
            return Err(StreamError::Unplayable(format!(
                "Media URL rejected the request (HTTP {})",
                status.as_u16()
            )));
        }
        if !status.is_success() {
            return Err(StreamError::Network(format!(
                "Media fetch failed (HTTP {})",
                status.as_u16()
            )));
        }

        let data = response
            .bytes()
            .await
            .map_err(|e| StreamError::Network(e.to_string()))?;

        debug!(bytes = data.len(), "Remote chunk received");
        Ok(data)
    }
}

impl std::fmt::Debug for ChunkFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkFetcher").finish()
    }
}
