//! # Chunked Disk Cache
//!
//! Persistent, byte-range-addressable cache keyed by track identifier. Each
//! track owns a data file (bytes written at their stream offsets) and a JSON
//! sidecar recording which spans are present. The cache is untyped storage of
//! bytes at offsets; it knows nothing about audio semantics.
//!
//! ## Concurrency
//!
//! The track map is guarded by a briefly-held `parking_lot` lock; all file
//! and span work happens under a per-track `tokio::sync::RwLock`, so reads
//! and writes for different tracks never block each other.
//!
//! ## Consistency
//!
//! Presence checks are conservative: a range counts as cached only when the
//! span union fully covers it. Partial overlap is a miss for the whole
//! request. Corrupt or unreadable index sidecars are treated as absent; the
//! cache may lose data under pressure or corruption but never serves wrong
//! bytes.

use crate::cache::config::CacheConfig;
use crate::cache::spans::SpanSet;
use crate::cache::stats::CacheStats;
use crate::error::{Result, StreamError};
use crate::traits::{ByteRange, TrackId};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::SeekFrom;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::fs::{self, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tracing::{debug, info, instrument, warn};

/// Extension of the per-track data file.
const DATA_EXT: &str = "bin";
/// Extension of the per-track span-index sidecar.
const INDEX_EXT: &str = "json";

/// Persisted per-track span index.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexRecord {
    track_id: String,
    spans: SpanSet,
    updated_at: DateTime<Utc>,
}

/// In-memory state for one cached track.
#[derive(Debug)]
struct TrackState {
    spans: SpanSet,
    updated_at: DateTime<Utc>,
}

#[derive(Debug)]
struct TrackEntry {
    state: tokio::sync::RwLock<TrackState>,
}

/// Persistent byte-range cache shared by all read requests.
pub struct ChunkedDiskCache {
    cache_path: PathBuf,
    config: CacheConfig,
    entries: RwLock<HashMap<String, Arc<TrackEntry>>>,
    total_bytes: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
    evictions: AtomicU64,
}

impl ChunkedDiskCache {
    /// Open (or create) the cache directory and load existing span indexes.
    ///
    /// Corrupt sidecars are skipped with a warning; their tracks simply read
    /// as uncached until rewritten.
    #[instrument(skip(config), fields(path = %config.cache_path().display()))]
    pub async fn open(config: CacheConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| StreamError::Internal(format!("Invalid cache configuration: {}", e)))?;

        let cache_path = config.cache_path();
        fs::create_dir_all(&cache_path).await?;

        let mut entries = HashMap::new();
        let mut total_bytes = 0u64;

        let mut dir = fs::read_dir(&cache_path).await?;
        while let Some(dir_entry) = dir.next_entry().await? {
            let path = dir_entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(INDEX_EXT) {
                continue;
            }

            let record: IndexRecord = match fs::read(&path).await {
                Ok(raw) => match serde_json::from_slice(&raw) {
                    Ok(record) => record,
                    Err(e) => {
                        warn!(path = %path.display(), "Skipping corrupt span index: {}", e);
                        continue;
                    }
                },
                Err(e) => {
                    warn!(path = %path.display(), "Skipping unreadable span index: {}", e);
                    continue;
                }
            };

            total_bytes += record.spans.total_bytes();
            entries.insert(
                record.track_id.clone(),
                Arc::new(TrackEntry {
                    state: tokio::sync::RwLock::new(TrackState {
                        spans: record.spans,
                        updated_at: record.updated_at,
                    }),
                }),
            );
        }

        info!(
            tracks = entries.len(),
            total_bytes, "Disk cache opened"
        );

        Ok(Self {
            cache_path,
            config,
            entries: RwLock::new(entries),
            total_bytes: AtomicU64::new(total_bytes),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            writes: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        })
    }

    fn file_stem(track_id: &TrackId) -> String {
        hex::encode(track_id.as_str().as_bytes())
    }

    fn data_path(&self, track_id: &TrackId) -> PathBuf {
        self.cache_path
            .join(format!("{}.{}", Self::file_stem(track_id), DATA_EXT))
    }

    fn index_path(&self, track_id: &TrackId) -> PathBuf {
        self.cache_path
            .join(format!("{}.{}", Self::file_stem(track_id), INDEX_EXT))
    }

    fn entry(&self, track_id: &TrackId) -> Option<Arc<TrackEntry>> {
        self.entries.read().get(track_id.as_str()).cloned()
    }

    fn entry_or_insert(&self, track_id: &TrackId) -> Arc<TrackEntry> {
        let mut entries = self.entries.write();
        entries
            .entry(track_id.as_str().to_string())
            .or_insert_with(|| {
                Arc::new(TrackEntry {
                    state: tokio::sync::RwLock::new(TrackState {
                        spans: SpanSet::new(),
                        updated_at: Utc::now(),
                    }),
                })
            })
            .clone()
    }

    /// Whether the requested range is fully covered by cached spans.
    ///
    /// Unbounded ranges can never be confirmed covered and read as misses.
    pub async fn is_cached(&self, track_id: &TrackId, range: ByteRange) -> bool {
        let covered = match (range.length, self.entry(track_id)) {
            (Some(length), Some(entry)) => entry.state.read().await.spans.covers(range.offset, length),
            _ => false,
        };

        if covered {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        covered
    }

    /// Read exactly the requested range from the cache.
    ///
    /// # Errors
    ///
    /// - [`StreamError::NotCached`] when the range is not fully covered
    /// - [`StreamError::InvalidRange`] for unbounded or empty ranges
    /// - [`StreamError::CacheIo`] on storage failure
    #[instrument(skip(self), fields(track_id = %track_id, range = %range))]
    pub async fn open_for_read(&self, track_id: &TrackId, range: ByteRange) -> Result<Bytes> {
        range.validate()?;
        let length = range.length.ok_or_else(|| {
            StreamError::InvalidRange("cache reads require a bounded range".to_string())
        })?;

        let entry = self.entry(track_id).ok_or_else(|| StreamError::NotCached {
            track_id: track_id.to_string(),
        })?;

        // Hold the per-track read lock across the file read so eviction
        // cannot delete the data file from under us.
        let state = entry.state.read().await;
        if !state.spans.covers(range.offset, length) {
            return Err(StreamError::NotCached {
                track_id: track_id.to_string(),
            });
        }

        let mut file = fs::File::open(self.data_path(track_id)).await?;
        file.seek(SeekFrom::Start(range.offset)).await?;

        let mut buf = vec![0u8; length as usize];
        file.read_exact(&mut buf).await?;

        debug!(bytes = length, "Cache read");
        Ok(Bytes::from(buf))
    }

    /// Store bytes at the given stream offset.
    ///
    /// Rewriting already-cached bytes is harmless; spans merge idempotently.
    #[instrument(skip(self, data), fields(track_id = %track_id, offset, len = data.len()))]
    pub async fn write(&self, track_id: &TrackId, offset: u64, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Ok(());
        }

        let entry = self.entry_or_insert(track_id);

        {
            let mut state = entry.state.write().await;

            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .open(self.data_path(track_id))
                .await?;
            file.seek(SeekFrom::Start(offset)).await?;
            file.write_all(data).await?;
            file.flush().await?;

            let before = state.spans.total_bytes();
            state.spans.insert(offset, data.len() as u64);
            let added = state.spans.total_bytes() - before;
            self.total_bytes.fetch_add(added, Ordering::Relaxed);

            state.updated_at = Utc::now();
            self.persist_index(track_id, &state).await?;
        }

        self.writes.fetch_add(1, Ordering::Relaxed);
        self.enforce_size_limit(track_id).await;
        Ok(())
    }

    async fn persist_index(&self, track_id: &TrackId, state: &TrackState) -> Result<()> {
        let record = IndexRecord {
            track_id: track_id.as_str().to_string(),
            spans: state.spans.clone(),
            updated_at: state.updated_at,
        };

        let raw = serde_json::to_vec(&record)
            .map_err(|e| StreamError::CacheIndex(format!("Failed to encode span index: {}", e)))?;
        fs::write(self.index_path(track_id), raw).await?;
        Ok(())
    }

    /// Evict least-recently-written tracks until the cache fits its bound.
    ///
    /// No-op for the default never-evict configuration. The track that was
    /// just written is spared so a single oversized track cannot evict itself.
    async fn enforce_size_limit(&self, just_written: &TrackId) {
        let Some(max_bytes) = self.config.max_size_bytes else {
            return;
        };

        while self.total_bytes.load(Ordering::Relaxed) > max_bytes {
            let candidates: Vec<(String, Arc<TrackEntry>)> = self
                .entries
                .read()
                .iter()
                .filter(|(id, _)| id.as_str() != just_written.as_str())
                .map(|(id, entry)| (id.clone(), entry.clone()))
                .collect();

            let mut oldest: Option<(String, DateTime<Utc>)> = None;
            for (id, entry) in &candidates {
                let updated_at = entry.state.read().await.updated_at;
                match &oldest {
                    Some((_, ts)) if *ts <= updated_at => {}
                    _ => oldest = Some((id.clone(), updated_at)),
                }
            }

            let Some((victim, _)) = oldest else {
                warn!("Cache over size limit but no evictable tracks");
                return;
            };

            if let Err(e) = self.remove(&TrackId::new(victim.clone())).await {
                warn!(track_id = %victim, "Eviction failed: {}", e);
                return;
            }
            self.evictions.fetch_add(1, Ordering::Relaxed);
            info!(track_id = %victim, "Evicted track under storage pressure");
        }
    }

    /// Remove a track's cached bytes and index.
    pub async fn remove(&self, track_id: &TrackId) -> Result<()> {
        let Some(entry) = self.entries.write().remove(track_id.as_str()) else {
            return Ok(());
        };

        let state = entry.state.write().await;
        self.total_bytes
            .fetch_sub(state.spans.total_bytes(), Ordering::Relaxed);

        for path in [self.data_path(track_id), self.index_path(track_id)] {
            if let Err(e) = fs::remove_file(&path).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %path.display(), "Failed to delete cache file: {}", e);
                }
            }
        }

        debug!(track_id = %track_id, "Removed cached track");
        Ok(())
    }

    /// Remove every cached track. Returns the number of tracks cleared.
    pub async fn clear(&self) -> Result<usize> {
        let track_ids: Vec<String> = self.entries.read().keys().cloned().collect();
        let mut cleared = 0;

        for id in track_ids {
            self.remove(&TrackId::new(id)).await?;
            cleared += 1;
        }

        info!(cleared, "Cleared disk cache");
        Ok(cleared)
    }

    /// Total cached bytes across all tracks.
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes.load(Ordering::Relaxed)
    }

    /// Snapshot of cache statistics.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            tracks: self.entries.read().len(),
            total_bytes: self.total_bytes.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Debug for ChunkedDiskCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkedDiskCache")
            .field("cache_path", &self.cache_path)
            .field("tracks", &self.entries.read().len())
            .field("total_bytes", &self.total_bytes())
            .finish()
    }
}
