//! Tests for the chunked disk cache
//!
//! These tests run against real temporary directories; the cache's contract
//! is byte-exact storage, conservative presence checks and survival across
//! reopen.

use core_stream::{ByteRange, CacheConfig, ChunkedDiskCache, StreamError, TrackId};
use std::path::PathBuf;
use uuid::Uuid;

fn test_root() -> PathBuf {
    std::env::temp_dir().join(format!("core-stream-cache-test-{}", Uuid::new_v4()))
}

async fn open_cache(root: &PathBuf) -> ChunkedDiskCache {
    ChunkedDiskCache::open(CacheConfig::new(root))
        .await
        .expect("cache should open")
}

async fn cleanup(root: PathBuf) {
    let _ = tokio::fs::remove_dir_all(root).await;
}

#[tokio::test]
async fn test_write_then_read_back_exact_bytes() {
    let root = test_root();
    let cache = open_cache(&root).await;
    let track = TrackId::new("abc");

    let payload: Vec<u8> = (0..1024u32).map(|i| (i % 251) as u8).collect();
    cache.write(&track, 0, &payload).await.unwrap();

    assert!(cache.is_cached(&track, ByteRange::new(0, 1024)).await);
    let read = cache
        .open_for_read(&track, ByteRange::new(0, 1024))
        .await
        .unwrap();
    assert_eq!(read.as_ref(), payload.as_slice());

    // Sub-range reads return exactly the covered slice.
    let middle = cache
        .open_for_read(&track, ByteRange::new(100, 64))
        .await
        .unwrap();
    assert_eq!(middle.as_ref(), &payload[100..164]);

    cleanup(root).await;
}

#[tokio::test]
async fn test_partial_overlap_is_a_miss() {
    let root = test_root();
    let cache = open_cache(&root).await;
    let track = TrackId::new("abc");

    cache.write(&track, 0, &[1u8; 100]).await.unwrap();

    // Only [0, 100) is cached; the tail is missing, so the whole request misses.
    assert!(!cache.is_cached(&track, ByteRange::new(0, 200)).await);
    assert!(!cache.is_cached(&track, ByteRange::new(50, 100)).await);

    let err = cache
        .open_for_read(&track, ByteRange::new(0, 200))
        .await
        .unwrap_err();
    assert!(matches!(err, StreamError::NotCached { .. }));

    cleanup(root).await;
}

#[tokio::test]
async fn test_unbounded_range_never_counts_as_cached() {
    let root = test_root();
    let cache = open_cache(&root).await;
    let track = TrackId::new("abc");

    cache.write(&track, 0, &[1u8; 100]).await.unwrap();
    assert!(!cache.is_cached(&track, ByteRange::to_end(0)).await);

    cleanup(root).await;
}

#[tokio::test]
async fn test_rewrite_is_idempotent() {
    let root = test_root();
    let cache = open_cache(&root).await;
    let track = TrackId::new("abc");

    cache.write(&track, 0, &[7u8; 256]).await.unwrap();
    cache.write(&track, 0, &[7u8; 256]).await.unwrap();
    cache.write(&track, 128, &[7u8; 128]).await.unwrap();

    assert_eq!(cache.total_bytes(), 256);
    let read = cache
        .open_for_read(&track, ByteRange::new(0, 256))
        .await
        .unwrap();
    assert!(read.iter().all(|&b| b == 7));

    cleanup(root).await;
}

#[tokio::test]
async fn test_adjacent_writes_join_into_one_span() {
    let root = test_root();
    let cache = open_cache(&root).await;
    let track = TrackId::new("abc");

    cache.write(&track, 0, &[1u8; 100]).await.unwrap();
    cache.write(&track, 100, &[2u8; 100]).await.unwrap();

    assert!(cache.is_cached(&track, ByteRange::new(0, 200)).await);
    let read = cache
        .open_for_read(&track, ByteRange::new(90, 20))
        .await
        .unwrap();
    assert_eq!(&read[..10], &[1u8; 10]);
    assert_eq!(&read[10..], &[2u8; 10]);

    cleanup(root).await;
}

#[tokio::test]
async fn test_index_survives_reopen() {
    let root = test_root();
    let track = TrackId::new("abc");
    let payload = vec![42u8; 512];

    {
        let cache = open_cache(&root).await;
        cache.write(&track, 1024, &payload).await.unwrap();
    }

    let reopened = open_cache(&root).await;
    assert!(reopened.is_cached(&track, ByteRange::new(1024, 512)).await);
    assert!(!reopened.is_cached(&track, ByteRange::new(0, 512)).await);

    let read = reopened
        .open_for_read(&track, ByteRange::new(1024, 512))
        .await
        .unwrap();
    assert_eq!(read.as_ref(), payload.as_slice());

    cleanup(root).await;
}

#[tokio::test]
async fn test_tracks_are_independent() {
    let root = test_root();
    let cache = open_cache(&root).await;

    let a = TrackId::new("track-a");
    let b = TrackId::new("track-b");

    let (ra, rb) = tokio::join!(
        cache.write(&a, 0, &[1u8; 300]),
        cache.write(&b, 0, &[2u8; 300]),
    );
    ra.unwrap();
    rb.unwrap();

    assert!(cache.is_cached(&a, ByteRange::new(0, 300)).await);
    assert!(cache.is_cached(&b, ByteRange::new(0, 300)).await);
    assert_eq!(
        cache.open_for_read(&a, ByteRange::new(0, 1)).await.unwrap()[0],
        1
    );
    assert_eq!(
        cache.open_for_read(&b, ByteRange::new(0, 1)).await.unwrap()[0],
        2
    );

    cleanup(root).await;
}

#[tokio::test]
async fn test_bounded_cache_evicts_oldest_track() {
    let root = test_root();
    let config = CacheConfig::new(&root).with_max_size(1000);
    let cache = ChunkedDiskCache::open(config).await.unwrap();

    let old = TrackId::new("old");
    let new = TrackId::new("new");

    cache.write(&old, 0, &[1u8; 600]).await.unwrap();
    cache.write(&new, 0, &[2u8; 600]).await.unwrap();

    // 1200 bytes exceeds the bound; the least recently written track goes.
    assert!(!cache.is_cached(&old, ByteRange::new(0, 600)).await);
    assert!(cache.is_cached(&new, ByteRange::new(0, 600)).await);
    assert_eq!(cache.total_bytes(), 600);

    cleanup(root).await;
}

#[tokio::test]
async fn test_remove_and_clear() {
    let root = test_root();
    let cache = open_cache(&root).await;

    cache.write(&TrackId::new("a"), 0, &[0u8; 10]).await.unwrap();
    cache.write(&TrackId::new("b"), 0, &[0u8; 10]).await.unwrap();

    cache.remove(&TrackId::new("a")).await.unwrap();
    assert!(!cache.is_cached(&TrackId::new("a"), ByteRange::new(0, 10)).await);
    assert!(cache.is_cached(&TrackId::new("b"), ByteRange::new(0, 10)).await);

    let cleared = cache.clear().await.unwrap();
    assert_eq!(cleared, 1);
    assert_eq!(cache.total_bytes(), 0);

    cleanup(root).await;
}

#[tokio::test]
async fn test_stats_track_hits_and_misses() {
    let root = test_root();
    let cache = open_cache(&root).await;
    let track = TrackId::new("abc");

    cache.write(&track, 0, &[0u8; 100]).await.unwrap();

    assert!(cache.is_cached(&track, ByteRange::new(0, 100)).await);
    assert!(!cache.is_cached(&track, ByteRange::new(0, 200)).await);

    let stats = cache.stats();
    assert_eq!(stats.tracks, 1);
    assert_eq!(stats.total_bytes, 100);
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.writes, 1);
    assert_eq!(stats.hit_ratio(), Some(0.5));

    cleanup(root).await;
}
