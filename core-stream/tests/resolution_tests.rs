//! Tests for the resolution coordinator and request planner
//!
//! These tests drive the full three-tier lookup with a mocked metadata
//! provider and a real temporary disk cache.

use async_trait::async_trait;
use core_runtime::events::{CacheEvent, CoreEvent, EventBus, ResolutionEvent};
use core_stream::{
    ByteRange, CacheConfig, CandidateFormat, ChunkedDiskCache, FetchInstruction, MetadataProvider,
    ProviderError, ResolutionCoordinator, RetryOnExpiry, StreamConfig, StreamError,
    StreamRequestPlanner, StreamResolver, TrackId, TrackMetadata,
};
use mockall::mock;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

const CHUNK: u64 = 512 * 1024;

mock! {
    Provider {}

    #[async_trait]
    impl MetadataProvider for Provider {
        async fn player(
            &self,
            track_id: &TrackId,
        ) -> std::result::Result<TrackMetadata, ProviderError>;
    }
}

fn playable_metadata() -> TrackMetadata {
    TrackMetadata {
        playability_status: "OK".to_string(),
        formats: vec![
            CandidateFormat {
                itag: 140,
                url: Some("https://media.example.com/aac?sig=x".to_string()),
            },
            CandidateFormat {
                itag: 251,
                url: Some("https://media.example.com/opus?sig=x".to_string()),
            },
        ],
    }
}

fn test_root() -> PathBuf {
    std::env::temp_dir().join(format!("core-stream-resolution-test-{}", Uuid::new_v4()))
}

async fn build_coordinator(
    provider: impl MetadataProvider + 'static,
    root: &PathBuf,
    config: StreamConfig,
) -> (Arc<ResolutionCoordinator>, Arc<ChunkedDiskCache>) {
    let cache = Arc::new(
        ChunkedDiskCache::open(CacheConfig::new(root))
            .await
            .expect("cache should open"),
    );
    let resolver = StreamResolver::new(Arc::new(provider));
    let coordinator = Arc::new(
        ResolutionCoordinator::new(config, resolver, cache.clone())
            .expect("coordinator should build"),
    );
    (coordinator, cache)
}

async fn cleanup(root: PathBuf) {
    let _ = tokio::fs::remove_dir_all(root).await;
}

#[tokio::test]
async fn test_end_to_end_second_request_skips_resolver() {
    let root = test_root();
    let mut provider = MockProvider::new();
    provider
        .expect_player()
        .times(1)
        .returning(|_| Ok(playable_metadata()));

    let (coordinator, _cache) = build_coordinator(provider, &root, StreamConfig::default()).await;
    let planner = StreamRequestPlanner::new(coordinator);
    let track = TrackId::new("abc");

    // First request: empty caches, so the resolver runs once and the fetch
    // is clamped to the chunk length.
    let first = planner
        .plan(&track, ByteRange::new(0, 1024 * 1024))
        .await
        .unwrap();
    assert_eq!(
        first,
        FetchInstruction::FetchRemote {
            track_id: track.clone(),
            url: "https://media.example.com/opus?sig=x".to_string(),
            range: ByteRange::new(0, CHUNK),
        }
    );

    // Second request: the URL is already in the recent-resolution cache, so
    // the resolver is not called again (times(1) above enforces this).
    let second = planner
        .plan(&track, ByteRange::new(CHUNK, CHUNK))
        .await
        .unwrap();
    assert_eq!(
        second,
        FetchInstruction::FetchRemote {
            track_id: track.clone(),
            url: "https://media.example.com/opus?sig=x".to_string(),
            range: ByteRange::new(CHUNK, CHUNK),
        }
    );

    cleanup(root).await;
}

#[tokio::test]
async fn test_disk_hit_bypasses_network_entirely() {
    let root = test_root();
    let mut provider = MockProvider::new();
    provider.expect_player().never();

    let (coordinator, cache) = build_coordinator(provider, &root, StreamConfig::default()).await;
    let track = TrackId::new("abc");

    cache.write(&track, 0, &[9u8; 4096]).await.unwrap();

    let instruction = coordinator
        .resolve_range(&track, ByteRange::new(0, 4096))
        .await
        .unwrap();

    // Disk reads carry the requested range untouched.
    assert_eq!(
        instruction,
        FetchInstruction::ReadFromCache {
            track_id: track.clone(),
            range: ByteRange::new(0, 4096),
        }
    );

    cleanup(root).await;
}

#[tokio::test]
async fn test_unbounded_request_probes_chunkwise() {
    let root = test_root();
    let mut provider = MockProvider::new();
    provider.expect_player().never();

    let (coordinator, cache) = build_coordinator(provider, &root, StreamConfig::default()).await;
    let track = TrackId::new("abc");

    cache
        .write(&track, 0, &vec![1u8; CHUNK as usize])
        .await
        .unwrap();

    let instruction = coordinator
        .resolve_range(&track, ByteRange::to_end(0))
        .await
        .unwrap();

    assert_eq!(
        instruction,
        FetchInstruction::ReadFromCache {
            track_id: track.clone(),
            range: ByteRange::new(0, CHUNK),
        }
    );

    cleanup(root).await;
}

/// Provider that counts calls and holds each resolution open long enough for
/// concurrent callers to pile up behind the deduplication map.
struct SlowProvider {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl MetadataProvider for SlowProvider {
    async fn player(
        &self,
        _track_id: &TrackId,
    ) -> std::result::Result<TrackMetadata, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok(playable_metadata())
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_resolutions_deduplicate() {
    let root = test_root();
    let calls = Arc::new(AtomicUsize::new(0));
    let provider = SlowProvider {
        calls: calls.clone(),
    };

    let (coordinator, _cache) = build_coordinator(provider, &root, StreamConfig::default()).await;
    let track = TrackId::new("abc");

    let mut handles = Vec::new();
    for i in 0..8u64 {
        let coordinator = coordinator.clone();
        let track = track.clone();
        handles.push(tokio::spawn(async move {
            coordinator
                .resolve_range(&track, ByteRange::new(i * CHUNK, CHUNK))
                .await
        }));
    }

    let mut urls = Vec::new();
    for handle in handles {
        match handle.await.unwrap().unwrap() {
            FetchInstruction::FetchRemote { url, .. } => urls.push(url),
            other => panic!("expected remote fetch, got {:?}", other),
        }
    }

    // Exactly one provider call; every caller observed the same outcome.
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(urls
        .iter()
        .all(|u| u == "https://media.example.com/opus?sig=x"));

    cleanup(root).await;
}

#[tokio::test]
async fn test_login_required_is_unplayable() {
    let root = test_root();
    let mut provider = MockProvider::new();
    provider.expect_player().times(1).returning(|_| {
        Ok(TrackMetadata {
            playability_status: "LOGIN_REQUIRED".to_string(),
            formats: playable_metadata().formats,
        })
    });

    let (coordinator, _cache) = build_coordinator(provider, &root, StreamConfig::default()).await;

    let err = coordinator
        .resolve_range(&TrackId::new("abc"), ByteRange::new(0, CHUNK))
        .await
        .unwrap_err();

    match err {
        StreamError::Unplayable(reason) => assert_eq!(reason, "LOGIN_REQUIRED"),
        other => panic!("expected Unplayable, got {:?}", other),
    }

    cleanup(root).await;
}

#[tokio::test]
async fn test_network_failure_does_not_poison_caches() {
    let root = test_root();
    let mut provider = MockProvider::new();
    // Both requests reach the provider: a failed resolution must leave the
    // recent-resolution cache untouched.
    provider
        .expect_player()
        .times(2)
        .returning(|_| Err(ProviderError::Network("connection refused".to_string())));

    let (coordinator, _cache) = build_coordinator(provider, &root, StreamConfig::default()).await;
    let track = TrackId::new("abc");

    for _ in 0..2 {
        let err = coordinator
            .resolve_range(&track, ByteRange::new(0, CHUNK))
            .await
            .unwrap_err();
        assert!(err.is_transient());
        assert!(err.is_network_error());
    }

    cleanup(root).await;
}

#[tokio::test]
async fn test_invalidate_resolved_respects_policy() {
    let root = test_root();
    let mut provider = MockProvider::new();
    provider
        .expect_player()
        .times(2)
        .returning(|_| Ok(playable_metadata()));

    let config = StreamConfig::default().with_retry_on_expiry(RetryOnExpiry::ReResolve);
    let (coordinator, _cache) = build_coordinator(provider, &root, config).await;
    let planner = StreamRequestPlanner::new(coordinator);
    let track = TrackId::new("abc");

    planner.plan(&track, ByteRange::new(0, CHUNK)).await.unwrap();

    // The URL failed downstream; the policy says forget it and re-resolve.
    assert!(planner.invalidate_resolved(&track));
    planner.plan(&track, ByteRange::new(0, CHUNK)).await.unwrap();

    cleanup(root).await;
}

#[tokio::test]
async fn test_invalidate_resolved_default_policy_is_never() {
    let root = test_root();
    let mut provider = MockProvider::new();
    provider
        .expect_player()
        .times(1)
        .returning(|_| Ok(playable_metadata()));

    let (coordinator, _cache) = build_coordinator(provider, &root, StreamConfig::default()).await;
    let planner = StreamRequestPlanner::new(coordinator);
    let track = TrackId::new("abc");

    planner.plan(&track, ByteRange::new(0, CHUNK)).await.unwrap();
    assert!(!planner.invalidate_resolved(&track));

    // The recent entry survives, so no second provider call happens.
    planner.plan(&track, ByteRange::new(0, CHUNK)).await.unwrap();

    cleanup(root).await;
}

#[tokio::test]
async fn test_zero_length_range_is_rejected() {
    let root = test_root();
    let mut provider = MockProvider::new();
    provider.expect_player().never();

    let (coordinator, _cache) = build_coordinator(provider, &root, StreamConfig::default()).await;

    let err = coordinator
        .resolve_range(&TrackId::new("abc"), ByteRange::new(0, 0))
        .await
        .unwrap_err();
    assert!(matches!(err, StreamError::InvalidRange(_)));

    cleanup(root).await;
}

#[tokio::test]
async fn test_corrupt_index_degrades_to_network_resolution() {
    let root = test_root();

    // A damaged span index must read as "nothing cached", not fail the open
    // or the request.
    let cache_dir = root.join("stream_cache");
    tokio::fs::create_dir_all(&cache_dir).await.unwrap();
    tokio::fs::write(cache_dir.join("616263.json"), b"{ not json")
        .await
        .unwrap();

    let mut provider = MockProvider::new();
    provider
        .expect_player()
        .times(1)
        .returning(|_| Ok(playable_metadata()));

    let (coordinator, _cache) = build_coordinator(provider, &root, StreamConfig::default()).await;

    let instruction = coordinator
        .resolve_range(&TrackId::new("abc"), ByteRange::new(0, CHUNK))
        .await
        .unwrap();
    assert!(matches!(instruction, FetchInstruction::FetchRemote { .. }));

    cleanup(root).await;
}

#[tokio::test]
async fn test_events_are_emitted_in_pipeline_order() {
    let root = test_root();
    let mut provider = MockProvider::new();
    provider
        .expect_player()
        .times(1)
        .returning(|_| Ok(playable_metadata()));

    let cache = Arc::new(
        ChunkedDiskCache::open(CacheConfig::new(&root))
            .await
            .unwrap(),
    );
    let resolver = StreamResolver::new(Arc::new(provider));
    let bus = Arc::new(EventBus::new(16));
    let mut events = bus.subscribe();

    let coordinator =
        ResolutionCoordinator::new(StreamConfig::default(), resolver, cache.clone())
            .unwrap()
            .with_event_bus(bus.clone());

    coordinator
        .resolve_range(&TrackId::new("abc"), ByteRange::new(0, CHUNK))
        .await
        .unwrap();

    assert_eq!(
        events.recv().await.unwrap(),
        CoreEvent::Cache(CacheEvent::Miss {
            track_id: "abc".to_string()
        })
    );
    assert_eq!(
        events.recv().await.unwrap(),
        CoreEvent::Resolution(ResolutionEvent::Started {
            track_id: "abc".to_string()
        })
    );
    assert_eq!(
        events.recv().await.unwrap(),
        CoreEvent::Resolution(ResolutionEvent::Resolved {
            track_id: "abc".to_string(),
            itag: 251,
        })
    );

    cleanup(root).await;
}
