// Prefix fetch integration tests
//
// Covers the background fetch path end to end against local origins:
// - concurrent requests for one URL hit the origin once
// - a completed fetch leaves exactly min(prefix, resource) bytes on disk
// - interrupted or stalled downloads leave nothing behind

use super::test_harness::{broken_origin, cache_with, files_in, small_cache, Misbehavior};
use reelfork::cache::{CacheEvent, FetchConfig, FetchError, FetchTicket};
use reelfork::SourceReference;
use std::time::Duration;
use tokio::task::JoinSet;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_concurrent_fetches_hit_origin_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/movie.mp4"))
        .respond_with(
            ResponseTemplate::new(206)
                .set_body_bytes(vec![42u8; 4096])
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (dir, cache) = small_cache(4096);
    let url = format!("{}/movie.mp4", server.uri());

    let mut tasks = JoinSet::new();
    for _ in 0..16 {
        let cache = cache.clone();
        let url = url.clone();
        tasks.spawn(async move { cache.start_background_fetch(&url) });
    }

    let mut spawned = Vec::new();
    while let Some(ticket) = tasks.join_next().await {
        let ticket = ticket.unwrap();
        if ticket.is_spawned() {
            spawned.push(ticket);
        }
    }
    assert_eq!(spawned.len(), 1, "exactly one fetch should be scheduled");

    let result = spawned.pop().unwrap().wait().await.unwrap();
    assert_eq!(result.unwrap(), 4096);
    assert_eq!(files_in(&dir).len(), 1);
    assert_eq!(cache.fetch_stats().started, 1);
    // Dropping the server verifies the single request expectation
}

#[tokio::test]
async fn test_completed_fetch_is_prefix_sized() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("range", "bytes=0-1023"))
        .respond_with(ResponseTemplate::new(206).set_body_bytes(vec![1u8; 1024]))
        .mount(&server)
        .await;

    let (_dir, cache) = small_cache(1024);
    let url = format!("{}/long.mp4", server.uri());
    cache.start_background_fetch(&url).wait().await.unwrap().unwrap();

    let path = cache.lookup(&SourceReference::remote(url)).unwrap();
    assert_eq!(std::fs::metadata(path).unwrap().len(), 1024);
}

#[tokio::test]
async fn test_short_resource_cached_whole() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(206).set_body_bytes(vec![9u8; 300]))
        .mount(&server)
        .await;

    let (_dir, cache) = small_cache(1024);
    let url = format!("{}/short.mp4", server.uri());
    let written = cache.start_background_fetch(&url).wait().await.unwrap().unwrap();

    assert_eq!(written, 300);
    let path = cache.lookup(&SourceReference::remote(url)).unwrap();
    assert_eq!(std::fs::metadata(path).unwrap().len(), 300);
}

#[tokio::test]
async fn test_cached_url_not_fetched_again() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(206).set_body_bytes(vec![1u8; 64]))
        .expect(1)
        .mount(&server)
        .await;

    let (_dir, cache) = small_cache(1024);
    let url = format!("{}/a.mp4", server.uri());
    cache.start_background_fetch(&url).wait().await.unwrap().unwrap();

    assert!(matches!(
        cache.start_background_fetch(&url),
        FetchTicket::AlreadyCached
    ));
}

#[tokio::test]
async fn test_hangup_mid_body_leaves_no_file() {
    let (dir, cache) = small_cache(1024);
    let url = broken_origin(1024, 100, Misbehavior::Hangup).await;

    let result = cache.start_background_fetch(&url).wait().await.unwrap();

    assert!(result.is_err());
    assert!(cache.lookup(&SourceReference::remote(url)).is_none());
    assert!(files_in(&dir).is_empty(), "found {:?}", files_in(&dir));
    assert_eq!(cache.fetch_stats().failed, 1);
}

#[tokio::test]
async fn test_stalled_body_times_out_and_leaves_no_file() {
    let fetch = FetchConfig {
        connect_timeout_secs: 1,
        read_timeout_secs: 1,
    };
    let (dir, cache) = cache_with(1024, fetch);
    let url = broken_origin(1024, 100, Misbehavior::Stall(Duration::from_secs(10))).await;

    let started = std::time::Instant::now();
    let result = cache.start_background_fetch(&url).wait().await.unwrap();

    assert!(matches!(result, Err(FetchError::Timeout { .. })));
    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(files_in(&dir).is_empty());
}

#[tokio::test]
async fn test_full_response_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8; 64]))
        .mount(&server)
        .await;

    let (dir, cache) = small_cache(1024);
    let url = format!("{}/no-ranges.mp4", server.uri());
    let result = cache.start_background_fetch(&url).wait().await.unwrap();

    assert!(matches!(result, Err(FetchError::UnexpectedStatus(200))));
    assert!(files_in(&dir).is_empty());
}

#[tokio::test]
async fn test_fetch_events_broadcast() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(206).set_body_bytes(vec![1u8; 10]))
        .mount(&server)
        .await;

    let (_dir, cache) = small_cache(1024);
    let mut events = cache.subscribe();
    let url = format!("{}/a.mp4", server.uri());
    cache.start_background_fetch(&url).wait().await.unwrap().unwrap();

    let key = reelfork::cache::ContentCache::key_for(&url);
    assert_eq!(
        events.recv().await.unwrap(),
        CacheEvent::FetchStarted {
            key: key.clone(),
            url: url.clone()
        }
    );
    assert_eq!(
        events.recv().await.unwrap(),
        CacheEvent::FetchCompleted { key, bytes: 10 }
    );
}
