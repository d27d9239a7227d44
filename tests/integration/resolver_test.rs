// Resolver integration tests: misses never wait on the origin

use super::test_harness::small_cache;
use reelfork::resolver::ContentResolver;
use reelfork::SourceReference;
use std::time::{Duration, Instant};
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_miss_resolves_immediately_then_hits() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(206)
                .set_body_bytes(vec![5u8; 512])
                .set_delay(Duration::from_millis(800)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (_dir, cache) = small_cache(512);
    let resolver = ContentResolver::new(cache.clone());
    let source = SourceReference::remote(format!("{}/slow.mp4", server.uri()));

    let started = Instant::now();
    assert_eq!(resolver.resolve(&source), source);
    assert_eq!(resolver.resolve(&source), source);
    assert!(started.elapsed() < Duration::from_millis(200));

    // Let the single scheduled fetch land
    let deadline = Instant::now() + Duration::from_secs(5);
    while cache.lookup(&source).is_none() && Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    let resolved = resolver.resolve(&source);
    assert!(resolved.is_local());
    assert_eq!(cache.fetch_stats().started, 1);
}

#[tokio::test]
async fn test_unreachable_origin_falls_back_to_remote() {
    let (_dir, cache) = small_cache(512);
    let resolver = ContentResolver::new(cache.clone());
    // Nothing listens on port 9 (discard) on a test host
    let source = SourceReference::remote("http://127.0.0.1:9/unreachable.mp4");

    assert_eq!(resolver.resolve_and_wait(&source).await, source);
    assert_eq!(cache.fetch_stats().failed, 1);
    assert!(cache.stats().is_empty());
}

#[tokio::test]
async fn test_local_sources_pass_through() {
    let (_dir, cache) = small_cache(512);
    let resolver = ContentResolver::new(cache.clone());
    let source: SourceReference = "file:///srv/media/intro.mp4".parse().unwrap();

    assert_eq!(resolver.resolve(&source), SourceReference::local("/srv/media/intro.mp4"));
    assert_eq!(cache.in_flight_count(), 0);
}
