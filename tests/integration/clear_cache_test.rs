// Cache clearing and usage statistics

use super::test_harness::small_cache;
use reelfork::cache::CacheEvent;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_clear_after_fetches_empties_directory() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(206).set_body_bytes(vec![3u8; 256]))
        .mount(&server)
        .await;

    let (_dir, cache) = small_cache(1024);
    for name in ["a", "b", "c"] {
        let url = format!("{}/{}.mp4", server.uri(), name);
        cache.start_background_fetch(&url).wait().await.unwrap().unwrap();
    }

    let stats = cache.stats();
    assert_eq!(stats.file_count, 3);
    assert_eq!(stats.total_size_bytes, 768);

    let mut events = cache.subscribe();
    assert_eq!(cache.clear_all(), 3);
    assert_eq!(cache.stats().file_count, 0);
    assert_eq!(events.recv().await.unwrap(), CacheEvent::Cleared { removed: 3 });
}

#[tokio::test]
async fn test_clear_empty_cache_is_fine() {
    let (_dir, cache) = small_cache(1024);
    assert_eq!(cache.clear_all(), 0);
    assert!(cache.stats().is_empty());
}

#[tokio::test]
async fn test_clear_skips_subdirectories() {
    let (dir, cache) = small_cache(1024);
    std::fs::create_dir(dir.path().join("nested")).unwrap();
    std::fs::write(dir.path().join("cache_abc.tmp"), b"x").unwrap();

    assert_eq!(cache.clear_all(), 1);
    assert!(dir.path().join("nested").is_dir());
    assert_eq!(cache.stats().file_count, 0);
}
