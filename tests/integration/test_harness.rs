// Shared helpers for integration tests: logging, caches, and misbehaving origins

use std::sync::{Arc, Once};
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use reelfork::cache::{CacheConfig, ContentCache, FetchConfig};
use reelfork::config::LoggingConfig;

static INIT: Once = Once::new();

pub fn init_logging() {
    INIT.call_once(|| {
        let config = LoggingConfig {
            level: "reelfork=debug".to_string(),
            ..Default::default()
        };
        let _ = reelfork::logging::init_subscriber(&config);
    });
}

/// Cache in a fresh temp dir with a small prefix so tests move little data
pub fn small_cache(preview_size_bytes: u64) -> (TempDir, Arc<ContentCache>) {
    cache_with(preview_size_bytes, FetchConfig::default())
}

pub fn cache_with(preview_size_bytes: u64, fetch: FetchConfig) -> (TempDir, Arc<ContentCache>) {
    init_logging();
    let dir = TempDir::new().expect("temp dir");
    let config = CacheConfig {
        dir: Some(dir.path().to_path_buf()),
        preview_size_bytes,
        chunk_size_bytes: preview_size_bytes.min(1024) as usize,
    };
    let cache = ContentCache::new(&config, &fetch).expect("cache");
    (dir, Arc::new(cache))
}

/// Files currently in `dir`, by name
pub fn files_in(dir: &TempDir) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir.path())
        .expect("read cache dir")
        .flatten()
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// How a raw origin misbehaves after sending part of its body
#[derive(Debug, Clone, Copy)]
pub enum Misbehavior {
    /// Close the connection early
    Hangup,
    /// Keep the connection open without sending anything
    Stall(Duration),
}

/// Origin that answers 206 promising `promised` bytes but sends only `sent`
///
/// Returns the URL of a resource on it.
pub async fn broken_origin(promised: usize, sent: usize, misbehavior: Misbehavior) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut request = [0u8; 4096];
                let _ = socket.read(&mut request).await;

                let head = format!(
                    "HTTP/1.1 206 Partial Content\r\nContent-Type: video/mp4\r\nContent-Length: {}\r\nContent-Range: bytes 0-{}/{}\r\n\r\n",
                    promised,
                    promised - 1,
                    promised
                );
                let _ = socket.write_all(head.as_bytes()).await;
                let _ = socket.write_all(&vec![0xAB; sent]).await;
                let _ = socket.flush().await;

                match misbehavior {
                    Misbehavior::Hangup => drop(socket),
                    Misbehavior::Stall(duration) => {
                        tokio::time::sleep(duration).await;
                        drop(socket);
                    }
                }
            });
        }
    });

    format!("http://{}/clip.mp4", addr)
}
