//! Range-request prefix fetcher
//!
//! Pulls `bytes=0-{preview_size-1}` from an origin and writes it next to the
//! final cache file, renaming it into place only once the whole prefix is on
//! disk. Any failure removes the staging file, so a half-written entry is
//! never visible and a previous complete entry survives.

use bytes::Bytes;
use reqwest::header::RANGE;
use reqwest::StatusCode;
use std::path::Path;
use std::time::Duration;
use tokio::io::{AsyncWriteExt, BufWriter};

use super::config::{CacheConfig, FetchConfig};
use super::error::{CacheError, FetchError};
use super::utils::staging_path;

/// HTTP client plus the sizing/timeouts a single prefix fetch obeys
#[derive(Debug, Clone)]
pub(crate) struct PrefixFetcher {
    client: reqwest::Client,
    preview_size: u64,
    chunk_size: usize,
    read_timeout: Duration,
    head_timeout: Duration,
}

impl PrefixFetcher {
    pub fn new(cache: &CacheConfig, fetch: &FetchConfig) -> Result<Self, CacheError> {
        let client = reqwest::Client::builder()
            .connect_timeout(fetch.connect_timeout())
            .build()
            .map_err(CacheError::Client)?;

        Ok(Self {
            client,
            preview_size: cache.preview_size_bytes,
            chunk_size: cache.chunk_size_bytes,
            read_timeout: fetch.read_timeout(),
            // Response head includes connection setup
            head_timeout: fetch.connect_timeout() + fetch.read_timeout(),
        })
    }

    /// Range header value requesting the first `preview_size` bytes
    pub fn range_header(&self) -> String {
        format!("bytes=0-{}", self.preview_size - 1)
    }

    /// Fetch the prefix of `url` into `dest`, returning the bytes written
    pub async fn fetch_into(&self, url: &str, dest: &Path) -> Result<u64, FetchError> {
        let staging = staging_path(dest);

        let result = match self.download(url, &staging).await {
            Ok(written) => tokio::fs::rename(&staging, dest)
                .await
                .map(|_| written)
                .map_err(FetchError::from),
            Err(e) => Err(e),
        };

        if result.is_err() {
            // Ignore error if the file was never created
            let _ = tokio::fs::remove_file(&staging).await;
        }
        result
    }

    async fn download(&self, url: &str, staging: &Path) -> Result<u64, FetchError> {
        let request = self.client.get(url).header(RANGE, self.range_header()).send();
        let mut response = tokio::time::timeout(self.head_timeout, request)
            .await
            .map_err(|_| FetchError::Timeout {
                after: self.head_timeout,
                stage: "response headers",
            })??;

        if response.status() != StatusCode::PARTIAL_CONTENT {
            return Err(FetchError::UnexpectedStatus(response.status().as_u16()));
        }

        let file = tokio::fs::File::create(staging).await?;
        let mut writer = BufWriter::with_capacity(self.chunk_size, file);
        let mut written: u64 = 0;

        while written < self.preview_size {
            let next: Option<Bytes> = tokio::time::timeout(self.read_timeout, response.chunk())
                .await
                .map_err(|_| FetchError::Timeout {
                    after: self.read_timeout,
                    stage: "response body",
                })??;

            let Some(chunk) = next else {
                break;
            };

            // Origins may ignore the end of the range; never store past the prefix
            let remaining = (self.preview_size - written).min(chunk.len() as u64) as usize;
            writer.write_all(&chunk[..remaining]).await?;
            written += remaining as u64;
        }

        writer.flush().await?;
        writer.into_inner().sync_all().await?;

        if written == 0 {
            return Err(FetchError::EmptyBody);
        }
        Ok(written)
    }
}
