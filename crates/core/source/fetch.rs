//! Tile byte sources.
//!
//! A fetch either yields the tile's bytes or fails for good: the index never
//! retries, and a failed tile stays failed until the next reset.

use crate::error::{Result, TileProbeError};
use async_trait::async_trait;
use bytes::Bytes;
use std::path::PathBuf;

#[async_trait]
pub trait TileFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Bytes>;
}

/// Reads tiles from the local filesystem; the "URL" is a path, resolved
/// against an optional root directory.
#[derive(Debug, Clone, Default)]
pub struct FileFetcher {
    root: Option<PathBuf>,
}

impl FileFetcher {
    pub fn new() -> Self {
        Self { root: None }
    }

    pub fn with_root<P: Into<PathBuf>>(root: P) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    fn resolve(&self, url: &str) -> PathBuf {
        let path = url.strip_prefix("file://").unwrap_or(url);
        match &self.root {
            Some(root) => root.join(path),
            None => PathBuf::from(path),
        }
    }
}

#[async_trait]
impl TileFetcher for FileFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes> {
        let path = self.resolve(url);
        tokio::fs::read(&path)
            .await
            .map(Bytes::from)
            .map_err(|e| TileProbeError::fetch(url, e))
    }
}

/// Fetches tiles over HTTP(S). Non-2xx responses are failures.
#[cfg(feature = "http")]
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

#[cfg(feature = "http")]
impl HttpFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[cfg(feature = "http")]
#[async_trait]
impl TileFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| TileProbeError::fetch(url, e))?;
        response
            .bytes()
            .await
            .map_err(|e| TileProbeError::fetch(url, e))
    }
}
