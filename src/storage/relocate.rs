//! Moving assets from foreign URLs into managed storage

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use super::http::{FetchError, HttpFetcher};
use super::{StorageClient, StorageError};

#[derive(Debug, Error)]
pub enum RelocateError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type Result<T> = std::result::Result<T, RelocateError>;

/// Copies an asset from a foreign URL into managed storage and returns
/// the stable public URL it is served from afterwards
#[async_trait]
pub trait AssetRelocator: Send + Sync {
    async fn relocate(
        &self,
        source_url: &str,
        namespace: &str,
        file_base: &str,
        ext: &str,
    ) -> Result<String>;
}

/// Production relocator: fetch over HTTP, store, serve through the CDN
pub struct BucketRelocator {
    fetcher: HttpFetcher,
    storage: StorageClient,
    cdn_base: String,
}

impl BucketRelocator {
    pub fn new(fetcher: HttpFetcher, storage: StorageClient, cdn_base: impl Into<String>) -> Self {
        Self {
            fetcher,
            storage,
            cdn_base: cdn_base.into(),
        }
    }
}

#[async_trait]
impl AssetRelocator for BucketRelocator {
    async fn relocate(
        &self,
        source_url: &str,
        namespace: &str,
        file_base: &str,
        ext: &str,
    ) -> Result<String> {
        let bytes = self.fetcher.fetch(source_url).await?;
        let key = object_key(namespace, file_base, ext);
        self.storage.upload(&key, bytes.to_vec()).await?;

        let url = public_url(&self.cdn_base, &key);
        info!(source_url, key, "Relocated asset");
        Ok(url)
    }
}

/// Build the storage key: {namespace}/{file_base}.{ext}
pub fn object_key(namespace: &str, file_base: &str, ext: &str) -> String {
    format!("{}/{}.{}", namespace.trim_matches('/'), file_base, ext)
}

/// Public URL for a stored object behind the CDN base
pub fn public_url(cdn_base: &str, key: &str) -> String {
    format!("{}/{}", cdn_base.trim_end_matches('/'), key)
}
