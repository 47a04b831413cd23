//! # Blobgate Store
//!
//! Blob-store collaborators for the blobgate HTTP gateway.
//!
//! This crate provides:
//! - **BlobStore trait**: Metadata lookup and streaming readers keyed by bucket + object
//! - **Memory backend**: Process-local objects for development and tests
//! - **GCS backend**: Google Cloud Storage JSON API client with streamed media downloads
//! - **Credentials**: Access-token, service-account and metadata-server token sources
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │            blobgate (gateway)           │
//! ├─────────────────────────────────────────┤
//! │            BlobStore Trait              │
//! ├────────────────────┬────────────────────┤
//! │   GcsBlobStore     │  MemoryBlobStore   │
//! ├────────────────────┴────────────────────┤
//! │  TokenSource (OAuth access tokens)      │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use blobgate_store::{BlobStore, GcsBlobStore, GcsConfig};
//!
//! let store = GcsBlobStore::new(GcsConfig::default())?;
//! let meta = store.get_metadata("my-bucket", "index.html", false).await?;
//! let reader = store.open_reader("my-bucket", "index.html", false, None).await?;
//! ```

pub mod credentials;
pub mod error;
pub mod gcs;
pub mod memory;

pub use credentials::{Credentials, ServiceAccountKey, TokenSource};
pub use error::{Result, StoreError};
pub use gcs::{GcsBlobStore, GcsConfig};
pub use memory::MemoryBlobStore;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

/// Stream of object bytes as delivered by a backend
pub type ByteStream = BoxStream<'static, Result<Bytes>>;

/// Metadata for a stored object, as seen through a particular compression mode
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMetadata {
    /// Content type (MIME type)
    pub content_type: Option<String>,
    /// Content language
    pub content_language: Option<String>,
    /// Cache control directive
    pub cache_control: Option<String>,
    /// Content encoding of the bytes that will be delivered
    pub content_encoding: Option<String>,
    /// Content disposition
    pub content_disposition: Option<String>,
    /// Size in bytes of what will be delivered, 0 when unknown
    pub size: u64,
    /// Last modification time
    pub updated: Option<DateTime<Utc>>,
    /// Bytes are decompressed on the fly by the backend, so stored offsets
    /// do not address them
    #[serde(default)]
    pub transcoded: bool,
}

impl ObjectMetadata {
    /// Create metadata for an object of the given size
    pub fn new(size: u64) -> Self {
        Self {
            size,
            ..Default::default()
        }
    }

    /// Set the content type
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Set the content language
    pub fn with_content_language(mut self, language: impl Into<String>) -> Self {
        self.content_language = Some(language.into());
        self
    }

    /// Set the cache control directive
    pub fn with_cache_control(mut self, cache_control: impl Into<String>) -> Self {
        self.cache_control = Some(cache_control.into());
        self
    }

    /// Set the content encoding
    pub fn with_content_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.content_encoding = Some(encoding.into());
        self
    }

    /// Set the content disposition
    pub fn with_content_disposition(mut self, disposition: impl Into<String>) -> Self {
        self.content_disposition = Some(disposition.into());
        self
    }

    /// Set the last modification time
    pub fn with_updated(mut self, updated: DateTime<Utc>) -> Self {
        self.updated = Some(updated);
        self
    }
}

/// Byte span to read from an object
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReadRange {
    /// First byte offset
    pub offset: u64,
    /// Number of bytes
    pub length: u64,
}

impl ReadRange {
    /// Inclusive offset of the last byte, as used by HTTP `Range` headers
    pub fn last_byte(&self) -> u64 {
        self.offset + self.length.saturating_sub(1)
    }
}

/// An open object reader
///
/// `content_length` and `content_encoding` describe the bytes this reader
/// actually yields, which can differ from previously fetched metadata when
/// the backend transcodes.
pub struct ObjectReader {
    /// Number of bytes the stream will yield, when known
    pub content_length: Option<u64>,
    /// Encoding of the yielded bytes
    pub content_encoding: Option<String>,
    /// The byte stream
    pub stream: ByteStream,
}

impl std::fmt::Debug for ObjectReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectReader")
            .field("content_length", &self.content_length)
            .field("content_encoding", &self.content_encoding)
            .finish_non_exhaustive()
    }
}

/// Trait for blob storage backends
///
/// `want_compressed` selects between serving the stored bytes as-is
/// (including any compression) and asking the backend to decompress. Callers
/// must pass the same flag to both operations for one response.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Look up object metadata
    async fn get_metadata(
        &self,
        bucket: &str,
        object: &str,
        want_compressed: bool,
    ) -> Result<ObjectMetadata>;

    /// Open a streaming reader over the whole object or a byte span of it
    async fn open_reader(
        &self,
        bucket: &str,
        object: &str,
        want_compressed: bool,
        range: Option<ReadRange>,
    ) -> Result<ObjectReader>;
}
