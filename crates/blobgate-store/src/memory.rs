//! In-memory blob store for development and testing

use crate::{BlobStore, ObjectMetadata, ObjectReader, ReadRange, Result, StoreError};
use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use futures::StreamExt;
use parking_lot::Mutex;
use std::sync::Arc;

/// Size of the chunks yielded by memory readers
const CHUNK_SIZE: usize = 64 * 1024;

#[derive(Clone)]
struct StoredObject {
    data: Bytes,
    /// Decompressed form of `data`, present for compressed objects
    decoded: Option<Bytes>,
    metadata: ObjectMetadata,
}

impl StoredObject {
    /// Select bytes and metadata for the requested compression mode
    fn view(&self, want_compressed: bool) -> (Bytes, ObjectMetadata) {
        match (&self.decoded, want_compressed) {
            (Some(decoded), false) => {
                let mut metadata = self.metadata.clone();
                metadata.content_encoding = None;
                metadata.size = decoded.len() as u64;
                (decoded.clone(), metadata)
            }
            _ => (self.data.clone(), self.metadata.clone()),
        }
    }
}

/// An in-memory blob store
///
/// Every metadata lookup is recorded as `bucket/object`, which lets tests
/// observe the order of index-document fallbacks.
#[derive(Clone, Default)]
pub struct MemoryBlobStore {
    objects: Arc<DashMap<(String, String), StoredObject>>,
    lookups: Arc<Mutex<Vec<String>>>,
}

impl MemoryBlobStore {
    /// Create a new empty memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an object; `metadata.size` is set from the data
    pub fn insert(
        &self,
        bucket: impl Into<String>,
        object: impl Into<String>,
        data: impl Into<Bytes>,
        mut metadata: ObjectMetadata,
    ) {
        let data = data.into();
        metadata.size = data.len() as u64;
        self.objects.insert(
            (bucket.into(), object.into()),
            StoredObject {
                data,
                decoded: None,
                metadata,
            },
        );
    }

    /// Store a compressed object together with its decompressed form
    ///
    /// Readers that do not want compressed bytes receive `decoded` with no
    /// content encoding, mirroring transcoding backends.
    pub fn insert_compressed(
        &self,
        bucket: impl Into<String>,
        object: impl Into<String>,
        compressed: impl Into<Bytes>,
        decoded: impl Into<Bytes>,
        mut metadata: ObjectMetadata,
    ) {
        let data = compressed.into();
        metadata.size = data.len() as u64;
        if metadata.content_encoding.is_none() {
            metadata.content_encoding = Some("gzip".to_string());
        }
        self.objects.insert(
            (bucket.into(), object.into()),
            StoredObject {
                data,
                decoded: Some(decoded.into()),
                metadata,
            },
        );
    }

    /// Remove an object
    pub fn remove(&self, bucket: &str, object: &str) {
        self.objects.remove(&(bucket.to_string(), object.to_string()));
    }

    /// Get the number of objects stored
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Metadata lookups performed so far, in order
    pub fn lookups(&self) -> Vec<String> {
        self.lookups.lock().clone()
    }

    /// Forget recorded lookups
    pub fn clear_lookups(&self) {
        self.lookups.lock().clear();
    }

    fn get(&self, bucket: &str, object: &str) -> Result<StoredObject> {
        self.objects
            .get(&(bucket.to_string(), object.to_string()))
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StoreError::not_found(bucket, object))
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn get_metadata(
        &self,
        bucket: &str,
        object: &str,
        want_compressed: bool,
    ) -> Result<ObjectMetadata> {
        self.lookups.lock().push(format!("{}/{}", bucket, object));
        let stored = self.get(bucket, object)?;
        Ok(stored.view(want_compressed).1)
    }

    async fn open_reader(
        &self,
        bucket: &str,
        object: &str,
        want_compressed: bool,
        range: Option<ReadRange>,
    ) -> Result<ObjectReader> {
        let stored = self.get(bucket, object)?;
        let (data, metadata) = stored.view(want_compressed);

        let data = match range {
            Some(range) => {
                let start = (range.offset as usize).min(data.len());
                let end = start.saturating_add(range.length as usize).min(data.len());
                data.slice(start..end)
            }
            None => data,
        };

        let chunks: Vec<Result<Bytes>> = (0..data.len())
            .step_by(CHUNK_SIZE)
            .map(|offset| Ok(data.slice(offset..(offset + CHUNK_SIZE).min(data.len()))))
            .collect();

        Ok(ObjectReader {
            content_length: Some(data.len() as u64),
            content_encoding: metadata.content_encoding,
            stream: futures::stream::iter(chunks).boxed(),
        })
    }
}
