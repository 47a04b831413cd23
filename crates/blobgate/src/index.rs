//! Index-document fallback
//!
//! Turns a resolved key into the ordered list of keys to look up, then
//! performs the lookups one at a time until one exists.

use crate::{ApiError, GatewayConfig, ObjectKey};
use blobgate_store::{BlobStore, ObjectMetadata, StoreError};
use tracing::debug;

/// Ordered candidate keys for one request
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexFallback {
    candidates: Vec<ObjectKey>,
}

impl IndexFallback {
    /// Plan the lookups for `key`
    ///
    /// - empty object + index document: only `{index}` at the bucket root
    /// - otherwise the object itself (trailing slash stripped)
    /// - then, when redirecting is enabled and an index document is set,
    ///   `{object}/{index}` followed by `{index}` at the bucket root
    pub fn plan(key: &ObjectKey, config: &GatewayConfig) -> Self {
        let index = config.index_document();

        if key.object.is_empty() {
            if let Some(index) = index {
                return Self {
                    candidates: vec![key.with_object(index)],
                };
            }
        }

        let object = key.object.trim_end_matches('/');
        let mut candidates = vec![key.with_object(object)];

        if let (true, Some(index)) = (config.redirect_to_index, index) {
            if !object.is_empty() {
                candidates.push(key.with_object(format!("{}/{}", object, index)));
            }
            candidates.push(key.with_object(index));
        }

        Self { candidates }
    }

    /// The planned keys, in lookup order
    pub fn candidates(&self) -> &[ObjectKey] {
        &self.candidates
    }

    /// Look up candidates in order; the first that exists wins
    ///
    /// Lookups are sequential and stop at the first success or at the first
    /// error other than not-found. When every candidate is missing the
    /// result is `NotFound` for the originally requested key.
    pub async fn resolve(
        self,
        store: &dyn BlobStore,
        want_compressed: bool,
    ) -> Result<(ObjectKey, ObjectMetadata), ApiError> {
        let mut last_missing: Option<StoreError> = None;

        for candidate in self.candidates {
            debug!(key = %candidate, "Looking up object metadata");
            match store
                .get_metadata(&candidate.bucket, &candidate.object, want_compressed)
                .await
            {
                Ok(metadata) => return Ok((candidate, metadata)),
                Err(e) if e.is_not_found() => {
                    if last_missing.is_none() {
                        last_missing = Some(e);
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(last_missing
            .map(ApiError::from)
            .unwrap_or_else(|| ApiError::Internal("no lookup candidates".to_string())))
    }
}
