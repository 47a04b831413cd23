//! Google Cloud Storage JSON API client for metadata and media reads

use crate::{
    BlobStore, Credentials, ObjectMetadata, ObjectReader, ReadRange, Result, StoreError,
    TokenSource,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::{StreamExt, TryStreamExt};
use reqwest::{Client, RequestBuilder, Response, StatusCode, header};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

/// Public GCS endpoint
pub const DEFAULT_ENDPOINT: &str = "https://storage.googleapis.com";

/// Object resource fields needed to build response headers
const METADATA_FIELDS: &str =
    "contentType,contentLanguage,cacheControl,contentEncoding,contentDisposition,size,updated";

/// Configuration for the GCS client
#[derive(Clone, Debug)]
pub struct GcsConfig {
    /// API endpoint (e.g., "https://storage.googleapis.com" or an emulator URL)
    pub endpoint: String,
    /// Connection establishment timeout
    pub connect_timeout: Duration,
    /// Maximum idle time between reads of a response body
    pub read_timeout: Duration,
    /// Source of access tokens
    pub credentials: Credentials,
}

impl Default for GcsConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(60),
            credentials: Credentials::metadata_server(),
        }
    }
}

impl GcsConfig {
    /// Create with a custom endpoint
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    /// Use the given credentials
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }
}

/// Object resource as returned by the JSON API
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GcsObject {
    content_type: Option<String>,
    content_language: Option<String>,
    cache_control: Option<String>,
    content_encoding: Option<String>,
    content_disposition: Option<String>,
    /// Decimal string per the API's int64 encoding
    size: Option<String>,
    updated: Option<DateTime<Utc>>,
}

impl GcsObject {
    fn into_metadata(self, want_compressed: bool) -> Result<ObjectMetadata> {
        let size = match self.size.as_deref() {
            Some(raw) => raw.parse::<u64>().map_err(|e| {
                StoreError::Deserialization(format!("invalid object size '{}': {}", raw, e))
            })?,
            None => 0,
        };

        // Without Accept-Encoding: gzip the service decompresses gzip objects
        // on the fly; the stored size and encoding no longer describe the body.
        let transcoded = !want_compressed
            && self
                .content_encoding
                .as_deref()
                .is_some_and(|enc| enc.eq_ignore_ascii_case("gzip"));

        Ok(ObjectMetadata {
            content_type: self.content_type,
            content_language: self.content_language,
            cache_control: self.cache_control,
            content_encoding: if transcoded { None } else { self.content_encoding },
            content_disposition: self.content_disposition,
            size: if transcoded { 0 } else { size },
            updated: self.updated,
            transcoded,
        })
    }
}

/// GCS blob store client
pub struct GcsBlobStore {
    client: Client,
    config: GcsConfig,
    tokens: TokenSource,
}

impl GcsBlobStore {
    /// Create a new GCS client
    pub fn new(config: GcsConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.read_timeout)
            .user_agent(concat!("blobgate/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| StoreError::Configuration(e.to_string()))?;

        let tokens = TokenSource::new(config.credentials.clone(), client.clone());

        Ok(Self {
            client,
            config,
            tokens,
        })
    }

    /// The configured endpoint
    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    fn object_url(&self, bucket: &str, object: &str) -> String {
        format!(
            "{}/storage/v1/b/{}/o/{}",
            self.config.endpoint.trim_end_matches('/'),
            urlencoding::encode(bucket),
            urlencoding::encode(object)
        )
    }

    async fn authorize(&self, request: RequestBuilder) -> Result<RequestBuilder> {
        Ok(match self.tokens.token().await? {
            Some(token) => request.bearer_auth(token),
            None => request,
        })
    }

    async fn check_status(response: Response, bucket: &str, object: &str) -> Result<Response> {
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(StoreError::not_found(bucket, object));
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(StoreError::Http {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl BlobStore for GcsBlobStore {
    #[instrument(skip(self))]
    async fn get_metadata(
        &self,
        bucket: &str,
        object: &str,
        want_compressed: bool,
    ) -> Result<ObjectMetadata> {
        // The API has no object with an empty name
        if object.is_empty() {
            return Err(StoreError::not_found(bucket, object));
        }

        let request = self
            .client
            .get(self.object_url(bucket, object))
            .query(&[("fields", METADATA_FIELDS)]);
        let response = self.authorize(request).await?.send().await?;
        let response = Self::check_status(response, bucket, object).await?;

        let resource: GcsObject = response.json().await?;
        debug!(?resource, "Fetched object metadata");
        resource.into_metadata(want_compressed)
    }

    #[instrument(skip(self))]
    async fn open_reader(
        &self,
        bucket: &str,
        object: &str,
        want_compressed: bool,
        range: Option<ReadRange>,
    ) -> Result<ObjectReader> {
        if object.is_empty() {
            return Err(StoreError::not_found(bucket, object));
        }

        let mut request = self
            .client
            .get(self.object_url(bucket, object))
            .query(&[("alt", "media")]);
        if want_compressed {
            request = request.header(header::ACCEPT_ENCODING, "gzip");
        }
        if let Some(range) = range {
            request = request.header(
                header::RANGE,
                format!("bytes={}-{}", range.offset, range.last_byte()),
            );
        }

        let response = self.authorize(request).await?.send().await?;
        let response = Self::check_status(response, bucket, object).await?;

        if range.is_some() && response.status() != StatusCode::PARTIAL_CONTENT {
            return Err(StoreError::Http {
                status: response.status().as_u16(),
                message: "storage backend ignored the requested byte range".to_string(),
            });
        }

        let content_length = response.content_length();
        let content_encoding = response
            .headers()
            .get(header::CONTENT_ENCODING)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        Ok(ObjectReader {
            content_length,
            content_encoding,
            stream: response.bytes_stream().map_err(StoreError::from).boxed(),
        })
    }
}
