//! Gateway configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Gateway server configuration
///
/// Built once at startup and shared read-only by every request.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// HMAC key for signed URLs; `None` disables signature checks
    #[serde(skip_serializing)]
    pub signing_key: Option<String>,
    /// Object served for empty or missing paths (e.g. "index.html")
    pub index_document: Option<String>,
    /// Use the request host as the bucket name
    pub domain_as_bucket: bool,
    /// Fall back to index documents when an object is missing
    pub redirect_to_index: bool,
    /// Log one line per request
    pub access_log: bool,
    /// Log request failures in detail
    pub verbose: bool,
    /// Use in-memory storage (for testing/development)
    pub use_memory_store: bool,
    /// Storage API endpoint
    pub storage_endpoint: String,
    /// Service-account key file
    pub credentials_path: Option<PathBuf>,
    /// Send unauthenticated storage requests
    pub anonymous: bool,
    /// Upstream connect timeout (seconds)
    pub connect_timeout_secs: u64,
    /// Upstream read idle timeout (seconds)
    pub read_timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            signing_key: None,
            index_document: None,
            domain_as_bucket: false,
            redirect_to_index: false,
            access_log: true,
            verbose: false,
            use_memory_store: false,
            storage_endpoint: blobgate_store::gcs::DEFAULT_ENDPOINT.to_string(),
            credentials_path: None,
            anonymous: false,
            connect_timeout_secs: 10,
            read_timeout_secs: 60,
        }
    }
}

impl GatewayConfig {
    /// Get the bind address
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Configured index document, ignoring an empty name
    pub fn index_document(&self) -> Option<&str> {
        self.index_document.as_deref().filter(|name| !name.is_empty())
    }

    /// Configured signing key, ignoring an empty key
    pub fn signing_key(&self) -> Option<&[u8]> {
        self.signing_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .map(str::as_bytes)
    }
}
