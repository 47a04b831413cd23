//! Application state

use crate::config::GatewayConfig;
use crate::signature::SignatureValidator;
use blobgate_store::{BlobStore, Credentials, GcsBlobStore, GcsConfig, MemoryBlobStore};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Application state shared across handlers
pub struct AppState {
    /// Gateway configuration
    pub config: GatewayConfig,
    /// Object storage backend
    pub store: Arc<dyn BlobStore>,
    /// Signed URL validator, present when a signing key is configured
    pub signatures: Option<SignatureValidator>,
}

impl AppState {
    /// Create the state, building the storage backend the config asks for
    pub async fn new(config: GatewayConfig) -> anyhow::Result<Self> {
        let store: Arc<dyn BlobStore> = if config.use_memory_store {
            warn!("⚠ Storage mode: In-memory (empty, for development only)");
            Arc::new(MemoryBlobStore::new())
        } else {
            let credentials = Self::resolve_credentials(&config)?;
            let gcs = GcsBlobStore::new(GcsConfig {
                endpoint: config.storage_endpoint.clone(),
                connect_timeout: Duration::from_secs(config.connect_timeout_secs),
                read_timeout: Duration::from_secs(config.read_timeout_secs),
                credentials,
            })?;
            info!("✓ Storage mode: {}", gcs.endpoint());
            Arc::new(gcs)
        };

        Ok(Self::with_store(config, store))
    }

    /// Create the state around an existing backend
    pub fn with_store(config: GatewayConfig, store: Arc<dyn BlobStore>) -> Self {
        let signatures = config.signing_key().map(SignatureValidator::new);
        if signatures.is_some() {
            info!("Signed URLs required for every object request");
        }

        Self {
            config,
            store,
            signatures,
        }
    }

    fn resolve_credentials(config: &GatewayConfig) -> anyhow::Result<Credentials> {
        let credentials = if let Some(path) = &config.credentials_path {
            info!("Using service-account credentials from {}", path.display());
            Credentials::from_file(path)?
        } else if config.anonymous {
            info!("Using anonymous storage access");
            Credentials::Anonymous
        } else {
            Credentials::from_environment()?
        };
        Ok(credentials)
    }
}
