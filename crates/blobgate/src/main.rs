//! Blobgate - HTTP gateway for blob-store objects

use blobgate::{GatewayConfig, run_server_with_shutdown};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "blobgate")]
#[command(about = "Serve blob-store objects over HTTP")]
#[command(version)]
struct Args {
    /// Host to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1", env = "BLOBGATE_HOST")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value = "8080", env = "BLOBGATE_PORT")]
    port: u16,

    /// Service-account JSON key file
    #[arg(short, long, env = "BLOBGATE_CREDENTIALS")]
    credentials: Option<PathBuf>,

    /// Send unauthenticated storage requests (public buckets)
    #[arg(long, env = "BLOBGATE_ANONYMOUS")]
    anonymous: bool,

    /// Storage API endpoint
    #[arg(
        long,
        default_value = blobgate_store::gcs::DEFAULT_ENDPOINT,
        env = "BLOBGATE_STORAGE_ENDPOINT"
    )]
    storage_endpoint: String,

    /// Key for signed URLs; when set every object request must be signed
    #[arg(short = 'k', long, env = "BLOBGATE_SIGNING_KEY", hide_env_values = true)]
    signing_key: Option<String>,

    /// Object served for empty paths (e.g. index.html)
    #[arg(short = 'i', long, env = "BLOBGATE_INDEX_DOCUMENT")]
    index_document: Option<String>,

    /// Use the request host as the bucket name
    #[arg(long, env = "BLOBGATE_DOMAIN_AS_BUCKET")]
    domain_as_bucket: bool,

    /// Fall back to index documents for missing objects
    #[arg(long, env = "BLOBGATE_REDIRECT_TO_INDEX")]
    redirect_to_index: bool,

    /// Log one line per request
    #[arg(
        long,
        env = "BLOBGATE_ACCESS_LOG",
        default_value_t = true,
        action = clap::ArgAction::Set
    )]
    access_log: bool,

    /// Enable debug logging and detailed failure logs
    #[arg(short, long, env = "BLOBGATE_VERBOSE")]
    verbose: bool,

    /// Use in-memory storage (for testing, starts empty)
    #[arg(long, env = "BLOBGATE_MEMORY_STORE")]
    memory_store: bool,

    /// Upstream connect timeout in seconds
    #[arg(long, default_value = "10", env = "BLOBGATE_CONNECT_TIMEOUT_SECS")]
    connect_timeout_secs: u64,

    /// Upstream read idle timeout in seconds
    #[arg(long, default_value = "60", env = "BLOBGATE_READ_TIMEOUT_SECS")]
    read_timeout_secs: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Setup logging
    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "blobgate={0},blobgate_store={0},tower_http={0}",
                    log_level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Blobgate on {}:{}", args.host, args.port);

    if args.memory_store {
        tracing::warn!("⚠️  Using in-memory storage - every request will 404!");
    } else {
        tracing::info!("Storage API: {}", args.storage_endpoint);
    }

    if args.signing_key.is_none() {
        tracing::info!("Signed URLs disabled");
    }

    let config = GatewayConfig {
        host: args.host,
        port: args.port,
        signing_key: args.signing_key,
        index_document: args.index_document,
        domain_as_bucket: args.domain_as_bucket,
        redirect_to_index: args.redirect_to_index,
        access_log: args.access_log,
        verbose: args.verbose,
        use_memory_store: args.memory_store,
        storage_endpoint: args.storage_endpoint,
        credentials_path: args.credentials,
        anonymous: args.anonymous,
        connect_timeout_secs: args.connect_timeout_secs,
        read_timeout_secs: args.read_timeout_secs,
    };

    run_server_with_shutdown(config, shutdown_signal()).await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
