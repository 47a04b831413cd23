//! # Blobgate
//!
//! HTTP gateway serving blob-store objects as static web resources.
//!
//! This crate provides:
//! - **Key resolution**: path-style (`/{bucket}/{object}`) or domain-style (host = bucket)
//! - **Signed URLs**: expiring HMAC-SHA256 signatures over the request path
//! - **Index documents**: fallback lookups for directory-like paths
//! - **Conditional GET**: `If-Modified-Since` / 304
//! - **Compression**: gzip passthrough or backend-side decompression
//! - **Byte ranges**: single-range 206 / 416 responses
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                   HTTP Clients                      │
//! │          (browsers, CDNs, curl, etc.)               │
//! └─────────────────────────┬───────────────────────────┘
//!                           │
//! ┌─────────────────────────▼───────────────────────────┐
//! │                     Blobgate                        │
//! ├─────────────────────────────────────────────────────┤
//! │  Request ID │ Access Log │ Trace                    │
//! ├─────────────────────────────────────────────────────┤
//! │  Key → Signature → Negotiate → Index → 304 → Range  │
//! │                  → Headers → Body                   │
//! ├─────────────────────────────────────────────────────┤
//! │                  blobgate-store                     │
//! │            (GCS JSON API, in-memory)                │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod conditional;
pub mod config;
pub mod error;
pub mod handlers;
pub mod headers;
pub mod index;
pub mod key;
pub mod middleware;
pub mod negotiate;
pub mod range;
pub mod routes;
pub mod server;
pub mod signature;
pub mod state;

pub use config::GatewayConfig;
pub use error::ApiError;
pub use key::ObjectKey;
pub use server::{run_server, run_server_with_shutdown, serve};
pub use signature::SignatureValidator;
pub use state::AppState;
