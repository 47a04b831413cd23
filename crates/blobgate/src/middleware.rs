//! HTTP middleware for request ids and access logging

use crate::AppState;
use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderMap, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use futures::StreamExt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

/// Request ID middleware - adds x-request-id header
pub async fn request_id_middleware(mut request: Request<Body>, next: Next) -> Response {
    let request_id = uuid::Uuid::new_v4().to_string();
    request.extensions_mut().insert(RequestId(request_id.clone()));

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert("x-request-id", value);
    }
    response
}

/// Request ID extension
#[derive(Clone, Debug)]
pub struct RequestId(pub String);

/// Access log middleware, one line per request when enabled
///
/// The line is written once the response body has been fully sent or
/// dropped, so `elapsed_secs` covers the whole transfer.
pub async fn access_log_middleware(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !state.config.access_log {
        return next.run(request).await;
    }

    let method = request.method().clone();
    let uri = request.uri().clone();
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let remote = remote_addr(request.headers(), peer);
    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map(|id| id.0.clone())
        .unwrap_or_default();
    let start = Instant::now();

    let response = next.run(request).await;
    let status = response.status().as_u16();

    let (parts, body) = response.into_parts();
    let body = on_body_complete(body, move || {
        tracing::info!(
            remote = %remote,
            elapsed_secs = start.elapsed().as_secs_f64(),
            status,
            method = %method,
            uri = %uri,
            request_id = %request_id,
            "Request completed"
        );
    });
    Response::from_parts(parts, body)
}

/// Runs its callback when dropped
struct CompletionGuard<F: FnOnce()>(Option<F>);

impl<F: FnOnce()> Drop for CompletionGuard<F> {
    fn drop(&mut self) {
        if let Some(done) = self.0.take() {
            done();
        }
    }
}

/// Wrap a body so `done` runs after its last chunk, or when it is abandoned
pub fn on_body_complete<F>(body: Body, done: F) -> Body
where
    F: FnOnce() + Send + 'static,
{
    let guard = CompletionGuard(Some(done));
    let stream = body.into_data_stream().map(move |chunk| {
        let _ = &guard;
        chunk
    });
    Body::from_stream(stream)
}

/// Client address for logging: first `X-Forwarded-For` entry, else the peer
pub fn remote_addr(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    match (forwarded, peer) {
        (Some(addr), _) => addr.to_string(),
        (None, Some(peer)) => peer.ip().to_string(),
        (None, None) => "-".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use bytes::Bytes;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn test_remote_addr_prefers_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        let peer: SocketAddr = "10.0.0.2:5555".parse().unwrap();

        assert_eq!(remote_addr(&headers, Some(peer)), "203.0.113.7");
        assert_eq!(remote_addr(&HeaderMap::new(), Some(peer)), "10.0.0.2");
        assert_eq!(remote_addr(&HeaderMap::new(), None), "-");
    }

    #[tokio::test]
    async fn test_completion_runs_after_body_is_sent() {
        let done = Arc::new(AtomicBool::new(false));
        let chunks: Vec<Result<Bytes, std::io::Error>> =
            vec![Ok(Bytes::from_static(b"first ")), Ok(Bytes::from_static(b"second"))];
        let flag = Arc::clone(&done);
        let body = on_body_complete(Body::from_stream(futures::stream::iter(chunks)), move || {
            flag.store(true, Ordering::SeqCst);
        });

        assert!(!done.load(Ordering::SeqCst));
        let bytes = to_bytes(body, usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"first second");
        assert!(done.load(Ordering::SeqCst));
    }

    #[test]
    fn test_completion_runs_when_body_is_dropped() {
        let done = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&done);
        let body = on_body_complete(Body::from("unsent"), move || {
            flag.store(true, Ordering::SeqCst);
        });

        drop(body);
        assert!(done.load(Ordering::SeqCst));
    }
}
