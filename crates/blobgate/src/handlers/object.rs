//! Object serving
//!
//! Every request that is not a service endpoint lands here and runs the
//! same pipeline: resolve key, check signature, negotiate compression,
//! index fallback, conditional check, range, headers, body.

use crate::conditional::{format_http_date, is_not_modified};
use crate::headers;
use crate::index::IndexFallback;
use crate::negotiate::accepts_gzip;
use crate::range::{self, RangeOutcome};
use crate::signature::SignatureParams;
use crate::{ApiError, AppState, GatewayConfig, ObjectKey};
use axum::{
    body::Body,
    extract::{Query, State},
    http::{HeaderMap, HeaderValue, Method, StatusCode, Uri, header},
    response::{IntoResponse, Response},
};
use blobgate_store::ObjectMetadata;
use futures::TryStreamExt;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// The parts of a request the serving pipeline looks at
#[derive(Debug)]
pub struct RequestContext<'a> {
    pub method: &'a Method,
    /// Percent-decoded request path
    pub path: String,
    pub host: Option<&'a str>,
    pub headers: &'a HeaderMap,
    /// Signature parameters are only read from the query when signing is on
    pub uri: &'a Uri,
}

impl<'a> RequestContext<'a> {
    pub fn parse(method: &'a Method, uri: &'a Uri, headers: &'a HeaderMap) -> Result<Self, ApiError> {
        let path = urlencoding::decode(uri.path())
            .map_err(|_| ApiError::InvalidKey("path is not valid UTF-8".to_string()))?
            .into_owned();

        let host = headers
            .get(header::HOST)
            .and_then(|h| h.to_str().ok())
            .or_else(|| uri.host());

        Ok(Self {
            method,
            path,
            host,
            headers,
            uri,
        })
    }
}

/// Fallback handler: GET/HEAD of any object path
pub async fn serve_object(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let result = match RequestContext::parse(&method, &uri, &headers) {
        Ok(ctx) => object_response(&state, ctx).await,
        Err(e) => Err(e),
    };

    result.unwrap_or_else(|e| {
        log_failure(&state.config, &method, &uri, &e);
        e.into_response()
    })
}

async fn object_response(state: &AppState, ctx: RequestContext<'_>) -> Result<Response, ApiError> {
    if ctx.method != Method::GET && ctx.method != Method::HEAD {
        return Err(ApiError::UnsupportedMethod(ctx.method.to_string()));
    }

    let config = &state.config;
    let key = ObjectKey::resolve(&ctx.path, ctx.host, config.domain_as_bucket)?;

    if let Some(validator) = &state.signatures {
        let Query(params) = Query::<SignatureParams>::try_from_uri(ctx.uri)
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        validator.validate(&ctx.path, &params, chrono::Utc::now().timestamp())?;
    }

    let want_compressed = accepts_gzip(ctx.headers);
    let (key, metadata) = IndexFallback::plan(&key, config)
        .resolve(state.store.as_ref(), want_compressed)
        .await?;

    if is_not_modified(ctx.headers, &metadata) {
        debug!(key = %key, "Not modified");
        return Ok(not_modified(&metadata));
    }

    let range = match range::evaluate(ctx.headers, &metadata) {
        RangeOutcome::Full => None,
        RangeOutcome::Partial(spec) => Some(spec),
        RangeOutcome::NotSatisfiable { total } => {
            return Err(ApiError::RangeNotSatisfiable { size: total });
        }
    };

    let mut response_headers = headers::translate(&metadata);
    headers::copy_identity(ctx.headers, &mut response_headers);
    // transcoded bodies cannot be addressed by offset
    if !metadata.transcoded {
        response_headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    }

    let status = match &range {
        Some(spec) => {
            response_headers.insert(header::CONTENT_LENGTH, HeaderValue::from(spec.len()));
            let content_range = HeaderValue::from_str(&spec.content_range())
                .map_err(|e| ApiError::Internal(e.to_string()))?;
            response_headers.insert(header::CONTENT_RANGE, content_range);
            StatusCode::PARTIAL_CONTENT
        }
        None => StatusCode::OK,
    };

    if ctx.method == Method::HEAD {
        return Ok((status, response_headers).into_response());
    }

    let reader = state
        .store
        .open_reader(
            &key.bucket,
            &key.object,
            want_compressed,
            range.map(|spec| spec.read_range()),
        )
        .await?;
    headers::apply_reader(&mut response_headers, &reader);

    // Status and headers are committed from here on; a failing stream can
    // only cut the body short.
    let label = key.to_string();
    let stream = reader.stream.inspect_err(move |e| {
        error!(key = %label, error = %e, "Object stream failed after headers were sent");
    });

    let mut response = Response::new(Body::from_stream(stream));
    *response.status_mut() = status;
    *response.headers_mut() = response_headers;
    Ok(response)
}

fn not_modified(metadata: &ObjectMetadata) -> Response {
    let mut response = StatusCode::NOT_MODIFIED.into_response();
    let headers = response.headers_mut();
    if let Some(value) = metadata
        .updated
        .as_ref()
        .and_then(|updated| HeaderValue::from_str(&format_http_date(updated)).ok())
    {
        headers.insert(header::LAST_MODIFIED, value);
    }
    if let Some(value) = metadata
        .cache_control
        .as_deref()
        .filter(|cc| !cc.is_empty())
        .and_then(|cc| HeaderValue::from_str(cc).ok())
    {
        headers.insert(header::CACHE_CONTROL, value);
    }
    response
}

fn log_failure(config: &GatewayConfig, method: &Method, uri: &Uri, err: &ApiError) {
    if err.status_code().is_server_error() {
        error!(method = %method, uri = %uri, code = err.code(), error = %err, "Request failed");
    } else if config.verbose {
        warn!(method = %method, uri = %uri, code = err.code(), error = %err, "Request rejected");
    } else {
        debug!(method = %method, uri = %uri, code = err.code(), error = %err, "Request rejected");
    }
}
