//! Error types and their HTTP mapping

use axum::{
    body::Body,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use blobgate_store::StoreError;
use thiserror::Error;

/// API error type
///
/// Every variant is detected before any response byte is written. Failures
/// while streaming a body are not represented here; they abort the
/// connection instead.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("invalid object key: {0}")]
    InvalidKey(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("method {0} is not supported")]
    UnsupportedMethod(String),

    #[error("signature has expired")]
    Expired,

    #[error("signature is invalid")]
    InvalidSignature,

    #[error("object not found: {bucket}/{object}")]
    NotFound { bucket: String, object: String },

    #[error("range not satisfiable for object of {size} bytes")]
    RangeNotSatisfiable { size: u64 },

    #[error("storage error: {0}")]
    Store(StoreError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { bucket, object } => Self::NotFound { bucket, object },
            other => Self::Store(other),
        }
    }
}

impl ApiError {
    /// Short machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidKey(_) => "InvalidKey",
            Self::BadRequest(_) => "BadRequest",
            Self::UnsupportedMethod(_) => "UnsupportedMethod",
            Self::Expired => "Expired",
            Self::InvalidSignature => "InvalidSignature",
            Self::NotFound { .. } => "NotFound",
            Self::RangeNotSatisfiable { .. } => "RangeNotSatisfiable",
            Self::Store(e) if e.is_upstream() => "UpstreamError",
            Self::Store(_) | Self::Internal(_) => "InternalError",
        }
    }

    /// Get the HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidKey(_) | Self::BadRequest(_) | Self::UnsupportedMethod(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Expired | Self::InvalidSignature => StatusCode::FORBIDDEN,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::RangeNotSatisfiable { .. } => StatusCode::RANGE_NOT_SATISFIABLE,
            Self::Store(e) if e.is_upstream() => StatusCode::BAD_GATEWAY,
            Self::Store(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let mut response = if let Self::RangeNotSatisfiable { size } = self {
            let mut response = Response::new(Body::empty());
            if let Ok(value) = HeaderValue::from_str(&format!("bytes */{}", size)) {
                response.headers_mut().insert(header::CONTENT_RANGE, value);
            }
            response
        } else {
            let text = status.canonical_reason().unwrap_or("Error");
            let mut response = Response::new(Body::from(format!("{}\n", text)));
            let headers = response.headers_mut();
            headers.insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/plain; charset=utf-8"),
            );
            headers.insert(
                header::X_CONTENT_TYPE_OPTIONS,
                HeaderValue::from_static("nosniff"),
            );
            response
        };

        *response.status_mut() = status;
        response
            .headers_mut()
            .insert("x-error-code", HeaderValue::from_static(self.code()));
        response
    }
}
