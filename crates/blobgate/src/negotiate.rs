//! Transfer compression negotiation

use axum::http::{HeaderMap, header};

/// Whether the client accepts gzip, so stored compressed bytes can be sent as-is
///
/// A plain substring check over every `Accept-Encoding` value; q-values are
/// not interpreted.
pub fn accepts_gzip(headers: &HeaderMap) -> bool {
    headers
        .get_all(header::ACCEPT_ENCODING)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.contains("gzip"))
}
