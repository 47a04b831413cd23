//! Object metadata to HTTP response headers

use crate::conditional::format_http_date;
use axum::http::{HeaderMap, HeaderName, HeaderValue, header};
use blobgate_store::{ObjectMetadata, ObjectReader};
use tracing::warn;

/// Build the response headers describing an object
///
/// Only metadata that is present is emitted. `Content-Length` is left out
/// when the size is unknown (0), and values that are not valid header text
/// are dropped with a warning.
pub fn translate(metadata: &ObjectMetadata) -> HeaderMap {
    let mut headers = HeaderMap::new();

    let text_fields = [
        (header::CONTENT_TYPE, &metadata.content_type),
        (header::CONTENT_LANGUAGE, &metadata.content_language),
        (header::CACHE_CONTROL, &metadata.cache_control),
        (header::CONTENT_ENCODING, &metadata.content_encoding),
        (header::CONTENT_DISPOSITION, &metadata.content_disposition),
    ];
    for (name, value) in text_fields {
        if let Some(value) = value.as_deref() {
            insert_text(&mut headers, name, value);
        }
    }

    if metadata.size > 0 {
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(metadata.size));
    }

    if let Some(updated) = &metadata.updated {
        insert_text(&mut headers, header::LAST_MODIFIED, &format_http_date(updated));
    }

    headers
}

/// Overwrite length and encoding with what an opened reader will really send
pub fn apply_reader(headers: &mut HeaderMap, reader: &ObjectReader) {
    match reader.content_length {
        Some(len) if len > 0 => {
            headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
        }
        _ => {}
    }
    match reader.content_encoding.as_deref() {
        Some(encoding) if !encoding.is_empty() => {
            insert_text(headers, header::CONTENT_ENCODING, encoding);
        }
        _ => {
            headers.remove(header::CONTENT_ENCODING);
        }
    }
}

/// Identity headers set by an authenticating proxy in front of the gateway
const IDENTITY_HEADERS: [&str; 2] = [
    "x-goog-authenticated-user-id",
    "x-goog-authenticated-user-email",
];

/// Echo the caller's authenticated identity back on the response
///
/// Missing or empty request values are not copied.
pub fn copy_identity(request: &HeaderMap, response: &mut HeaderMap) {
    for name in IDENTITY_HEADERS {
        if let Some(value) = request.get(name).filter(|v| !v.is_empty()) {
            response.insert(HeaderName::from_static(name), value.clone());
        }
    }
}

fn insert_text(headers: &mut HeaderMap, name: HeaderName, value: &str) {
    if value.is_empty() {
        return;
    }
    match HeaderValue::from_str(value) {
        Ok(value) => {
            headers.insert(name, value);
        }
        Err(_) => warn!(header = %name, value = %value, "Dropping invalid header value"),
    }
}
