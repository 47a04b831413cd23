//! `If-Modified-Since` evaluation

use axum::http::{HeaderMap, header};
use blobgate_store::ObjectMetadata;
use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::debug;

/// Parse an HTTP-date in any of the three forms HTTP/1.1 allows
///
/// IMF-fixdate (`Sun, 06 Nov 1994 08:49:37 GMT`), RFC 850
/// (`Sunday, 06-Nov-94 08:49:37 GMT`) and asctime (`Sun Nov  6 08:49:37 1994`).
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(date) = DateTime::parse_from_rfc2822(value) {
        return Some(date.with_timezone(&Utc));
    }
    ["%A, %d-%b-%y %H:%M:%S GMT", "%a %b %e %H:%M:%S %Y"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Format a timestamp as an IMF-fixdate
pub fn format_http_date(date: &DateTime<Utc>) -> String {
    date.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Whether the request can be answered with 304 Not Modified
///
/// The object's modification time is truncated to whole seconds before the
/// comparison, since HTTP dates carry no sub-second precision. A missing or
/// unparseable header, or an object without a modification time, never
/// short-circuits.
pub fn is_not_modified(headers: &HeaderMap, metadata: &ObjectMetadata) -> bool {
    let Some(raw) = headers.get(header::IF_MODIFIED_SINCE) else {
        return false;
    };
    let Some(updated) = metadata.updated else {
        return false;
    };

    let since = match raw.to_str().ok().and_then(parse_http_date) {
        Some(since) => since,
        None => {
            debug!(value = ?raw, "Ignoring unparseable If-Modified-Since");
            return false;
        }
    };

    updated.timestamp() <= since.timestamp()
}
