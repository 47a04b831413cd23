//! Single byte-range requests (`Range: bytes=...`)

use axum::http::{HeaderMap, header};
use blobgate_store::{ObjectMetadata, ReadRange};
use tracing::debug;

/// A satisfiable byte span of an object, inclusive on both ends
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RangeSpec {
    pub start: u64,
    pub end: u64,
    pub total: u64,
}

impl RangeSpec {
    /// Number of bytes in the span
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// A resolved span always holds at least one byte
    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }

    /// `Content-Range` header value
    pub fn content_range(&self) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, self.total)
    }

    /// The span as a backend read
    pub fn read_range(&self) -> ReadRange {
        ReadRange {
            offset: self.start,
            length: self.len(),
        }
    }
}

/// A syntactically valid single range, before the object size is known
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ByteRange {
    /// `start-end`
    Bounded { start: u64, end: u64 },
    /// `start-`
    From { start: u64 },
    /// `-len`, the last `len` bytes
    Suffix { len: u64 },
}

impl ByteRange {
    /// Parse a `Range` header value
    ///
    /// Returns `None` for anything that is not exactly one well-formed byte
    /// range, including multi-range requests; callers then serve the full body.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        let spec = value
            .get(..6)
            .filter(|unit| unit.eq_ignore_ascii_case("bytes="))
            .map(|_| value[6..].trim())?;

        if spec.contains(',') {
            debug!(range = %value, "Multi-range request served as full body");
            return None;
        }

        let (first, last) = spec.split_once('-')?;
        let (first, last) = (first.trim(), last.trim());

        match (parse_offset(first), parse_offset(last)) {
            (Some(start), Some(end)) if start <= end => Some(Self::Bounded { start, end }),
            (Some(start), None) if last.is_empty() => Some(Self::From { start }),
            (None, Some(len)) if first.is_empty() => Some(Self::Suffix { len }),
            _ => None,
        }
    }

    /// Apply the range to an object of `total` bytes
    ///
    /// `None` means the range cannot be satisfied.
    pub fn resolve(self, total: u64) -> Option<RangeSpec> {
        let last = total.checked_sub(1)?;
        let (start, end) = match self {
            Self::Bounded { start, end } => (start, end.min(last)),
            Self::From { start } => (start, last),
            Self::Suffix { len: 0 } => return None,
            Self::Suffix { len } => (total.saturating_sub(len), last),
        };
        (start < total).then_some(RangeSpec { start, end, total })
    }
}

fn parse_offset(text: &str) -> Option<u64> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

/// What to send for a request
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RangeOutcome {
    /// 200 with the whole object
    Full,
    /// 206 with one span
    Partial(RangeSpec),
    /// 416 with `Content-Range: bytes */{total}`
    NotSatisfiable { total: u64 },
}

/// Decide between full, partial and unsatisfiable responses
///
/// Malformed and multi-range headers degrade to a full response. So does any
/// range on a transcoded object, whose decoded offsets the backend cannot
/// address.
pub fn evaluate(headers: &HeaderMap, metadata: &ObjectMetadata) -> RangeOutcome {
    let Some(value) = headers.get(header::RANGE) else {
        return RangeOutcome::Full;
    };
    if metadata.transcoded {
        debug!("Range ignored for transcoded object");
        return RangeOutcome::Full;
    }
    let Some(range) = value.to_str().ok().and_then(ByteRange::parse) else {
        debug!(range = ?value, "Ignoring malformed Range header");
        return RangeOutcome::Full;
    };

    match range.resolve(metadata.size) {
        Some(spec) => RangeOutcome::Partial(spec),
        None => RangeOutcome::NotSatisfiable {
            total: metadata.size,
        },
    }
}
