//! Mapping request paths and hosts to storage keys

use crate::ApiError;
use std::fmt;

/// A bucket + object pair addressing one stored object
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ObjectKey {
    pub bucket: String,
    pub object: String,
}

impl ObjectKey {
    pub fn new(bucket: impl Into<String>, object: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            object: object.into(),
        }
    }

    /// Resolve a key from a percent-decoded request path
    ///
    /// In standard mode the first path segment names the bucket and the
    /// remainder (possibly empty) is the object. In domain mode the host is
    /// the bucket and the whole path is the object.
    pub fn resolve(path: &str, host: Option<&str>, domain_as_bucket: bool) -> Result<Self, ApiError> {
        let path = path.strip_prefix('/').unwrap_or(path);

        if domain_as_bucket {
            let bucket = host
                .map(strip_port)
                .filter(|h| !h.is_empty())
                .ok_or_else(|| ApiError::InvalidKey("missing host header".to_string()))?;
            return Ok(Self::new(bucket, path));
        }

        let (bucket, object) = path.split_once('/').unwrap_or((path, ""));
        if !is_valid_bucket_name(bucket) {
            return Err(ApiError::InvalidKey(format!("invalid bucket name '{}'", bucket)));
        }
        Ok(Self::new(bucket, object))
    }

    /// Same bucket, different object
    pub fn with_object(&self, object: impl Into<String>) -> Self {
        Self::new(self.bucket.clone(), object)
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.bucket, self.object)
    }
}

/// Bucket names: one or more of `[0-9A-Za-z_.-]`
pub fn is_valid_bucket_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
}

fn strip_port(host: &str) -> &str {
    match host.rsplit_once(':') {
        Some((name, port)) if port.bytes().all(|b| b.is_ascii_digit()) => name,
        _ => host,
    }
}
