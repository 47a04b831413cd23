//! Expiring HMAC-SHA256 signed URLs
//!
//! A signed URL carries `expires` (unix seconds) and `signature`, the
//! base64url HMAC-SHA256 of `"{expires}:{path}"` under the gateway's key.

use crate::ApiError;
use base64::{
    Engine as _,
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig, general_purpose},
};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Accepts base64url with or without trailing padding
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Signature query parameters, as received
#[derive(Clone, Debug, Default, Deserialize)]
pub struct SignatureParams {
    pub expires: Option<String>,
    pub signature: Option<String>,
}

/// Decoded signature parameters
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignatureToken {
    pub expires_at: i64,
    pub signature: Vec<u8>,
}

impl SignatureToken {
    /// Parse `expires` and `signature`; both must be present and well formed
    pub fn parse(params: &SignatureParams) -> Result<Self, ApiError> {
        let expires = params.expires.as_deref().unwrap_or_default();
        let expires_at = expires
            .parse::<i64>()
            .map_err(|e| ApiError::BadRequest(format!("expires format is invalid: {}", e)))?;

        let signature = params.signature.as_deref().unwrap_or_default();
        let signature = URL_SAFE_LENIENT
            .decode(signature)
            .map_err(|_| ApiError::BadRequest(format!("error base64 decoding signature {:?}", signature)))?;

        Ok(Self {
            expires_at,
            signature,
        })
    }
}

/// Verifies signed request URLs against a shared key
#[derive(Clone)]
pub struct SignatureValidator {
    key: Vec<u8>,
}

impl std::fmt::Debug for SignatureValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureValidator").finish_non_exhaustive()
    }
}

impl SignatureValidator {
    pub fn new(key: impl Into<Vec<u8>>) -> Self {
        Self { key: key.into() }
    }

    fn mac(&self, expires: &str, path: &str) -> HmacSha256 {
        let mut mac =
            HmacSha256::new_from_slice(&self.key).expect("HMAC accepts keys of any length");
        mac.update(expires.as_bytes());
        mac.update(b":");
        mac.update(path.as_bytes());
        mac
    }

    /// Produce the `signature` value for a path expiring at `expires`
    pub fn sign(&self, path: &str, expires: i64) -> String {
        let tag = self.mac(&expires.to_string(), path).finalize().into_bytes();
        general_purpose::URL_SAFE.encode(tag)
    }

    /// Build the query string (`expires=..&signature=..`) for a path
    pub fn signed_query(&self, path: &str, expires: i64) -> String {
        format!(
            "expires={}&signature={}",
            expires,
            urlencoding::encode(&self.sign(path, expires))
        )
    }

    /// Validate a request's signature parameters at time `now` (unix seconds)
    ///
    /// An expiry equal to `now` has already lapsed. The MAC is computed over
    /// the `expires` text exactly as received.
    pub fn validate(&self, path: &str, params: &SignatureParams, now: i64) -> Result<(), ApiError> {
        let token = SignatureToken::parse(params)?;

        if token.expires_at <= now {
            return Err(ApiError::Expired);
        }

        let expires = params.expires.as_deref().unwrap_or_default();
        self.mac(expires, path)
            .verify_slice(&token.signature)
            .map_err(|_| ApiError::InvalidSignature)
    }
}
