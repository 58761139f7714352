//! Best-effort decoding of the compact session credential.
//!
//! The credential is a JWT: three dot-separated base64url segments. Only the
//! middle (claims) segment is decoded here; signature verification happens
//! server-side. Every malformed input maps to a `DecodeError` - nothing in
//! this module panics or lets an error escape as anything else.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("expected 3 credential segments, found {0}")]
    SegmentCount(usize),

    #[error("claims segment is not valid base64url: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("claims segment is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("claims carry no expiry")]
    MissingExpiry,
}

/// Decoded claims payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Claims {
    pub expires_at_millis: i64,
    pub subject: Option<String>,
    pub email: Option<String>,
    pub issued_at_millis: Option<i64>,
}

impl Claims {
    pub fn is_expired(&self, now_millis: i64) -> bool {
        self.expires_at_millis <= now_millis
    }
}

/// Wire shape of the claims segment. `exp`/`iat` are epoch seconds.
#[derive(Deserialize)]
struct RawClaims {
    exp: Option<i64>,
    sub: Option<String>,
    email: Option<String>,
    iat: Option<i64>,
}

/// Decode a credential's claims. Accepts both the bare compact form and the
/// scheme-prefixed header-ready form.
pub fn decode(raw: &str) -> Result<Claims, DecodeError> {
    let compact = raw.trim().rsplit(' ').next().unwrap_or(raw);
    let segments: Vec<&str> = compact.split('.').collect();
    if segments.len() != 3 {
        return Err(DecodeError::SegmentCount(segments.len()));
    }
    // JWT segments are unpadded, but some producers pad anyway.
    let payload = URL_SAFE_NO_PAD.decode(segments[1].trim_end_matches('='))?;
    let raw_claims: RawClaims = serde_json::from_slice(&payload)?;
    let exp = raw_claims.exp.ok_or(DecodeError::MissingExpiry)?;
    Ok(Claims {
        expires_at_millis: exp * 1000,
        subject: raw_claims.sub,
        email: raw_claims.email,
        issued_at_millis: raw_claims.iat.map(|v| v * 1000),
    })
}
