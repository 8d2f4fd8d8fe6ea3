//! Compact signed tokens.
//!
//! Access tokens are three base64url segments, `header.payload.signature`,
//! where the signature is HMAC-SHA256 over `header.payload`. Identity proofs
//! embedded in email links use a shorter `payload.signature` form that never
//! expires and is deterministic for a given user and secret.
//!
//! Verification never reports *why* a token was rejected: every failure
//! collapses to `None`, and signatures are compared with [`Mac::verify_slice`],
//! which runs in constant time.

use anyhow::{anyhow, bail, Context, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Lifetime of an access token, in days.
pub const TOKEN_TTL_DAYS: i64 = 30;

const ALGORITHM: &str = "HS256";
const TOKEN_TYPE: &str = "JWT";

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    typ: String,
}

/// Payload carried by an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }
}

/// Signs an access token for `subject`, valid for [`TOKEN_TTL_DAYS`].
///
/// # Errors
///
/// Fails when `secret` is missing or empty. There is no unsigned fallback.
pub fn sign(subject: &str, display_name: Option<&str>, secret: Option<&str>) -> Result<String> {
    sign_at(subject, display_name, secret, Utc::now())
}

/// Same as [`sign`] with an explicit issue time.
pub fn sign_at(
    subject: &str,
    display_name: Option<&str>,
    secret: Option<&str>,
    issued_at: DateTime<Utc>,
) -> Result<String> {
    let secret = require_secret(secret)?;

    let header = encode_segment(&Header {
        alg: ALGORITHM.to_string(),
        typ: TOKEN_TYPE.to_string(),
    })?;
    let iat = issued_at.timestamp();
    let claims = Claims {
        sub: subject.to_string(),
        username: display_name
            .filter(|name| !name.is_empty())
            .map(String::from),
        iat,
        exp: iat + TOKEN_TTL_DAYS * 24 * 60 * 60,
    };
    let payload = encode_segment(&claims)?;

    let signing_input = format!("{}.{}", header, payload);
    let signature = URL_SAFE_NO_PAD.encode(compute_signature(secret, &signing_input)?);
    Ok(format!("{}.{}", signing_input, signature))
}

/// Returns the token's subject if it is authentic and unexpired.
pub fn verify(token: &str, secret: Option<&str>) -> Option<String> {
    verify_claims_at(token, secret, Utc::now()).map(|claims| claims.sub)
}

/// Returns the full claims if the token is authentic and unexpired at `now`.
pub fn verify_claims_at(token: &str, secret: Option<&str>, now: DateTime<Utc>) -> Option<Claims> {
    let secret = secret.filter(|s| !s.is_empty())?;

    let segments: Vec<&str> = token.split('.').collect();
    let [header, payload, signature] = segments.as_slice() else {
        return None;
    };
    if header.is_empty() || payload.is_empty() || signature.is_empty() {
        return None;
    }

    let provided = URL_SAFE_NO_PAD.decode(signature).ok()?;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(header.as_bytes());
    mac.update(b".");
    mac.update(payload.as_bytes());
    mac.verify_slice(&provided).ok()?;

    let header: Header = decode_segment(header)?;
    if header.alg != ALGORITHM {
        return None;
    }
    let claims: Claims = decode_segment(payload)?;
    (claims.exp > now.timestamp()).then_some(claims)
}

/// Decodes the payload of an access token WITHOUT checking its signature.
///
/// Only for local display (e.g. expiry in `status`); never for trust decisions.
pub fn peek_claims(token: &str) -> Option<Claims> {
    let segments: Vec<&str> = token.split('.').collect();
    let [_, payload, _] = segments.as_slice() else {
        return None;
    };
    decode_segment(payload)
}

/// Signs a two-segment identity proof for `user_id`. Deterministic, no expiry.
pub fn sign_simple(user_id: &str, secret: Option<&str>) -> Result<String> {
    let secret = require_secret(secret)?;
    let payload = URL_SAFE_NO_PAD.encode(user_id.as_bytes());
    let signature = URL_SAFE_NO_PAD.encode(compute_signature(secret, &payload)?);
    Ok(format!("{}.{}", payload, signature))
}

/// Returns the user id carried by a two-segment identity proof.
pub fn verify_simple(token: &str, secret: Option<&str>) -> Option<String> {
    let secret = secret.filter(|s| !s.is_empty())?;

    let segments: Vec<&str> = token.split('.').collect();
    let [payload, signature] = segments.as_slice() else {
        return None;
    };
    if payload.is_empty() || signature.is_empty() {
        return None;
    }

    let provided = URL_SAFE_NO_PAD.decode(signature).ok()?;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(payload.as_bytes());
    mac.verify_slice(&provided).ok()?;

    let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
    String::from_utf8(bytes).ok()
}

fn require_secret(secret: Option<&str>) -> Result<&str> {
    match secret {
        Some(secret) if !secret.is_empty() => Ok(secret),
        _ => bail!("Token signing secret is not configured"),
    }
}

fn compute_signature(secret: &str, signing_input: &str) -> Result<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| anyhow!("Invalid signing key: {}", e))?;
    mac.update(signing_input.as_bytes());
    Ok(mac.finalize().into_bytes().to_vec())
}

fn encode_segment<T: Serialize>(value: &T) -> Result<String> {
    let json = serde_json::to_vec(value).context("Failed to serialize token segment")?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

fn decode_segment<T: DeserializeOwned>(segment: &str) -> Option<T> {
    let bytes = URL_SAFE_NO_PAD.decode(segment).ok()?;
    serde_json::from_slice(&bytes).ok()
}

#[cfg(test)]
#[path = "tests/token_tests.rs"]
mod tests;
