//! Token codec: reads the claims embedded in an access token.
//!
//! Access tokens are compact signed tokens: `header.payload.signature`,
//! each segment base64url-encoded. The payload is a JSON object of claims.
//! [`decode_claims`] pulls that object out so the client can show who is
//! signed in.
//!
//! # Not a verifier
//!
//! Nothing here checks the signature, issuer, audience, or `exp`. The
//! token is data the client happens to hold; anyone could have written it.
//! A decoded [`Claims`] is a display convenience and must never be treated
//! as proof of identity. Only the auth service can vouch for a token.

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Standard alphabet, padding optional. Payload segments arrive unpadded
/// from most issuers but some pad them; both must decode.
const PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Identity claims carried in an access token payload.
///
/// Recomputed on every identity lookup; never cached. Each field is read
/// on its own: a claim with an unexpected shape is dropped (to `None` or
/// an empty map) without losing the others.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// The subject, which for magic-link sessions is the user's email.
    #[serde(rename = "sub", default, deserialize_with = "lenient_string")]
    pub subject_email: Option<String>,

    /// When the user last signed in, as the service reports it. Integral
    /// floats are accepted; anything that isn't a number is dropped.
    #[serde(rename = "lastLogin", default, deserialize_with = "lenient_timestamp")]
    pub last_login_timestamp: Option<i64>,

    /// Free-form data the service attached to the user. `null` or a
    /// non-object value reads as empty.
    #[serde(default, deserialize_with = "lenient_map")]
    pub metadata: Map<String, Value>,
}

fn lenient_string<'de, D: Deserializer<'de>>(de: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(de)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

fn lenient_timestamp<'de, D: Deserializer<'de>>(de: D) -> Result<Option<i64>, D::Error> {
    Ok(match Value::deserialize(de)? {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.fract() == 0.0)
                .map(|f| f as i64)
        }),
        _ => None,
    })
}

fn lenient_map<'de, D: Deserializer<'de>>(de: D) -> Result<Map<String, Value>, D::Error> {
    Ok(match Value::deserialize(de)? {
        Value::Object(map) => map,
        _ => Map::new(),
    })
}

/// Decodes the claims from a token's payload segment.
///
/// Steps: take the second `.`-separated segment, map the URL-safe
/// characters back (`-` → `+`, `_` → `/`), base64-decode, then parse the
/// bytes as UTF-8 JSON.
///
/// Returns `None` for anything malformed: fewer than two segments, an
/// empty payload, bad base64, invalid UTF-8, or JSON that isn't a claims
/// object. A bad token is an expected condition here, not a bug, so this
/// never panics and never returns an error.
pub fn decode_claims(token: &str) -> Option<Claims> {
    let payload = token.split('.').nth(1)?;
    if payload.is_empty() {
        return None;
    }

    let standard: String = payload
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();

    let bytes = match PAYLOAD_ENGINE.decode(standard.as_bytes()) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::debug!(error = %e, "token payload is not valid base64");
            return None;
        }
    };

    // `from_slice` rejects invalid UTF-8, which covers the percent-decoding
    // step browsers need for non-ASCII claims.
    let payload = match serde_json::from_slice::<Value>(&bytes) {
        Ok(payload @ Value::Object(_)) => payload,
        Ok(_) => {
            tracing::debug!("token payload is not a JSON object");
            return None;
        }
        Err(e) => {
            tracing::debug!(error = %e, "token payload is not JSON");
            return None;
        }
    };

    match Claims::deserialize(payload) {
        Ok(claims) => Some(claims),
        Err(e) => {
            tracing::debug!(error = %e, "token payload is not a claims object");
            None
        }
    }
}
