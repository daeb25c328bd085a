//! Request and response bodies exchanged with the remote auth service.
//!
//! Every type here maps to a JSON body on one of the endpoint paths:
//!
//! | Path        | Request           | Success response   |
//! |-------------|-------------------|--------------------|
//! | `/login`    | [`LoginRequest`]  | implementation-defined ack |
//! | `/verify`   | [`VerifyRequest`] | [`TokenResponse`]  |
//! | `/refresh`  | [`RefreshRequest`]| [`TokenResponse`]  |
//! | `/logout`   | [`LogoutRequest`] | implementation-defined ack |
//! | `/sessions` | (none)            | implementation-defined list |
//!
//! Field names on the wire are camelCase (`accessToken`, `expiresIn`), so
//! every struct carries `#[serde(rename_all = "camelCase")]`.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Paths
// ---------------------------------------------------------------------------

/// Endpoint paths, relative to the auth service base URL.
pub mod paths {
    pub const LOGIN: &str = "/login";
    pub const VERIFY: &str = "/verify";
    pub const REFRESH: &str = "/refresh";
    pub const LOGOUT: &str = "/logout";
    pub const SESSIONS: &str = "/sessions";
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Body of `POST /login`: asks the service to email a magic link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
}

/// Body of `POST /verify`. The magic-link token itself travels in the
/// `Authorization` header, not here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    pub email: String,
}

/// Body of `POST /refresh`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Body of `POST /logout`. Sent alongside the access token as bearer so
/// the service can revoke the refresh token too.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutRequest {
    pub refresh_token: String,
}

impl fmt::Debug for RefreshRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshRequest")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

impl fmt::Debug for LogoutRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogoutRequest")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// Token material returned by `/verify` and `/refresh`.
///
/// `expires_in` is the lifetime the server declares, in seconds. It is
/// relative on purpose: the client turns it into an absolute instant with
/// its own clock when the tokens are saved.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
}

impl fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("expires_in", &self.expires_in)
            .field("token_type", &self.token_type)
            .finish()
    }
}

/// Error body the service attaches to non-2xx responses.
///
/// Everything is optional: a proxy error page or an empty body must still
/// produce a usable message (see [`error_message`]).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Extracts the human-readable `message` from an error body.
///
/// Returns `fallback` when the body is empty, not JSON, has no `message`,
/// or the message is blank. Never fails.
pub fn error_message(body: &[u8], fallback: &str) -> String {
    serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

/// Serializes a request body into a JSON value for the transport layer.
pub fn to_body<T: Serialize>(value: &T) -> Result<serde_json::Value, ProtocolError> {
    serde_json::to_value(value).map_err(ProtocolError::Encode)
}

/// Parses a success body into the expected response type.
///
/// An empty body parses as JSON `null`, so acknowledgements from services
/// that answer `204 No Content` still decode into `serde_json::Value`.
pub fn from_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, ProtocolError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return serde_json::from_slice(b"null").map_err(ProtocolError::Decode);
    }
    serde_json::from_slice(body).map_err(ProtocolError::Decode)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_token_response_parses_camel_case() {
        let resp: TokenResponse = from_body(
            br#"{"accessToken":"x","refreshToken":"y","expiresIn":3600}"#,
        )
        .expect("should parse");

        assert_eq!(resp.access_token, "x");
        assert_eq!(resp.refresh_token, "y");
        assert_eq!(resp.expires_in, 3600);
        assert_eq!(resp.token_type, None);
    }

    #[test]
    fn test_token_response_keeps_token_type() {
        let resp: TokenResponse = from_body(
            br#"{"accessToken":"x","refreshToken":"y","expiresIn":60,"tokenType":"DPoP"}"#,
        )
        .expect("should parse");
        assert_eq!(resp.token_type.as_deref(), Some("DPoP"));
    }

    #[test]
    fn test_token_response_missing_refresh_token_fails() {
        let result: Result<TokenResponse, _> =
            from_body(br#"{"accessToken":"x","expiresIn":60}"#);
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_token_response_negative_expiry_fails() {
        let result: Result<TokenResponse, _> = from_body(
            br#"{"accessToken":"x","refreshToken":"y","expiresIn":-5}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_token_response_debug_redacts_tokens() {
        let resp = TokenResponse {
            access_token: "secret-access".into(),
            refresh_token: "secret-refresh".into(),
            expires_in: 1,
            token_type: None,
        };
        let printed = format!("{resp:?}");
        assert!(!printed.contains("secret-access"));
        assert!(!printed.contains("secret-refresh"));
    }

    #[test]
    fn test_request_bodies_serialize_camel_case() {
        let refresh = to_body(&RefreshRequest {
            refresh_token: "r".into(),
        })
        .expect("encode");
        assert_eq!(refresh, json!({ "refreshToken": "r" }));

        let login = to_body(&LoginRequest {
            email: "a@b.com".into(),
        })
        .expect("encode");
        assert_eq!(login, json!({ "email": "a@b.com" }));
    }

    #[test]
    fn test_error_message_uses_server_message() {
        assert_eq!(
            error_message(br#"{"message":"Link expired"}"#, "fallback"),
            "Link expired"
        );
    }

    #[test]
    fn test_error_message_falls_back_on_garbage() {
        assert_eq!(error_message(b"", "fallback"), "fallback");
        assert_eq!(error_message(b"<html>502</html>", "fallback"), "fallback");
        assert_eq!(error_message(br#"{"error":"x"}"#, "fallback"), "fallback");
        assert_eq!(error_message(br#"{"message":"  "}"#, "fallback"), "fallback");
        assert_eq!(error_message(br#"{"message":42}"#, "fallback"), "fallback");
    }

    #[test]
    fn test_from_body_empty_is_null_value() {
        let value: serde_json::Value = from_body(b"").expect("empty is null");
        assert!(value.is_null());
    }
}
