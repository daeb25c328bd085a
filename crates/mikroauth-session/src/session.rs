//! Session types: the persisted token pair and the state derived from it.
//!
//! A "session" here has no storage of its own. It is whatever the
//! persisted [`TokenPair`] says it is:
//! - no pair stored → [`SessionState::Absent`]
//! - pair stored, not yet expired (minus skew) → [`SessionState::Valid`]
//! - pair stored, expired (minus skew) → [`SessionState::Expired`]

use std::fmt;
use std::time::Duration;

use mikroauth_protocol::TokenResponse;
use serde::{Deserialize, Serialize};

/// Storage key the token pair lives under unless configured otherwise.
pub const DEFAULT_STORAGE_KEY: &str = "mikroauth_tokens";

/// Token type assumed when the service doesn't send one.
pub const DEFAULT_TOKEN_TYPE: &str = "Bearer";

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Configuration for session behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Key the serialized [`TokenPair`] is stored under.
    ///
    /// Default: `"mikroauth_tokens"`.
    pub storage_key: String,

    /// Safety margin subtracted from the expiry instant.
    ///
    /// A token is treated as expired this long before the server would
    /// reject it, which absorbs clock drift and the time a request spends
    /// in flight. Default: 10 seconds.
    pub expiry_skew: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            expiry_skew: Duration::from_secs(10),
        }
    }
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// The current authentication state, derived from storage.
///
/// ```text
///              verify / refresh ok
///   Absent ─────────────────────────→ Valid
///     ↑  ↑                              │
///     │  │ logout / refresh failed      │ time passes
///     │  └──────────── Expired ←────────┘
///     │                   │
///     └─── logout ────────┘   (refresh ok → Valid)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Absent,
    Valid,
    Expired,
}

impl SessionState {
    /// Derives the state from an optional stored pair.
    pub fn of(tokens: Option<&TokenPair>, now_millis: i64, skew: Duration) -> Self {
        match tokens {
            None => Self::Absent,
            Some(pair) if pair.is_expired_at(now_millis, skew) => Self::Expired,
            Some(_) => Self::Valid,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absent => write!(f, "Absent"),
            Self::Valid => write!(f, "Valid"),
            Self::Expired => write!(f, "Expired"),
        }
    }
}

// ---------------------------------------------------------------------------
// TokenPair
// ---------------------------------------------------------------------------

/// The persisted credential material of a session.
///
/// `expires_at` is never taken from the server. It is computed once, when
/// the pair is saved, as `now + expires_in * 1000` using the local clock.
/// Every save writes a whole new pair; nothing patches fields in place.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Lifetime the server declared, in seconds.
    pub expires_in: u64,
    /// Absolute expiry, epoch milliseconds.
    pub expires_at: i64,
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

fn default_token_type() -> String {
    DEFAULT_TOKEN_TYPE.to_string()
}

impl TokenPair {
    /// Builds a pair from a token response received at `now_millis`.
    pub fn from_response(response: &TokenResponse, now_millis: i64) -> Self {
        let lifetime_ms = i64::try_from(response.expires_in)
            .unwrap_or(i64::MAX)
            .saturating_mul(1000);

        Self {
            access_token: response.access_token.clone(),
            refresh_token: response.refresh_token.clone(),
            expires_in: response.expires_in,
            expires_at: now_millis.saturating_add(lifetime_ms),
            token_type: response
                .token_type
                .clone()
                .unwrap_or_else(default_token_type),
        }
    }

    /// Returns `true` once `now_millis` has reached `expires_at - skew`.
    ///
    /// The boundary counts as expired: a pair whose `expires_at` equals
    /// `now + skew` exactly is already expired.
    pub fn is_expired_at(&self, now_millis: i64, skew: Duration) -> bool {
        let skew_ms = i64::try_from(skew.as_millis()).unwrap_or(i64::MAX);
        now_millis >= self.expires_at.saturating_sub(skew_ms)
    }

    /// Converts back to the wire shape returned to callers.
    pub fn to_response(&self) -> TokenResponse {
        TokenResponse {
            access_token: self.access_token.clone(),
            refresh_token: self.refresh_token.clone(),
            expires_in: self.expires_in,
            token_type: Some(self.token_type.clone()),
        }
    }
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("expires_in", &self.expires_in)
            .field("expires_at", &self.expires_at)
            .field("token_type", &self.token_type)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T0: i64 = 1_700_000_000_000;

    fn response(expires_in: u64) -> TokenResponse {
        TokenResponse {
            access_token: "x".into(),
            refresh_token: "y".into(),
            expires_in,
            token_type: None,
        }
    }

    #[test]
    fn test_from_response_derives_absolute_expiry() {
        let pair = TokenPair::from_response(&response(3600), T0);
        assert_eq!(pair.expires_at, T0 + 3_600_000);
        assert_eq!(pair.expires_in, 3600);
        assert_eq!(pair.token_type, "Bearer");
    }

    #[test]
    fn test_from_response_keeps_server_token_type() {
        let mut resp = response(60);
        resp.token_type = Some("DPoP".into());
        assert_eq!(TokenPair::from_response(&resp, T0).token_type, "DPoP");
    }

    #[test]
    fn test_from_response_huge_lifetime_saturates() {
        let pair = TokenPair::from_response(&response(u64::MAX), T0);
        assert_eq!(pair.expires_at, i64::MAX);
    }

    #[test]
    fn test_is_expired_at_boundary_counts_as_expired() {
        let skew = Duration::from_secs(10);
        let pair = TokenPair::from_response(&response(3600), T0);
        let boundary = pair.expires_at - 10_000;

        assert!(!pair.is_expired_at(boundary - 1, skew));
        assert!(pair.is_expired_at(boundary, skew));
        assert!(pair.is_expired_at(boundary + 1, skew));
    }

    #[test]
    fn test_is_expired_at_within_lifetime_is_valid() {
        let pair = TokenPair::from_response(&response(3600), T0);
        assert!(!pair.is_expired_at(T0 + 10_000, Duration::from_secs(10)));
        assert!(pair.is_expired_at(T0 + 3_599_995, Duration::from_secs(10)));
    }

    #[test]
    fn test_zero_lifetime_is_expired_immediately() {
        let pair = TokenPair::from_response(&response(0), T0);
        assert!(pair.is_expired_at(T0, Duration::ZERO));
    }

    #[test]
    fn test_stored_json_uses_camel_case_and_defaults_token_type() {
        let pair: TokenPair = serde_json::from_str(
            r#"{"accessToken":"a","refreshToken":"r","expiresIn":60,"expiresAt":5}"#,
        )
        .expect("should parse");
        assert_eq!(pair.token_type, "Bearer");
        assert_eq!(pair.expires_at, 5);

        let json = serde_json::to_value(&pair).expect("encode");
        assert_eq!(json["accessToken"], "a");
        assert_eq!(json["expiresAt"], 5);
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let pair = TokenPair::from_response(&response(1), T0);
        let printed = format!("{pair:?}");
        assert!(!printed.contains("\"x\""));
        assert!(printed.contains("<redacted>"));
    }

    #[test]
    fn test_session_state_of() {
        let skew = Duration::from_secs(10);
        let pair = TokenPair::from_response(&response(3600), T0);

        assert_eq!(SessionState::of(None, T0, skew), SessionState::Absent);
        assert_eq!(SessionState::of(Some(&pair), T0, skew), SessionState::Valid);
        assert_eq!(
            SessionState::of(Some(&pair), T0 + 3_600_000, skew),
            SessionState::Expired
        );
    }

    #[test]
    fn test_session_state_display() {
        assert_eq!(SessionState::Absent.to_string(), "Absent");
        assert_eq!(SessionState::Expired.to_string(), "Expired");
    }

    #[test]
    fn test_session_config_default() {
        let config = SessionConfig::default();
        assert_eq!(config.storage_key, "mikroauth_tokens");
        assert_eq!(config.expiry_skew, Duration::from_secs(10));
    }
}
