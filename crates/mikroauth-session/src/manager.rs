//! The session manager: drives the magic-link session lifecycle.
//!
//! Every high-level operation lives here:
//! - Requesting and verifying magic links
//! - Saving, reading, and expiring the token pair
//! - Silent refresh, logout, and the sessions listing
//! - Extracting the (unverified) identity from the access token
//! - Consuming an incoming magic link from a host [`Location`]
//!
//! # Storage is the source of truth
//!
//! `SessionManager` holds no token state of its own. Each operation reads
//! the pair from [`Storage`] and writes it back, so a session cleared from
//! outside (another process, a user wiping data) is noticed on the very
//! next call.
//!
//! # Concurrency note
//!
//! Operations take `&self` and can run concurrently. The one place that
//! needs coordination is [`refresh`](SessionManager::refresh): refresh
//! tokens are single-use, so two overlapping refreshes would burn the
//! token twice and the second exchange would be rejected. Refreshes are
//! therefore single-flight. A caller that had to wait for another refresh
//! re-reads storage afterwards and, if the pair was already rotated,
//! returns it without a second network call.

use mikroauth_protocol::{
    Claims, LoginRequest, LogoutRequest, RefreshRequest, TokenResponse,
    VerifyRequest, decode_claims, error_message, from_body, paths, to_body,
};
use mikroauth_storage::Storage;
use mikroauth_transport::{AuthEndpoint, EndpointRequest, EndpointResponse};
use tokio::sync::Mutex;

use crate::link::{EMAIL_PARAM, TOKEN_PARAM};
use crate::{
    Clock, Location, SessionConfig, SessionError, SessionState, SystemClock,
    TokenPair,
};

const LOGIN_FAILED: &str = "Failed to request magic link";
const VERIFY_FAILED: &str = "Failed to verify magic link";
const REFRESH_FAILED: &str = "Failed to refresh session";
const LOGOUT_FAILED: &str = "Failed to log out";
const SESSIONS_FAILED: &str = "Failed to fetch sessions";
const STORE_FAILED: &str = "Failed to persist tokens";
const READ_FAILED: &str = "Failed to read stored tokens";
const MALFORMED_TOKENS: &str = "Stored token data is malformed";

/// How a logout completed.
#[derive(Debug, Clone, PartialEq)]
pub enum LogoutOutcome {
    /// The service acknowledged the logout; its body is attached.
    Remote(serde_json::Value),
    /// Nothing (or only half a pair) was stored, so the session was
    /// cleared locally without contacting the service.
    LocalOnly,
}

/// Orchestrates the magic-link session against an endpoint and a store.
///
/// ## Lifecycle
///
/// ```text
/// request_link() ──→ (email) ──→ verify_link() / handle_incoming_link()
///                                      │
///                                      ▼
///                                  [Valid] ──(time)──→ [Expired]
///                                   ↑   │                 │
///                     refresh() ok ─┘   │                 │ refresh() failed
///                                       ▼                 ▼
///                                   logout() ─────────→ [Absent]
/// ```
pub struct SessionManager<E, S, C = SystemClock> {
    endpoint: E,
    storage: S,
    clock: C,
    config: SessionConfig,
    /// Held for the duration of a refresh exchange.
    refresh_lock: Mutex<()>,
}

impl<E: AuthEndpoint, S: Storage> SessionManager<E, S, SystemClock> {
    /// Creates a manager that uses the system wall clock.
    pub fn new(endpoint: E, storage: S, config: SessionConfig) -> Self {
        Self::with_clock(endpoint, storage, SystemClock, config)
    }
}

impl<E, S, C> SessionManager<E, S, C>
where
    E: AuthEndpoint,
    S: Storage,
    C: Clock,
{
    /// Creates a manager with an explicit clock.
    pub fn with_clock(endpoint: E, storage: S, clock: C, config: SessionConfig) -> Self {
        Self {
            endpoint,
            storage,
            clock,
            config,
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn endpoint(&self) -> &E {
        &self.endpoint
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    // =====================================================================
    // Magic link
    // =====================================================================

    /// Asks the service to email a magic link to `email`.
    ///
    /// Returns the service's acknowledgement body as-is.
    ///
    /// # Errors
    /// [`SessionError::RequestFailed`] on a transport failure or non-2xx.
    pub async fn request_link(&self, email: &str) -> Result<serde_json::Value, SessionError> {
        tracing::debug!(email, "requesting magic link");

        let body = to_body(&LoginRequest {
            email: email.to_string(),
        })
        .map_err(|e| {
            tracing::warn!(error = %e, "failed to encode login request");
            SessionError::RequestFailed(LOGIN_FAILED.into())
        })?;

        let resp = self
            .endpoint
            .send(EndpointRequest::post(paths::LOGIN, body))
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "login request did not complete");
                SessionError::RequestFailed(LOGIN_FAILED.into())
            })?;

        if !resp.is_success() {
            return Err(SessionError::RequestFailed(error_message(
                &resp.body,
                LOGIN_FAILED,
            )));
        }

        Ok(ack_from_body(&resp.body))
    }

    /// Exchanges a magic-link token for a token pair and saves it.
    ///
    /// The link token is sent as the bearer credential; `email` goes in
    /// the body. On any failure, storage is left exactly as it was.
    ///
    /// # Errors
    /// - [`SessionError::VerificationFailed`] if the exchange fails.
    /// - [`SessionError::PersistenceFailed`] if the new pair can't be saved.
    pub async fn verify_link(&self, token: &str, email: &str) -> Result<TokenResponse, SessionError> {
        tracing::debug!(email, "verifying magic link");

        let body = to_body(&VerifyRequest {
            email: email.to_string(),
        })
        .map_err(|e| {
            tracing::warn!(error = %e, "failed to encode verify request");
            SessionError::VerificationFailed(VERIFY_FAILED.into())
        })?;

        let resp = self
            .endpoint
            .send(EndpointRequest::post(paths::VERIFY, body).with_bearer(token))
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "verify request did not complete");
                SessionError::VerificationFailed(VERIFY_FAILED.into())
            })?;

        if !resp.is_success() {
            return Err(SessionError::VerificationFailed(error_message(
                &resp.body,
                VERIFY_FAILED,
            )));
        }

        let tokens: TokenResponse = from_body(&resp.body).map_err(|e| {
            tracing::warn!(error = %e, "verify response is not a token pair");
            SessionError::VerificationFailed(VERIFY_FAILED.into())
        })?;

        self.save_tokens(&tokens).await?;
        tracing::info!("magic link verified, session started");
        Ok(tokens)
    }

    /// Reads `token` and `email` from `location` and verifies them.
    ///
    /// Returns `true` only if verification succeeded, in which case both
    /// parameters are stripped from the location. Missing parameters mean
    /// no network call at all. Never returns an error: failures are logged
    /// and reported as `false`.
    pub async fn handle_incoming_link<L>(&self, location: &L) -> bool
    where
        L: Location + ?Sized,
    {
        let (Some(token), Some(email)) = (
            location.query_param(TOKEN_PARAM),
            location.query_param(EMAIL_PARAM),
        ) else {
            tracing::debug!("no magic link parameters present");
            return false;
        };

        match self.verify_link(&token, &email).await {
            Ok(_) => {
                location.remove_query_params(&[TOKEN_PARAM, EMAIL_PARAM]);
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "incoming magic link was not accepted");
                false
            }
        }
    }

    // =====================================================================
    // Token storage
    // =====================================================================

    /// Persists a token response, overwriting whatever was stored.
    ///
    /// `expires_at` is computed here from the local clock.
    ///
    /// # Errors
    /// [`SessionError::PersistenceFailed`] if either token is empty or the
    /// store rejects the write.
    pub async fn save_tokens(&self, raw: &TokenResponse) -> Result<TokenPair, SessionError> {
        if raw.access_token.is_empty() || raw.refresh_token.is_empty() {
            return Err(SessionError::PersistenceFailed(
                "Token data is incomplete".into(),
            ));
        }

        let pair = TokenPair::from_response(raw, self.clock.now_millis());
        let serialized = serde_json::to_string(&pair).map_err(|e| {
            tracing::warn!(error = %e, "failed to serialize token pair");
            SessionError::PersistenceFailed(STORE_FAILED.into())
        })?;

        self.storage
            .store(&self.config.storage_key, &serialized)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "failed to store token pair");
                SessionError::PersistenceFailed(STORE_FAILED.into())
            })?;

        tracing::debug!(expires_at = pair.expires_at, "token pair saved");
        Ok(pair)
    }

    /// Reads the stored token pair, if any.
    ///
    /// # Errors
    /// [`SessionError::PersistenceFailed`] if the store fails or holds
    /// something that isn't a token pair.
    pub async fn get_tokens(&self) -> Result<Option<TokenPair>, SessionError> {
        let raw = self
            .storage
            .fetch(&self.config.storage_key)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "failed to read token pair");
                SessionError::PersistenceFailed(READ_FAILED.into())
            })?;

        let Some(raw) = raw else {
            return Ok(None);
        };

        serde_json::from_str(&raw).map(Some).map_err(|e| {
            tracing::warn!(error = %e, "stored token pair is malformed");
            SessionError::PersistenceFailed(MALFORMED_TOKENS.into())
        })
    }

    /// Returns the stored access token.
    pub async fn get_access_token(&self) -> Result<Option<String>, SessionError> {
        Ok(self.get_tokens().await?.map(|t| t.access_token))
    }

    /// Returns the stored refresh token.
    pub async fn get_refresh_token(&self) -> Result<Option<String>, SessionError> {
        Ok(self.get_tokens().await?.map(|t| t.refresh_token))
    }

    /// Removes the stored token pair. Other keys in the namespace stay.
    pub async fn clear_session(&self) -> Result<(), SessionError> {
        self.storage
            .remove(&self.config.storage_key)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "failed to remove token pair");
                SessionError::PersistenceFailed(STORE_FAILED.into())
            })?;
        tracing::info!("session cleared");
        Ok(())
    }

    /// Wipes the entire storage namespace, not just the token pair.
    pub async fn clear_storage(&self) -> Result<(), SessionError> {
        self.storage.clear().await.map_err(|e| {
            tracing::warn!(error = %e, "failed to clear storage namespace");
            SessionError::PersistenceFailed(STORE_FAILED.into())
        })
    }

    /// Clears the session, logging instead of failing. Used on paths that
    /// must end unauthenticated no matter what.
    async fn clear_session_quietly(&self) {
        if let Err(e) = self.clear_session().await {
            tracing::warn!(error = %e, "could not clear session");
        }
    }

    // =====================================================================
    // State
    // =====================================================================

    /// Returns the derived session state.
    ///
    /// # Errors
    /// [`SessionError::PersistenceFailed`] if storage can't be read.
    pub async fn session_state(&self) -> Result<SessionState, SessionError> {
        let tokens = self.get_tokens().await?;
        Ok(SessionState::of(
            tokens.as_ref(),
            self.clock.now_millis(),
            self.config.expiry_skew,
        ))
    }

    /// Returns `true` if there is no usable token pair.
    ///
    /// No stored pair counts as expired, and so does a store that can't be
    /// read. A pair is expired once `now >= expires_at - expiry_skew`.
    pub async fn is_expired(&self) -> bool {
        match self.session_state().await {
            Ok(state) => state != SessionState::Valid,
            Err(e) => {
                tracing::warn!(error = %e, "treating unreadable session as expired");
                true
            }
        }
    }

    /// Returns `true` if a usable session exists, refreshing silently if the
    /// stored pair has expired.
    ///
    /// Never returns an error: every failure reduces to `false`.
    pub async fn is_authenticated(&self) -> bool {
        let tokens = match self.get_tokens().await {
            Ok(Some(tokens)) => tokens,
            Ok(None) => return false,
            Err(e) => {
                tracing::warn!(error = %e, "cannot read session, not authenticated");
                return false;
            }
        };

        if tokens.access_token.is_empty() {
            return false;
        }
        if !tokens.is_expired_at(self.clock.now_millis(), self.config.expiry_skew) {
            return true;
        }

        tracing::debug!("access token expired, attempting silent refresh");
        match self.refresh().await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(error = %e, "silent refresh failed");
                false
            }
        }
    }

    // =====================================================================
    // Refresh
    // =====================================================================

    /// Exchanges the stored refresh token for a new pair and saves it.
    ///
    /// Single-flight: concurrent callers share one exchange (see the module
    /// docs).
    ///
    /// # Errors
    /// - [`SessionError::NoRefreshToken`] if nothing is stored. No network
    ///   call is made.
    /// - [`SessionError::RefreshFailed`] if the exchange or the save fails.
    ///   The session has been cleared by the time this is returned: a
    ///   refresh token that failed once can't be trusted to work later.
    pub async fn refresh(&self) -> Result<TokenResponse, SessionError> {
        let observed = match self.get_tokens().await {
            Ok(tokens) => tokens.map(|t| t.refresh_token),
            Err(e) => {
                tracing::warn!(error = %e, "cannot read session for refresh");
                self.clear_session_quietly().await;
                return Err(SessionError::RefreshFailed(REFRESH_FAILED.into()));
            }
        };
        let Some(observed) = observed.filter(|t| !t.is_empty()) else {
            return Err(SessionError::NoRefreshToken);
        };

        let _guard = self.refresh_lock.lock().await;

        // Another caller may have finished a refresh while we waited.
        let current = match self.get_tokens().await {
            Ok(Some(current)) => current,
            Ok(None) => return Err(SessionError::NoRefreshToken),
            Err(e) => {
                tracing::warn!(error = %e, "cannot read session for refresh");
                self.clear_session_quietly().await;
                return Err(SessionError::RefreshFailed(REFRESH_FAILED.into()));
            }
        };
        if current.refresh_token != observed {
            tracing::debug!("refresh already completed by a concurrent caller");
            return Ok(current.to_response());
        }

        match self.exchange_refresh_token(&current.refresh_token).await {
            Ok(tokens) => {
                tracing::info!("session refreshed");
                Ok(tokens)
            }
            Err(message) => {
                self.clear_session_quietly().await;
                Err(SessionError::RefreshFailed(message))
            }
        }
    }

    /// Calls `/refresh` and saves the result. Errors are the caller-safe
    /// message for [`SessionError::RefreshFailed`].
    async fn exchange_refresh_token(&self, refresh_token: &str) -> Result<TokenResponse, String> {
        let body = to_body(&RefreshRequest {
            refresh_token: refresh_token.to_string(),
        })
        .map_err(|e| {
            tracing::warn!(error = %e, "failed to encode refresh request");
            REFRESH_FAILED.to_string()
        })?;

        let resp = self
            .endpoint
            .send(EndpointRequest::post(paths::REFRESH, body))
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "refresh request did not complete");
                REFRESH_FAILED.to_string()
            })?;

        if !resp.is_success() {
            return Err(error_message(&resp.body, REFRESH_FAILED));
        }

        let tokens: TokenResponse = from_body(&resp.body).map_err(|e| {
            tracing::warn!(error = %e, "refresh response is not a token pair");
            REFRESH_FAILED.to_string()
        })?;

        self.save_tokens(&tokens).await.map_err(|e| {
            tracing::warn!(error = %e, "refreshed pair could not be saved");
            REFRESH_FAILED.to_string()
        })?;
        Ok(tokens)
    }

    // =====================================================================
    // Logout
    // =====================================================================

    /// Ends the session, remotely if possible and locally always.
    ///
    /// If either token is missing, the session is cleared locally and
    /// [`LogoutOutcome::LocalOnly`] is returned without a network call.
    /// Otherwise `/logout` is called with the access token as bearer, and
    /// the session is cleared afterwards whatever the outcome.
    ///
    /// # Errors
    /// [`SessionError::RequestFailed`] if the remote logout failed. The
    /// local session is already cleared when this is returned.
    pub async fn logout(&self) -> Result<LogoutOutcome, SessionError> {
        let tokens = match self.get_tokens().await {
            Ok(tokens) => tokens,
            Err(e) => {
                tracing::warn!(error = %e, "unreadable session, logging out locally");
                None
            }
        };

        let Some(tokens) = tokens
            .filter(|t| !t.access_token.is_empty() && !t.refresh_token.is_empty())
        else {
            self.clear_session_quietly().await;
            tracing::info!("logged out locally");
            return Ok(LogoutOutcome::LocalOnly);
        };

        let result = self.send_logout(&tokens).await;
        self.clear_session_quietly().await;

        let resp = result?;
        if !resp.is_success() {
            return Err(SessionError::RequestFailed(error_message(
                &resp.body,
                LOGOUT_FAILED,
            )));
        }

        tracing::info!("logged out");
        Ok(LogoutOutcome::Remote(ack_from_body(&resp.body)))
    }

    async fn send_logout(&self, tokens: &TokenPair) -> Result<EndpointResponse, SessionError> {
        let body = to_body(&LogoutRequest {
            refresh_token: tokens.refresh_token.clone(),
        })
        .map_err(|e| {
            tracing::warn!(error = %e, "failed to encode logout request");
            SessionError::RequestFailed(LOGOUT_FAILED.into())
        })?;

        self.endpoint
            .send(EndpointRequest::post(paths::LOGOUT, body).with_bearer(&tokens.access_token))
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "logout request did not complete");
                SessionError::RequestFailed(LOGOUT_FAILED.into())
            })
    }

    // =====================================================================
    // Authenticated calls
    // =====================================================================

    /// Lists the user's active sessions.
    ///
    /// On a 401 the manager refreshes once and retries the call once.
    ///
    /// # Errors
    /// - [`SessionError::Unauthenticated`] if no access token (or an empty
    ///   one) is stored.
    /// - [`SessionError::AuthenticationFailed`] if the refresh failed, or
    ///   the retry got another 401.
    /// - [`SessionError::RequestFailed`] for any other failure.
    pub async fn get_sessions(&self) -> Result<serde_json::Value, SessionError> {
        let access = self
            .get_access_token()
            .await?
            .filter(|t| !t.is_empty())
            .ok_or(SessionError::Unauthenticated)?;

        let resp = self.send_sessions(&access).await?;
        if !resp.is_unauthorized() {
            return sessions_from(resp);
        }

        tracing::debug!("sessions request unauthorized, refreshing once");
        if let Err(e) = self.refresh().await {
            tracing::warn!(error = %e, "refresh after 401 failed");
            return Err(SessionError::AuthenticationFailed);
        }

        let access = self
            .get_access_token()
            .await?
            .filter(|t| !t.is_empty())
            .ok_or(SessionError::Unauthenticated)?;
        let retry = self.send_sessions(&access).await?;
        if retry.is_unauthorized() {
            return Err(SessionError::AuthenticationFailed);
        }
        sessions_from(retry)
    }

    async fn send_sessions(&self, access_token: &str) -> Result<EndpointResponse, SessionError> {
        self.endpoint
            .send(EndpointRequest::get(paths::SESSIONS).with_bearer(access_token))
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "sessions request did not complete");
                SessionError::RequestFailed(SESSIONS_FAILED.into())
            })
    }

    // =====================================================================
    // Identity
    // =====================================================================

    /// Decodes the claims of the stored access token.
    ///
    /// The claims are NOT verified. Use them to show who is signed in, never
    /// to decide what someone is allowed to do.
    pub async fn get_identity(&self) -> Option<Claims> {
        match self.get_access_token().await {
            Ok(Some(token)) => decode_claims(&token),
            Ok(None) => None,
            Err(e) => {
                tracing::debug!(error = %e, "no identity: session unreadable");
                None
            }
        }
    }
}

/// Parses an implementation-defined acknowledgement body. JSON is kept as
/// JSON, an empty body becomes `null`, and anything else is kept as text.
fn ack_from_body(body: &[u8]) -> serde_json::Value {
    from_body(body).unwrap_or_else(|_| {
        serde_json::Value::String(String::from_utf8_lossy(body).into_owned())
    })
}

fn sessions_from(resp: EndpointResponse) -> Result<serde_json::Value, SessionError> {
    if !resp.is_success() {
        return Err(SessionError::RequestFailed(error_message(
            &resp.body,
            SESSIONS_FAILED,
        )));
    }
    from_body(&resp.body).map_err(|e| {
        tracing::warn!(error = %e, "sessions response is not JSON");
        SessionError::RequestFailed(SESSIONS_FAILED.into())
    })
}
