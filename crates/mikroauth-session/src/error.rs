//! Error types for the session layer.

/// Errors surfaced by [`SessionManager`](crate::SessionManager) operations.
///
/// Messages are safe to show to a user: they are either the `message` the
/// auth service sent back or a fixed fallback. Raw transport and storage
/// errors are logged where they happen and never embedded here.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// The auth service rejected the request or could not be reached.
    /// No local session state was changed.
    #[error("request failed: {0}")]
    RequestFailed(String),

    /// The magic-link token was rejected. Any stored session is untouched.
    #[error("verification failed: {0}")]
    VerificationFailed(String),

    /// A refresh was attempted with no refresh token stored.
    #[error("no refresh token available")]
    NoRefreshToken,

    /// The refresh exchange failed. The stored session has been cleared
    /// by the time the caller sees this.
    #[error("refresh failed: {0}")]
    RefreshFailed(String),

    /// Reading or writing the persisted tokens failed, or the stored data
    /// could not be parsed.
    #[error("persistence failed: {0}")]
    PersistenceFailed(String),

    /// The operation needs an access token and none is stored.
    #[error("not authenticated")]
    Unauthenticated,

    /// The service kept answering 401 after a refresh attempt.
    #[error("authentication failed")]
    AuthenticationFailed,
}
