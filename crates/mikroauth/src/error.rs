//! Unified error type for MikroAuth.

use mikroauth_protocol::ProtocolError;
use mikroauth_session::SessionError;
use mikroauth_storage::StorageError;
use mikroauth_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `mikroauth` facade crate, you deal with this single
/// error type instead of importing errors from each sub-crate.
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum MikroAuthError {
    /// The endpoint could not be configured or reached.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A body did not match its wire type.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The persistence backend failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// A session operation failed (verification, refresh, logout, ...).
    #[error(transparent)]
    Session(#[from] SessionError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::Connect("refused".into());
        let wrapped: MikroAuthError = err.into();
        assert!(matches!(wrapped, MikroAuthError::Transport(_)));
        assert!(wrapped.to_string().contains("refused"));
    }

    #[test]
    fn test_from_protocol_error() {
        let cause = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let wrapped: MikroAuthError = ProtocolError::Decode(cause).into();
        assert!(matches!(wrapped, MikroAuthError::Protocol(_)));
    }

    #[test]
    fn test_from_storage_error() {
        let wrapped: MikroAuthError = StorageError::InvalidKey("../x".into()).into();
        assert!(matches!(wrapped, MikroAuthError::Storage(_)));
        assert!(wrapped.to_string().contains("../x"));
    }

    #[test]
    fn test_from_session_error_is_transparent() {
        let wrapped: MikroAuthError = SessionError::NoRefreshToken.into();
        assert!(matches!(wrapped, MikroAuthError::Session(_)));
        assert_eq!(wrapped.to_string(), "no refresh token available");
    }
}
