//! Error types for the protocol layer.
//!
//! Each crate in MikroAuth defines its own error enum. A `ProtocolError`
//! always means a body could not be turned into (or out of) one of the
//! wire types; it says nothing about the network or storage.

/// Errors that can occur while encoding or decoding wire bodies.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serializing a request body failed.
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// A response body did not match the expected shape.
    ///
    /// Common causes: the server returned HTML from a proxy, a required
    /// field such as `accessToken` is missing, or `expiresIn` is negative.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),
}
