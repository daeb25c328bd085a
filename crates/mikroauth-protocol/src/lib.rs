//! Wire protocol for MikroAuth.
//!
//! This crate defines what the client and the auth service say to each
//! other, plus the one thing the client reads out of a token by itself:
//!
//! - **Types** ([`TokenResponse`], [`LoginRequest`], etc.): JSON bodies
//!   for each endpoint path, and [`error_message`] for non-2xx bodies.
//! - **Codec** ([`decode_claims`], [`Claims`]): unverified decoding of
//!   an access token's payload.
//! - **Errors** ([`ProtocolError`]): bodies that didn't match a type.
//!
//! # Architecture
//!
//! ```text
//! Transport (status + bytes) → Protocol (typed bodies) → Session (token lifecycle)
//! ```

mod codec;
mod error;
mod types;

pub use codec::{Claims, decode_claims};
pub use error::ProtocolError;
pub use types::{
    ErrorBody, LoginRequest, LogoutRequest, RefreshRequest, TokenResponse,
    VerifyRequest, error_message, from_body, paths, to_body,
};
