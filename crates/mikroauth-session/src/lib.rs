//! Magic-link session management for MikroAuth.
//!
//! This crate owns the lifecycle of a user's session on the client side:
//!
//! 1. **Sign-in**: request a magic link, then verify the token it carries
//!    ([`SessionManager::request_link`], [`SessionManager::verify_link`],
//!    [`SessionManager::handle_incoming_link`])
//! 2. **Persistence**: the [`TokenPair`] lives in a pluggable
//!    [`Storage`](mikroauth_storage::Storage), with a locally computed
//!    absolute expiry
//! 3. **Staying signed in**: expiry checks with a safety skew, silent
//!    single-flight refresh, and one refresh-and-retry on `401`
//! 4. **Sign-out**: remote logout when possible, local clearing always
//!
//! # How it fits in the stack
//!
//! ```text
//! Application (above)      ← asks "am I signed in?", "who am I?"
//!     ↕
//! Session Layer (this crate)  ← token lifecycle, refresh, logout
//!     ↕                ↕
//! Protocol Layer     Storage Layer  ← typed bodies / persisted pair
//!     ↕
//! Transport Layer (below)  ← requests to the auth service
//! ```

mod clock;
mod error;
mod link;
mod manager;
mod session;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::SessionError;
pub use link::{EMAIL_PARAM, Location, TOKEN_PARAM, UrlLocation};
pub use manager::{LogoutOutcome, SessionManager};
pub use session::{
    DEFAULT_STORAGE_KEY, DEFAULT_TOKEN_TYPE, SessionConfig, SessionState, TokenPair,
};
