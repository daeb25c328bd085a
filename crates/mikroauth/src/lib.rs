//! # MikroAuth
//!
//! Client-side session manager for the MikroAuth passwordless service.
//!
//! A user asks for a magic link by email, clicks it, and lands back in the
//! application with a one-time token. MikroAuth exchanges that token for
//! an access/refresh pair, persists it, keeps it fresh, and clears it on
//! logout. The application only ever asks two questions: "is someone
//! signed in?" and "who?".
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mikroauth::prelude::*;
//!
//! # async fn run() -> Result<(), MikroAuthError> {
//! let auth = MikroAuth::builder()
//!     .base_url("https://auth.example.com")
//!     .build(FileStorage::new("/var/lib/my-app/session"))?;
//!
//! // 1. Send the link.
//! auth.request_link("ada@example.com").await?;
//!
//! // 2. The user clicks it; the app is opened on the link URL.
//! let location = UrlLocation::parse(
//!     "myapp://signin?token=abc&email=ada%40example.com",
//! ).expect("valid url");
//! if auth.handle_incoming_link(&location).await {
//!     let who = auth.get_identity().await;
//!     println!("signed in as {:?}", who.and_then(|c| c.subject_email));
//! }
//!
//! // 3. Later.
//! if auth.is_authenticated().await {
//!     let sessions = auth.get_sessions().await?;
//!     println!("{sessions}");
//! }
//! auth.logout().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Crates
//!
//! | Crate | Role |
//! |-------|------|
//! | `mikroauth-transport` | Requests to the auth service |
//! | `mikroauth-protocol` | Wire bodies and token claims |
//! | `mikroauth-storage` | Where the token pair lives |
//! | `mikroauth-session` | The session lifecycle |

#[cfg(feature = "http")]
mod builder;
mod error;

#[cfg(feature = "http")]
pub use builder::{MikroAuth, MikroAuthBuilder, MikroAuthClient};
pub use error::MikroAuthError;

pub use mikroauth_protocol as protocol;
pub use mikroauth_session as session;
pub use mikroauth_storage as storage;
pub use mikroauth_transport as transport;

/// Installs a `tracing` subscriber that prints to stderr.
///
/// The filter comes from `RUST_LOG`, falling back to `info`. Calling this
/// more than once, or after another subscriber was installed, is a no-op.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Everything an application typically needs.
pub mod prelude {
    #[cfg(feature = "http")]
    pub use crate::{MikroAuth, MikroAuthBuilder, MikroAuthClient};
    pub use crate::{MikroAuthError, init_tracing};
    pub use mikroauth_protocol::{Claims, TokenResponse};
    pub use mikroauth_session::{
        Clock, Location, LogoutOutcome, SessionConfig, SessionError, SessionManager,
        SessionState, SystemClock, TokenPair, UrlLocation,
    };
    pub use mikroauth_storage::{FileStorage, MemoryStorage, Storage};
    #[cfg(feature = "http")]
    pub use mikroauth_transport::{HttpEndpoint, HttpEndpointConfig};
    pub use mikroauth_transport::{AuthEndpoint, EndpointRequest, EndpointResponse};
}
