//! `MikroAuth` builder: wires an HTTP endpoint and a store into a
//! [`SessionManager`].

use std::time::Duration;

use mikroauth_session::{Clock, SessionConfig, SessionManager, SystemClock};
use mikroauth_storage::Storage;
use mikroauth_transport::{HttpEndpoint, HttpEndpointConfig};

use crate::MikroAuthError;

/// A session manager talking to the auth service over HTTP.
pub type MikroAuthClient<S, C = SystemClock> = SessionManager<HttpEndpoint, S, C>;

/// Entry point for building a [`MikroAuthClient`].
///
/// # Example
///
/// ```rust,no_run
/// use mikroauth::prelude::*;
///
/// # async fn run() -> Result<(), MikroAuthError> {
/// let auth = MikroAuth::builder()
///     .base_url("https://auth.example.com")
///     .build(MemoryStorage::new())?;
///
/// auth.request_link("ada@example.com").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct MikroAuth;

impl MikroAuth {
    /// Creates a new builder with default settings.
    pub fn builder() -> MikroAuthBuilder {
        MikroAuthBuilder::new()
    }
}

/// Builder for configuring a [`MikroAuthClient`].
#[derive(Debug, Clone, Default)]
pub struct MikroAuthBuilder {
    endpoint: HttpEndpointConfig,
    session: SessionConfig,
}

impl MikroAuthBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the base URL of the auth service.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.endpoint.base_url = url.into();
        self
    }

    /// Sets the per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.endpoint.timeout = timeout;
        self
    }

    /// Sets the `User-Agent` header.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.endpoint.user_agent = user_agent.into();
        self
    }

    /// Sets the key the token pair is stored under.
    pub fn storage_key(mut self, key: impl Into<String>) -> Self {
        self.session.storage_key = key.into();
        self
    }

    /// Sets the safety margin subtracted from the expiry instant.
    pub fn expiry_skew(mut self, skew: Duration) -> Self {
        self.session.expiry_skew = skew;
        self
    }

    /// Replaces the whole session configuration.
    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.session = config;
        self
    }

    /// Replaces the whole endpoint configuration.
    pub fn endpoint_config(mut self, config: HttpEndpointConfig) -> Self {
        self.endpoint = config;
        self
    }

    /// Builds the client on top of `storage`.
    ///
    /// # Errors
    /// [`MikroAuthError::Transport`] if the base URL is invalid or the
    /// HTTP client can't be created.
    pub fn build<S: Storage>(self, storage: S) -> Result<MikroAuthClient<S>, MikroAuthError> {
        self.build_with_clock(storage, SystemClock)
    }

    /// Like [`build`](Self::build), but expiry math uses `clock`.
    pub fn build_with_clock<S, C>(
        self,
        storage: S,
        clock: C,
    ) -> Result<MikroAuthClient<S, C>, MikroAuthError>
    where
        S: Storage,
        C: Clock,
    {
        let endpoint = HttpEndpoint::new(self.endpoint)?;
        tracing::info!(
            base_url = endpoint.base_url(),
            storage_key = %self.session.storage_key,
            "MikroAuth client ready"
        );
        Ok(SessionManager::with_clock(endpoint, storage, clock, self.session))
    }
}
