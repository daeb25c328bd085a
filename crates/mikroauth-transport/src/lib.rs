//! Transport abstraction layer for MikroAuth.
//!
//! Provides the [`AuthEndpoint`] trait that abstracts over how requests
//! reach the remote auth service. The session layer only ever builds an
//! [`EndpointRequest`] and reads back an [`EndpointResponse`]; whether that
//! travels over HTTP, a test double, or something else is decided here.
//!
//! # Feature Flags
//!
//! - `http` (default): HTTP transport via `reqwest`

mod error;
#[cfg(feature = "http")]
mod http;

pub use error::TransportError;
#[cfg(feature = "http")]
pub use http::{HttpEndpoint, HttpEndpointConfig};

use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// HTTP-like method of an endpoint call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
        }
    }
}

/// A single call to the remote auth service.
///
/// `bearer` is sent as `Authorization: Bearer <token>` when present.
/// `Debug` is implemented by hand so the bearer token never shows up in
/// logs or panic messages.
#[derive(Clone, PartialEq)]
pub struct EndpointRequest {
    pub method: Method,
    pub path: String,
    pub bearer: Option<String>,
    pub body: Option<serde_json::Value>,
}

impl EndpointRequest {
    /// Creates a `GET` request with no body.
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            bearer: None,
            body: None,
        }
    }

    /// Creates a `POST` request carrying a JSON body.
    pub fn post(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            bearer: None,
            body: Some(body),
        }
    }

    /// Attaches a bearer credential.
    pub fn with_bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }
}

impl fmt::Debug for EndpointRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointRequest")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("bearer", &self.bearer.as_ref().map(|_| "<redacted>"))
            .field("body", &self.body.is_some())
            .finish()
    }
}

/// What came back from the remote auth service.
///
/// The body is kept as raw bytes: success bodies are parsed by the caller
/// into whatever shape the path returns, and error bodies may not be JSON
/// at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl EndpointResponse {
    /// Creates a response from a status code and raw body.
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Returns `true` for any 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Returns `true` for HTTP 401.
    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }
}

/// Sends requests to the remote auth service.
///
/// # Trait bounds
///
/// - `Send + Sync` → one endpoint is shared by every operation of the
///   session manager, possibly from several Tokio tasks at once.
/// - `'static` → the endpoint owns its client and configuration.
///
/// Implementations should only return `Err` when there is no response to
/// hand back (unreachable host, timeout). Any status code the server
/// produced belongs in `Ok(EndpointResponse)`.
pub trait AuthEndpoint: Send + Sync + 'static {
    /// Sends one request and waits for its response.
    fn send(
        &self,
        request: EndpointRequest,
    ) -> impl Future<Output = Result<EndpointResponse, TransportError>> + Send;
}

impl<T: AuthEndpoint> AuthEndpoint for Arc<T> {
    fn send(
        &self,
        request: EndpointRequest,
    ) -> impl Future<Output = Result<EndpointResponse, TransportError>> + Send
    {
        (**self).send(request)
    }
}
