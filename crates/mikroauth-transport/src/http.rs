//! HTTP endpoint implementation using `reqwest`.

use std::time::Duration;

use crate::{AuthEndpoint, EndpointRequest, EndpointResponse, Method, TransportError};

/// Connection settings for [`HttpEndpoint`].
#[derive(Debug, Clone)]
pub struct HttpEndpointConfig {
    /// Base URL of the auth service, e.g. `https://auth.example.com/v1`.
    /// Endpoint paths like `/login` are appended to it.
    pub base_url: String,

    /// Upper bound for a single request, connect through body.
    ///
    /// Default: 10 seconds.
    pub timeout: Duration,

    /// Value of the `User-Agent` header.
    pub user_agent: String,
}

impl Default for HttpEndpointConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            timeout: Duration::from_secs(10),
            user_agent: concat!("mikroauth/", env!("CARGO_PKG_VERSION"))
                .to_string(),
        }
    }
}

/// An [`AuthEndpoint`] that speaks JSON over HTTP.
#[derive(Debug, Clone)]
pub struct HttpEndpoint {
    client: reqwest::Client,
    base_url: String,
}

impl HttpEndpoint {
    /// Builds an endpoint from the given config.
    ///
    /// # Errors
    /// - [`TransportError::InvalidBaseUrl`] if `base_url` is not an
    ///   absolute URL.
    /// - [`TransportError::Request`] if the HTTP client cannot be built.
    pub fn new(config: HttpEndpointConfig) -> Result<Self, TransportError> {
        let parsed = url::Url::parse(config.base_url.trim()).map_err(|e| {
            TransportError::InvalidBaseUrl(format!("{}: {e}", config.base_url))
        })?;
        if parsed.cannot_be_a_base() {
            return Err(TransportError::InvalidBaseUrl(config.base_url));
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent)
            .build()
            .map_err(|e| TransportError::Request(e.to_string()))?;

        let base_url = parsed.as_str().trim_end_matches('/').to_string();
        tracing::debug!(%base_url, "HTTP auth endpoint configured");

        Ok(Self { client, base_url })
    }

    /// Returns the normalized base URL (no trailing slash).
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim().trim_start_matches('/'))
    }
}

impl AuthEndpoint for HttpEndpoint {
    async fn send(
        &self,
        request: EndpointRequest,
    ) -> Result<EndpointResponse, TransportError> {
        let url = self.url_for(&request.path);

        let mut builder = match request.method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
        };
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(map_request_error)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(map_request_error)?;

        tracing::debug!(
            method = %request.method,
            path = %request.path,
            status,
            "auth endpoint responded"
        );

        Ok(EndpointResponse::new(status, body.to_vec()))
    }
}

/// Maps `reqwest` failures onto transport errors with timeout detection.
fn map_request_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else if err.is_connect() {
        TransportError::Connect(err.to_string())
    } else {
        TransportError::Request(err.to_string())
    }
}
