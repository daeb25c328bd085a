/// Errors that can occur while talking to the remote auth endpoint.
///
/// A non-2xx response is NOT a transport error: the request made it to the
/// server and back, so the caller gets an
/// [`EndpointResponse`](crate::EndpointResponse) and decides what the
/// status means. These variants cover the cases where no response exists.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The configured base URL could not be parsed.
    #[error("invalid base url: {0}")]
    InvalidBaseUrl(String),

    /// The request did not complete within the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// The server could not be reached at all.
    #[error("connection failed: {0}")]
    Connect(String),

    /// Building, sending, or reading the request failed.
    #[error("request failed: {0}")]
    Request(String),
}
