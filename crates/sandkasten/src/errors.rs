//! Error taxonomy for the sandbox client.
//!
//! Every operation terminates in one of: success, a usage error raised before
//! any I/O, a transport failure (no HTTP status obtained), an API failure
//! (non-2xx status with the raw body preserved), a stream-protocol failure
//! (in-band `error` event on an established stream), or a decode failure
//! (malformed JSON or base64 in a 2xx body).

use thiserror::Error;

/// Caller supplied an invalid argument; no request was sent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UsageError {
    pub message: String,
}

impl UsageError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Connection, DNS, or timeout failure before an HTTP status was obtained.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransportError {
    pub operation: String,
    pub path: String,
    pub message: String,
}

impl TransportError {
    pub fn new(
        operation: impl Into<String>,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            operation: operation.into(),
            path: path.into(),
            message: message.into(),
        }
    }
}

/// The daemon answered with a non-2xx status. The body is kept verbatim.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiError {
    pub operation: String,
    pub path: String,
    pub status_code: u16,
    pub body: String,
}

impl ApiError {
    pub fn new(
        operation: impl Into<String>,
        path: impl Into<String>,
        status_code: u16,
        body: impl Into<String>,
    ) -> Self {
        Self {
            operation: operation.into(),
            path: path.into(),
            status_code,
            body: body.into(),
        }
    }
}

/// An `error` SSE event arrived after the stream was established with 2xx.
///
/// Distinct from [`TransportError`]: the HTTP layer saw success and only the
/// application-level stream contract failed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamProtocolError {
    pub session_id: String,
    pub message: String,
}

impl StreamProtocolError {
    pub fn new(session_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            message: message.into(),
        }
    }
}

/// A 2xx body could not be decoded (invalid JSON or base64).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodeError {
    pub operation: String,
    pub message: String,
}

impl DecodeError {
    pub fn new(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            message: message.into(),
        }
    }
}

/// Unified client error type.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error("{0}")]
    Usage(UsageError),
    #[error("{0}")]
    Transport(TransportError),
    #[error("{0}")]
    Api(ApiError),
    #[error("{0}")]
    Stream(StreamProtocolError),
    #[error("{0}")]
    Decode(DecodeError),
}

impl std::fmt::Display for UsageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {}: transport error: {}",
            self.operation, self.path, self.message
        )
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {}: API error {}: {}",
            self.operation, self.path, self.status_code, self.body
        )
    }
}

impl std::fmt::Display for StreamProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "exec stream for session {}: {}",
            self.session_id, self.message
        )
    }
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: decode error: {}", self.operation, self.message)
    }
}

impl ClientError {
    pub fn usage(message: impl Into<String>) -> Self {
        ClientError::Usage(UsageError::new(message))
    }

    /// HTTP status code of an API failure, if this is one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ClientError::Api(err) => Some(err.status_code),
            _ => None,
        }
    }
}
