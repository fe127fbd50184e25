//! Error types for the QRNG client.

use serde_json::Value;
use std::fmt;
use thiserror::Error;

#[cfg(test)]
mod tests;

/// Diagnostic payload carried by every API failure.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorDetails {
    /// Human-readable message.
    pub message: String,
    /// HTTP status code, absent for transport-level failures.
    pub status_code: Option<u16>,
    /// Raw JSON body returned by the server, if any.
    pub response_body: Option<Value>,
}

impl ErrorDetails {
    /// Creates details with only a message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status_code: None,
            response_body: None,
        }
    }

    /// Attaches an HTTP status code.
    #[must_use]
    pub fn with_status(mut self, status_code: u16) -> Self {
        self.status_code = Some(status_code);
        self
    }

    /// Attaches the raw response body.
    #[must_use]
    pub fn with_body(mut self, body: Option<Value>) -> Self {
        self.response_body = body;
        self
    }
}

impl fmt::Display for ErrorDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Failure class of an [`Error`], for exhaustive matching without payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Any failure not covered by a more specific kind.
    Api,
    /// The API key was rejected (HTTP 401).
    Authentication,
    /// Too many requests (HTTP 429).
    RateLimit,
    /// Monthly quota exhausted (HTTP 402).
    QuotaExceeded,
    /// `connect` called on a session that is already connected.
    AlreadyConnected,
}

/// Client error types.
///
/// Callers should branch on the variant; status code and response body are
/// diagnostic only.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Generic API, transport or decoding failure.
    #[error("{0}")]
    Api(ErrorDetails),

    /// Authentication failed (invalid API key).
    #[error("{0}")]
    Authentication(ErrorDetails),

    /// Rate limit exceeded.
    #[error("{0}")]
    RateLimit(ErrorDetails),

    /// Monthly quota exceeded.
    #[error("{0}")]
    QuotaExceeded(ErrorDetails),

    /// The stream session already has a live connection.
    #[error("stream session is already connected")]
    AlreadyConnected,
}

impl Error {
    /// Creates a generic failure from a message.
    #[must_use]
    pub fn api(message: impl Into<String>) -> Self {
        Self::Api(ErrorDetails::new(message))
    }

    /// Builds the error of the given kind from an HTTP failure.
    ///
    /// [`ErrorKind::AlreadyConnected`] carries no details and ignores the
    /// other arguments.
    #[must_use]
    pub fn from_status(
        kind: ErrorKind,
        message: impl Into<String>,
        status_code: u16,
        response_body: Option<Value>,
    ) -> Self {
        let details = ErrorDetails::new(message)
            .with_status(status_code)
            .with_body(response_body);
        match kind {
            ErrorKind::Api => Self::Api(details),
            ErrorKind::Authentication => Self::Authentication(details),
            ErrorKind::RateLimit => Self::RateLimit(details),
            ErrorKind::QuotaExceeded => Self::QuotaExceeded(details),
            ErrorKind::AlreadyConnected => Self::AlreadyConnected,
        }
    }

    /// Returns the failure class.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Api(_) => ErrorKind::Api,
            Self::Authentication(_) => ErrorKind::Authentication,
            Self::RateLimit(_) => ErrorKind::RateLimit,
            Self::QuotaExceeded(_) => ErrorKind::QuotaExceeded,
            Self::AlreadyConnected => ErrorKind::AlreadyConnected,
        }
    }

    /// Returns the diagnostic details, if this variant carries any.
    #[must_use]
    pub fn details(&self) -> Option<&ErrorDetails> {
        match self {
            Self::Api(d) | Self::Authentication(d) | Self::RateLimit(d) | Self::QuotaExceeded(d) => {
                Some(d)
            }
            Self::AlreadyConnected => None,
        }
    }

    /// Human-readable message.
    #[must_use]
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// HTTP status code, when the failure came from an HTTP response.
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        self.details().and_then(|d| d.status_code)
    }

    /// Raw JSON body returned by the server, when one was available.
    #[must_use]
    pub fn response_body(&self) -> Option<&Value> {
        self.details().and_then(|d| d.response_body.as_ref())
    }
}
