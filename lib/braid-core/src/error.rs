//! Error types for braid.
//!
//! Errors never cross the pipeline as panics: every expected failure is
//! recorded on the [`crate::Response`] error slot. The [`ErrorKind`] of an
//! error decides its precedence when more than one stage fails.

use derive_more::{Display, Error, From};

// ============================================================================
// Error Kind
// ============================================================================

/// The pipeline stage an [`Error`] comes from.
///
/// Ordered by precedence: a construction error outranks a transport error,
/// which outranks a decode error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
pub enum ErrorKind {
    /// Set on the request before dispatch, nothing was sent.
    #[display("construction")]
    Construction,
    /// Failure during the network round trip.
    #[display("transport")]
    Transport,
    /// Failure turning the raw body into text.
    #[display("decode")]
    Decode,
}

// ============================================================================
// Error Type
// ============================================================================

/// Main error type for braid operations.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error, From)]
pub enum Error {
    /// URL parsing error.
    #[display("invalid URL: {_0}")]
    #[from]
    InvalidUrl(url::ParseError),

    /// Invalid request configuration.
    #[display("invalid request: {_0}")]
    #[from(skip)]
    InvalidRequest(#[error(not(source))] String),

    /// The per-request proxy could not be used.
    #[display("invalid proxy '{proxy}': {reason}")]
    #[from(skip)]
    InvalidProxy {
        /// Proxy address as given on the request.
        proxy: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Network/connection errors.
    #[display("connection error: {_0}")]
    #[from(skip)]
    Connection(#[error(not(source))] String),

    /// TLS/SSL errors.
    #[display("TLS error: {_0}")]
    #[from(skip)]
    Tls(#[error(not(source))] String),

    /// Request timeout.
    #[display("request timeout")]
    #[from(skip)]
    Timeout,

    /// The redirect chain exceeded the configured maximum.
    #[display("stopped after {max} redirects")]
    #[from(skip)]
    TooManyRedirects {
        /// Maximum number of redirects allowed.
        max: usize,
    },

    /// A redirect response could not be followed.
    #[display("invalid redirect: {_0}")]
    #[from(skip)]
    InvalidRedirect(#[error(not(source))] String),

    /// Reading the response body failed.
    #[display("body read error: {_0}")]
    #[from(skip)]
    Body(#[error(not(source))] String),

    /// The body is not valid in the declared charset.
    #[display("decode error: {_0}")]
    #[from(skip)]
    Decode(#[error(not(source))] String),

    /// The declared charset is not supported by the decoder.
    #[display("unsupported charset: {_0}")]
    #[from(skip)]
    UnsupportedCharset(#[error(not(source))] String),
}

/// Result type alias using [`crate::Error`].
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an invalid request error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Create an invalid proxy error.
    #[must_use]
    pub fn invalid_proxy(proxy: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidProxy {
            proxy: proxy.into(),
            reason: reason.into(),
        }
    }

    /// Create a connection error.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Create a TLS error.
    #[must_use]
    pub fn tls(message: impl Into<String>) -> Self {
        Self::Tls(message.into())
    }

    /// Create a body read error.
    #[must_use]
    pub fn body(message: impl Into<String>) -> Self {
        Self::Body(message.into())
    }

    /// Create a decode error.
    #[must_use]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }

    /// The pipeline stage this error belongs to.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidUrl(_) | Self::InvalidRequest(_) => ErrorKind::Construction,
            Self::InvalidProxy { .. }
            | Self::Connection(_)
            | Self::Tls(_)
            | Self::Timeout
            | Self::TooManyRedirects { .. }
            | Self::InvalidRedirect(_)
            | Self::Body(_) => ErrorKind::Transport,
            Self::Decode(_) | Self::UnsupportedCharset(_) => ErrorKind::Decode,
        }
    }

    /// Returns `true` if this is a timeout error.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }

    /// Returns `true` if this is a connection error.
    #[must_use]
    pub const fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = Error::Timeout;
        assert_eq!(err.to_string(), "request timeout");

        let err = Error::connection("failed to connect");
        assert_eq!(err.to_string(), "connection error: failed to connect");

        let err = Error::invalid_proxy("::nope", "relative URL without a base");
        insta::assert_snapshot!(err.to_string(), @"invalid proxy '::nope': relative URL without a base");

        let err = Error::TooManyRedirects { max: 10 };
        assert_eq!(err.to_string(), "stopped after 10 redirects");
    }

    #[test]
    fn error_from_url_parse() {
        let err = Error::from(url::ParseError::EmptyHost);
        assert_eq!(err, Error::InvalidUrl(url::ParseError::EmptyHost));
        assert_eq!(err.kind(), ErrorKind::Construction);
    }

    #[test]
    fn error_kinds() {
        assert_eq!(Error::invalid_request("x").kind(), ErrorKind::Construction);
        assert_eq!(Error::invalid_proxy("p", "r").kind(), ErrorKind::Transport);
        assert_eq!(Error::Timeout.kind(), ErrorKind::Transport);
        assert_eq!(Error::body("eof").kind(), ErrorKind::Transport);
        assert_eq!(
            Error::TooManyRedirects { max: 10 }.kind(),
            ErrorKind::Transport
        );
        assert_eq!(Error::decode("utf-8").kind(), ErrorKind::Decode);
        assert_eq!(
            Error::UnsupportedCharset("koi8-r".to_string()).kind(),
            ErrorKind::Decode
        );
    }

    #[test]
    fn error_kind_precedence() {
        assert!(ErrorKind::Construction < ErrorKind::Transport);
        assert!(ErrorKind::Transport < ErrorKind::Decode);
    }

    #[test]
    fn error_is_timeout() {
        assert!(Error::Timeout.is_timeout());
        assert!(!Error::connection("refused").is_timeout());
    }

    #[test]
    fn error_is_connection() {
        assert!(Error::connection("failed").is_connection());
        assert!(!Error::Timeout.is_connection());
    }
}
