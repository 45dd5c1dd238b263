//! Transport trait: one physical HTTP exchange.
//!
//! The pipeline's terminal handler is the only caller. Implementations must
//! be safe to share between tasks: any connection pool or cookie store they
//! keep has to be internally synchronized.

use std::collections::HashMap;
use std::future::Future;

use bytes::Bytes;
use url::Url;

use crate::{Request, Result};

/// Raw outcome of a successful round trip: status, headers and the fully
/// drained body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: HashMap<String, String>,
    /// Complete response body.
    pub body: Bytes,
}

impl RawResponse {
    /// Creates a new raw response.
    #[must_use]
    pub fn new(status: u16, headers: HashMap<String, String>, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }
}

/// Performs one HTTP round trip for a fully prepared request.
///
/// The transport never retries and never inspects the request's error slot;
/// both are pipeline concerns.
pub trait Transport: Send + Sync + 'static {
    /// Execute the request and drain the response body.
    ///
    /// `proxy` is the already-parsed per-request proxy. It applies to this
    /// call only and must not change any shared configuration.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the exchange fails:
    /// - Network errors
    /// - TLS errors
    /// - Timeouts
    /// - Body read failures
    fn round_trip(
        &self,
        request: &Request,
        proxy: Option<&Url>,
    ) -> impl Future<Output = Result<RawResponse>> + Send;
}
