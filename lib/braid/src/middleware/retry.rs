//! Retry middleware for HTTP requests.
//!
//! This module provides a retry policy for tower's [`RetryLayer`] that
//! inspects the error slot and status of each [`Response`].
//!
//! [`RetryLayer`]: tower::retry::RetryLayer

use std::convert::Infallible;
use std::future;

use tower::retry::Policy;

use crate::{Request, Response};

/// A simple retry policy for HTTP requests.
///
/// By default, retries idempotent requests on:
/// - Connection errors
/// - Timeouts
/// - 5xx server errors
/// - 429 Too Many Requests
///
/// Requests carrying a construction error are never retried.
///
/// # Example
///
/// ```ignore
/// use braid::{Client, middleware::RetryPolicy};
/// use tower::retry::RetryLayer;
///
/// let mut client = Client::new();
/// client.layer(RetryLayer::new(RetryPolicy::new(3)));
/// ```
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    remaining: u32,
}

impl RetryPolicy {
    /// Create a new retry policy with the given maximum number of retries.
    #[must_use]
    pub fn new(max_retries: u32) -> Self {
        Self {
            remaining: max_retries,
        }
    }

    /// Returns `true` if the response should be retried.
    fn should_retry(response: &Response) -> bool {
        if let Some(error) = response.error() {
            // Retry on connection and timeout errors
            return error.is_connection() || error.is_timeout();
        }
        // Retry on 5xx server errors and 429 Too Many Requests
        response
            .status()
            .is_some_and(|status| status >= 500 || status == 429)
    }
}

impl Policy<Request, Response, Infallible> for RetryPolicy {
    type Future = future::Ready<()>;

    fn retry(
        &mut self,
        req: &mut Request,
        result: &mut Result<Response, Infallible>,
    ) -> Option<Self::Future> {
        if self.remaining == 0 || !req.method().is_idempotent() {
            return None;
        }

        if result.as_ref().is_ok_and(Self::should_retry) {
            self.remaining -= 1;
            Some(future::ready(()))
        } else {
            None
        }
    }

    fn clone_request(&mut self, req: &Request) -> Option<Request> {
        req.error().is_none().then(|| req.clone())
    }
}
