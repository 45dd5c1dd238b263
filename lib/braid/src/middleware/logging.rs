//! Request/response logging middleware.
//!
//! This middleware logs requests and their outcome using the `tracing` crate.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use tower::{Layer, Service, util::BoxCloneService};
use tracing::{Instrument, Level, debug, info, span, warn};

use crate::{Client, Handler, Middleware, Request, Response, Transport};

/// Layer that adds request/response logging.
///
/// # Example
///
/// ```ignore
/// use braid::{Client, middleware::LoggingLayer};
///
/// let mut client = Client::new();
/// client.use_middleware(LoggingLayer::new());
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingLayer {
    level: LogLevel,
}

/// Log level for the logging middleware.
#[derive(Debug, Clone, Copy, Default)]
pub enum LogLevel {
    /// Log at debug level (request/response details).
    Debug,
    /// Log at info level (summary only).
    #[default]
    Info,
}

impl LoggingLayer {
    /// Create a new logging layer with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a logging layer that logs at debug level.
    #[must_use]
    pub fn debug() -> Self {
        Self {
            level: LogLevel::Debug,
        }
    }
}

impl<S> Layer<S> for LoggingLayer {
    type Service = Logging<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Logging {
            inner,
            level: self.level,
        }
    }
}

impl<T: Transport> Middleware<T> for LoggingLayer {
    fn wrap(&self, _client: &Client<T>, next: Handler) -> Handler {
        BoxCloneService::new(self.layer(next))
    }
}

/// Service that logs requests and responses.
#[derive(Debug, Clone)]
pub struct Logging<S> {
    inner: S,
    level: LogLevel,
}

impl<S> Service<Request> for Logging<S>
where
    S: Service<Request, Response = Response, Error = Infallible> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Infallible>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Infallible>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let method = request.method();
        let url = request
            .url()
            .map_or_else(|| "<invalid>".to_string(), ToString::to_string);
        let level = self.level;

        let span = span!(Level::INFO, "http_request", %method, %url);

        let mut inner = self.inner.clone();
        Box::pin(
            async move {
                let start = Instant::now();

                match level {
                    LogLevel::Debug => {
                        debug!(
                            method = %method,
                            url = %url,
                            headers = ?request.headers(),
                            proxy = request.proxy_url(),
                            "sending request"
                        );
                    }
                    LogLevel::Info => {
                        info!(method = %method, url = %url, "sending request");
                    }
                }

                let Ok(response) = inner.call(request).await;
                let elapsed = start.elapsed();

                // Saturating conversion to u64 (truncates after ~584 million years)
                let elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);

                match (response.error(), response.status()) {
                    (Some(err), _) => {
                        warn!(error = %err, kind = %err.kind(), elapsed_ms, "request failed");
                    }
                    (None, Some(status)) if response.is_success() => {
                        info!(status, elapsed_ms, "request completed");
                    }
                    (None, status) => {
                        warn!(status, elapsed_ms, "request failed with HTTP error");
                    }
                }

                Ok(response)
            }
            .instrument(span),
        )
    }
}

#[cfg(test)]
mod tests {
    use tower::ServiceExt;

    use super::*;
    use crate::test_support::request;
    use crate::{Error, handler_fn};

    #[test]
    fn logging_layer_default() {
        let layer = LoggingLayer::new();
        assert!(matches!(layer.level, LogLevel::Info));
    }

    #[test]
    fn logging_layer_debug() {
        let layer = LoggingLayer::debug();
        assert!(matches!(layer.level, LogLevel::Debug));
    }

    #[tokio::test]
    async fn logging_passes_response_through() {
        let inner = handler_fn(|request| async move { Response::failed(request, Error::Timeout) });
        let service = LoggingLayer::debug().layer(inner);

        let Ok(response) = service.oneshot(request()).await;

        assert_eq!(response.error(), Some(&Error::Timeout));
    }
}
