//! Request pacing for a client.
//!
//! Every call waits for a token from one governor bucket before it continues
//! down the chain. The bucket lives in the registered [`RateLimitLayer`], so
//! the per-call chains built by [`Client::send`](crate::Client::send) all
//! draw from it. Waiting happens before the transport is reached; a call
//! dropped while waiting never consumes a round trip.

use std::convert::Infallible;
use std::future::Future;
use std::num::NonZeroU32;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use governor::{Quota, RateLimiter, clock::DefaultClock, state::InMemoryState};
use tower::{Layer, Service, util::BoxCloneService};

use crate::{Client, Handler, Middleware, Request, Response, Transport};

type Bucket = RateLimiter<governor::state::NotKeyed, InMemoryState, DefaultClock>;

/// Paces outgoing calls through a shared token bucket.
///
/// Clones share the bucket. Register one value per client; two separately
/// constructed layers pace independently.
///
/// ```ignore
/// use braid::{Client, middleware::RateLimitLayer};
///
/// let mut client = Client::new();
/// client.use_middleware(RateLimitLayer::per_second(10));
/// ```
#[derive(Debug, Clone)]
pub struct RateLimitLayer {
    bucket: Arc<Bucket>,
}

impl RateLimitLayer {
    /// At most `count` calls per second; `0` is treated as `1`.
    #[must_use]
    pub fn per_second(count: u32) -> Self {
        Self::with_quota(Quota::per_second(NonZeroU32::new(count).unwrap_or(NonZeroU32::MIN)))
    }

    /// At most `count` calls per minute; `0` is treated as `1`.
    #[must_use]
    pub fn per_minute(count: u32) -> Self {
        Self::with_quota(Quota::per_minute(NonZeroU32::new(count).unwrap_or(NonZeroU32::MIN)))
    }

    /// Pace calls with an arbitrary governor quota, e.g. with a burst size.
    #[must_use]
    pub fn with_quota(quota: Quota) -> Self {
        Self {
            bucket: Arc::new(RateLimiter::direct(quota)),
        }
    }
}

impl<S> Layer<S> for RateLimitLayer {
    type Service = RateLimit<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimit {
            inner,
            bucket: Arc::clone(&self.bucket),
        }
    }
}

impl<T: Transport> Middleware<T> for RateLimitLayer {
    fn wrap(&self, _client: &Client<T>, next: Handler) -> Handler {
        BoxCloneService::new(self.layer(next))
    }
}

/// Handler wrapper produced by [`RateLimitLayer`].
#[derive(Debug, Clone)]
pub struct RateLimit<S> {
    inner: S,
    bucket: Arc<Bucket>,
}

impl<S> Service<Request> for RateLimit<S>
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
        let bucket = Arc::clone(&self.bucket);
        let mut inner = self.inner.clone();

        Box::pin(async move {
            bucket.until_ready().await;
            inner.call(request).await
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::{Duration, Instant};

    use tower::ServiceExt;

    use super::*;
    use crate::test_support::request;
    use crate::{Error, handler_fn};

    fn counting(calls: &Arc<AtomicU32>) -> Handler {
        let calls = Arc::clone(calls);
        handler_fn(move |request| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { Response::failed(request, Error::Timeout) }
        })
    }

    #[tokio::test]
    async fn calls_within_quota_pass_straight_through() {
        let calls = Arc::new(AtomicU32::new(0));
        let service = RateLimitLayer::per_second(100).layer(counting(&calls));

        for _ in 0..5 {
            let Ok(_response) = service.clone().oneshot(request()).await;
        }

        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn chains_built_per_call_share_one_bucket() {
        let calls = Arc::new(AtomicU32::new(0));
        let layer = RateLimitLayer::per_second(1);

        let start = Instant::now();
        let Ok(_first) = layer.layer(counting(&calls)).oneshot(request()).await;
        let Ok(_second) = layer.layer(counting(&calls)).oneshot(request()).await;
        let elapsed = start.elapsed();

        assert!(
            elapsed >= Duration::from_millis(900),
            "second call was not paced, elapsed: {elapsed:?}"
        );
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
