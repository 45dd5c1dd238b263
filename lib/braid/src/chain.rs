//! Middleware chain composition.
//!
//! A [`Handler`] turns a [`Request`] into a [`Response`]. A [`Middleware`]
//! wraps the next handler into a new one. [`build_chain`] folds the
//! registered middleware around the terminal handler so that the first
//! registered middleware is the outermost: it sees the request first and the
//! response last.
//!
//! ```text
//!  request ──▶ m0 ──▶ m1 ──▶ … ──▶ mn ──▶ terminal
//! response ◀── m0 ◀── m1 ◀── … ◀── mn ◀──┘
//! ```
//!
//! Handlers never fail: their error type is [`Infallible`], and every
//! failure travels as data in [`Response::error`].

use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;

use tower::util::BoxCloneService;
use tower::{Layer, Service, service_fn};

use crate::{Client, HyperTransport, Request, Response, Transport};

/// Type-erased request handler.
///
/// Cloning is cheap; a fresh chain is built for every dispatched request.
pub type Handler = BoxCloneService<Request, Response, Infallible>;

/// A behavior wrapped around the rest of the pipeline.
///
/// `wrap` receives the owning client, so a middleware can inspect shared
/// configuration, and the next handler, which it may call zero, one or
/// several times. Any state a middleware needs lives in the implementing
/// value and must be synchronized by the middleware itself.
///
/// Implemented for closures and, through [`LayerMiddleware`], for tower
/// layers.
///
/// # Example
///
/// ```ignore
/// use braid::{Client, Handler, handler_fn};
/// use tower::ServiceExt;
///
/// let mut client = Client::new();
/// client.use_middleware(|_client: &Client, next: Handler| {
///     handler_fn(move |mut request| {
///         let next = next.clone();
///         async move {
///             request.headers_mut().insert("X-Test".into(), "1".into());
///             let Ok(response) = next.oneshot(request).await;
///             response
///         }
///     })
/// });
/// ```
pub trait Middleware<T: Transport = HyperTransport>: Send + Sync + 'static {
    /// Wrap `next`, producing the handler that runs this behavior.
    fn wrap(&self, client: &Client<T>, next: Handler) -> Handler;
}

impl<T, F> Middleware<T> for F
where
    T: Transport,
    F: Fn(&Client<T>, Handler) -> Handler + Send + Sync + 'static,
{
    fn wrap(&self, client: &Client<T>, next: Handler) -> Handler {
        self(client, next)
    }
}

/// Adapter registering a tower [`Layer`] as a [`Middleware`].
///
/// `wrap` runs once per call. A layer whose service keeps state across calls
/// must hold that state behind an `Arc` in the layer itself; state created in
/// `Layer::layer` lives for one call only.
#[derive(Debug, Clone)]
pub struct LayerMiddleware<L> {
    layer: L,
}

impl<L> LayerMiddleware<L> {
    /// Wrap a tower layer.
    pub const fn new(layer: L) -> Self {
        Self { layer }
    }
}

impl<T, L> Middleware<T> for LayerMiddleware<L>
where
    T: Transport,
    L: Layer<Handler> + Send + Sync + 'static,
    L::Service: Service<Request, Response = Response, Error = Infallible> + Clone + Send + 'static,
    <L::Service as Service<Request>>::Future: Send + 'static,
{
    fn wrap(&self, _client: &Client<T>, next: Handler) -> Handler {
        BoxCloneService::new(self.layer.layer(next))
    }
}

/// Build a [`Handler`] from an async function.
pub fn handler_fn<F, Fut>(f: F) -> Handler
where
    F: Fn(Request) -> Fut + Clone + Send + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    BoxCloneService::new(service_fn(move |request| {
        let response = f(request);
        async move { Ok::<_, Infallible>(response.await) }
    }))
}

/// Fold `middleware` around `terminal`, last registered innermost.
pub fn build_chain<T: Transport>(
    client: &Client<T>,
    terminal: Handler,
    middleware: &[Arc<dyn Middleware<T>>],
) -> Handler {
    middleware
        .iter()
        .rev()
        .fold(terminal, |next, layer| layer.wrap(client, next))
}
