//! HTTP client: middleware registration and dispatch.

use std::fmt;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use tower::limit::GlobalConcurrencyLimitLayer;
use tower::retry::RetryLayer;
use tower::{Layer, ServiceExt};
use tower_service::Service;
use tracing::debug;

use crate::{
    ClientConfig, ClientConfigBuilder, Decoder, Handler, HyperTransport, LayerMiddleware,
    LoggingLayer, Middleware, Request, Response, RetryPolicy, SetHeaderLayer, TextDecoder,
    Transport, build_chain, terminal,
};

#[cfg(feature = "middleware-rate-limit")]
use crate::middleware::RateLimitLayer;

// ============================================================================
// Client
// ============================================================================

/// HTTP client owning a transport, a decoder and an ordered middleware list.
///
/// Every [`Client::send`] builds its own handler chain from the shared list,
/// so concurrent calls from many tasks need no extra synchronization.
/// Middleware must be registered before traffic starts: registration takes
/// `&mut self`, and clones made earlier keep the list they were cloned with.
///
/// # Example
///
/// ```ignore
/// use braid::{Client, Method, Request};
///
/// let client = Client::builder()
///     .with_logging()
///     .with_header("X-Client", "braid")
///     .with_retry(2)
///     .build();
///
/// let response = client
///     .send(Request::builder(Method::Get, "https://example.com").build())
///     .await;
/// match response.error() {
///     Some(error) => eprintln!("failed: {error}"),
///     None => println!("{}", response.text()),
/// }
/// ```
pub struct Client<T: Transport = HyperTransport> {
    transport: Arc<T>,
    config: ClientConfig,
    decoder: Arc<dyn Decoder>,
    middleware: Vec<Arc<dyn Middleware<T>>>,
}

impl<T: Transport> Clone for Client<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            config: self.config.clone(),
            decoder: Arc::clone(&self.decoder),
            middleware: self.middleware.clone(),
        }
    }
}

impl<T: Transport> fmt::Debug for Client<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config)
            .field("middleware_count", &self.middleware.len())
            .finish_non_exhaustive()
    }
}

impl Client<HyperTransport> {
    /// Create a new client with default configuration and no middleware.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ClientConfig::default())
    }

    /// Create a new client with custom configuration and no middleware.
    #[must_use]
    pub fn with_config(config: ClientConfig) -> Self {
        let transport = HyperTransport::new(config.clone());
        Self::from_parts(transport, config)
    }

    /// Create a new client builder using the default transport.
    #[must_use]
    pub fn builder() -> ClientBuilder<HyperTransport> {
        ClientBuilder::new(Box::new(|config: &ClientConfig| {
            HyperTransport::new(config.clone())
        }))
    }
}

impl Default for Client<HyperTransport> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Transport> Client<T> {
    /// Create a client builder around a custom transport.
    #[must_use]
    pub fn with_transport(transport: T) -> ClientBuilder<T> {
        ClientBuilder::new(Box::new(move |_config: &ClientConfig| transport))
    }

    fn from_parts(transport: T, config: ClientConfig) -> Self {
        Self {
            transport: Arc::new(transport),
            config,
            decoder: Arc::new(TextDecoder),
            middleware: Vec::new(),
        }
    }

    /// Append a middleware; it runs inside every middleware registered before it.
    pub fn use_middleware(&mut self, middleware: impl Middleware<T>) -> &mut Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    /// Append a tower layer as middleware.
    ///
    /// The layer is applied again for every call, so state meant to span
    /// calls (permits, buckets, counters) must be shared behind an `Arc`
    /// inside the layer value, as [`GlobalConcurrencyLimitLayer`] does.
    pub fn layer<L>(&mut self, layer: L) -> &mut Self
    where
        L: Layer<Handler> + Send + Sync + 'static,
        L::Service: Service<Request, Response = Response, Error = std::convert::Infallible>
            + Clone
            + Send
            + 'static,
        <L::Service as Service<Request>>::Future: Send + 'static,
    {
        self.use_middleware(LayerMiddleware::new(layer))
    }

    /// The transport shared by every request.
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Get the client configuration.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Number of registered middleware.
    #[must_use]
    pub fn middleware_count(&self) -> usize {
        self.middleware.len()
    }

    /// Compose the registered middleware around the terminal handler.
    #[must_use]
    pub fn handler(&self) -> Handler {
        let terminal = terminal::handler(Arc::clone(&self.transport));
        build_chain(self, terminal, &self.middleware)
    }

    /// Dispatch a request through the middleware chain, then decode the body.
    ///
    /// Never fails: check [`Response::error`]. A construction or transport
    /// error recorded by the chain always wins over a decode error.
    pub async fn send(&self, request: Request) -> Response {
        let Ok(mut response) = self.handler().oneshot(request).await;
        self.decode(&mut response);
        response
    }

    fn decode(&self, response: &mut Response) {
        if response.error().is_some() {
            return;
        }
        match self.decoder.decode(response) {
            Ok(text) => response.set_text(text),
            Err(error) => {
                debug!(error = %error, "response body decoding failed");
                response.record_error(error);
            }
        }
    }
}

// ============================================================================
// Default client
// ============================================================================

static DEFAULT_CLIENT: LazyLock<Client> = LazyLock::new(Client::new);

/// Process-wide client with default configuration and no middleware.
///
/// Built on first use and shared afterwards, including its cookie jar and
/// connection pool. Prefer owning a [`Client`] when isolation matters.
///
/// Pooled connections are driven by tasks spawned on the tokio runtime that
/// opened them. Use this client from a single long-lived runtime: once that
/// runtime shuts down, calls from another runtime can fail with a connection
/// error while the pool still hands out its dead connections. Tests that
/// each start their own runtime should build their own [`Client`].
#[must_use]
pub fn default_client() -> &'static Client {
    &DEFAULT_CLIENT
}

/// Dispatch a request with the [`default_client`].
pub async fn send(request: Request) -> Response {
    DEFAULT_CLIENT.send(request).await
}

// ============================================================================
// Builder
// ============================================================================

type TransportFactory<T> = Box<dyn FnOnce(&ClientConfig) -> T + Send>;

/// Builder for [`Client`].
///
/// Middleware added through the builder keeps registration order: the first
/// added is the outermost.
///
/// # Example
///
/// ```ignore
/// use braid::Client;
/// use std::time::Duration;
///
/// let client = Client::builder()
///     .timeout(Duration::from_secs(10))
///     .with_logging()
///     .with_bearer_auth("my-secret-token")
///     .build();
/// ```
pub struct ClientBuilder<T: Transport = HyperTransport> {
    config: ClientConfigBuilder,
    transport: TransportFactory<T>,
    decoder: Arc<dyn Decoder>,
    middleware: Vec<Arc<dyn Middleware<T>>>,
}

impl<T: Transport> fmt::Debug for ClientBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("config", &self.config)
            .field("middleware_count", &self.middleware.len())
            .finish_non_exhaustive()
    }
}

impl<T: Transport> ClientBuilder<T> {
    fn new(transport: TransportFactory<T>) -> Self {
        Self {
            config: ClientConfigBuilder::default(),
            transport,
            decoder: Arc::new(TextDecoder),
            middleware: Vec::new(),
        }
    }

    // ========================================================================
    // Core Configuration
    // ========================================================================

    /// Set the request timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.timeout(timeout);
        self
    }

    /// Set the connection timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.connect_timeout(timeout);
        self
    }

    /// Set the maximum idle connections per host.
    #[must_use]
    pub fn pool_idle_per_host(mut self, count: usize) -> Self {
        self.config = self.config.pool_idle_per_host(count);
        self
    }

    /// Set the idle connection timeout.
    #[must_use]
    pub fn pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.pool_idle_timeout(timeout);
        self
    }

    /// Enable or disable the shared cookie store.
    #[must_use]
    pub fn cookie_store(mut self, enabled: bool) -> Self {
        self.config = self.config.cookie_store(enabled);
        self
    }

    /// Set the number of redirect hops to follow, `0` to disable.
    #[must_use]
    pub fn max_redirects(mut self, max: usize) -> Self {
        self.config = self.config.max_redirects(max);
        self
    }

    /// Replace the body decoder.
    #[must_use]
    pub fn decoder(mut self, decoder: impl Decoder) -> Self {
        self.decoder = Arc::new(decoder);
        self
    }

    // ========================================================================
    // Generic Middleware API
    // ========================================================================

    /// Append a middleware.
    #[must_use]
    pub fn middleware(mut self, middleware: impl Middleware<T>) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    /// Append a tower layer as middleware.
    #[must_use]
    pub fn layer<L>(self, layer: L) -> Self
    where
        L: Layer<Handler> + Send + Sync + 'static,
        L::Service: Service<Request, Response = Response, Error = std::convert::Infallible>
            + Clone
            + Send
            + 'static,
        <L::Service as Service<Request>>::Future: Send + 'static,
    {
        self.middleware(LayerMiddleware::new(layer))
    }

    // ========================================================================
    // Helper Methods
    // ========================================================================

    /// Add request/response logging.
    #[must_use]
    pub fn with_logging(self) -> Self {
        self.middleware(LoggingLayer::new())
    }

    /// Add debug-level logging (includes headers).
    #[must_use]
    pub fn with_debug_logging(self) -> Self {
        self.middleware(LoggingLayer::debug())
    }

    /// Set a header on every request.
    #[must_use]
    pub fn with_header(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.middleware(SetHeaderLayer::new(name, value))
    }

    /// Add bearer token authentication.
    #[must_use]
    pub fn with_bearer_auth(self, token: impl AsRef<str>) -> Self {
        self.middleware(SetHeaderLayer::bearer_auth(token))
    }

    /// Retry failed idempotent requests up to `max_retries` times.
    ///
    /// Uses the default retry policy: connection errors, timeouts, 5xx, 429.
    #[must_use]
    pub fn with_retry(self, max_retries: u32) -> Self {
        self.layer(RetryLayer::new(RetryPolicy::new(max_retries)))
    }

    /// Limit the number of calls in flight across every `send` of the client.
    ///
    /// A call waits for a permit before entering the rest of the chain and
    /// holds it until its response is ready.
    #[must_use]
    pub fn with_concurrency_limit(self, max: usize) -> Self {
        self.layer(GlobalConcurrencyLimitLayer::new(max))
    }

    /// Add rate limiting (requests per second).
    #[cfg(feature = "middleware-rate-limit")]
    #[must_use]
    pub fn with_rate_limit_per_second(self, count: u32) -> Self {
        self.layer(RateLimitLayer::per_second(count))
    }

    /// Add rate limiting (requests per minute).
    #[cfg(feature = "middleware-rate-limit")]
    #[must_use]
    pub fn with_rate_limit_per_minute(self, count: u32) -> Self {
        self.layer(RateLimitLayer::per_minute(count))
    }

    // ========================================================================
    // Build
    // ========================================================================

    /// Build the client.
    #[must_use]
    pub fn build(self) -> Client<T> {
        let config = self.config.build();
        let transport = (self.transport)(&config);
        Client {
            transport: Arc::new(transport),
            config,
            decoder: self.decoder,
            middleware: self.middleware,
        }
    }
}
