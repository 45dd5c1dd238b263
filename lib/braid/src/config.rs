//! Settings read by [`HyperTransport`](crate::HyperTransport) when it is built.
//!
//! The pipeline itself has no knobs: ordering, short-circuiting and error
//! precedence are fixed. Everything here tunes the network exchange behind
//! the terminal handler.

use std::time::Duration;

/// Redirect hops followed before a call fails with
/// [`Error::TooManyRedirects`](crate::Error::TooManyRedirects).
pub const DEFAULT_MAX_REDIRECTS: usize = 10;

/// Transport settings shared by every request of a [`Client`](crate::Client).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Upper bound for one call: connect, every redirect hop and the body drain.
    pub timeout: Duration,
    /// Upper bound for establishing a TCP connection.
    pub connect_timeout: Duration,
    /// Idle pooled connections kept per host.
    pub pool_idle_per_host: usize,
    /// How long an idle pooled connection is kept.
    pub pool_idle_timeout: Duration,
    /// Resend a request when its pooled connection closed before use.
    pub retry_canceled_requests: bool,
    /// Keep cookies from `Set-Cookie` and replay them on matching requests.
    pub cookie_store: bool,
    /// Redirect hops to follow; `0` returns every 3xx response as is.
    pub max_redirects: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            pool_idle_per_host: 32,
            pool_idle_timeout: Duration::from_secs(90),
            retry_canceled_requests: true,
            cookie_store: true,
            max_redirects: DEFAULT_MAX_REDIRECTS,
        }
    }
}

impl ClientConfig {
    /// Start from the defaults and override what differs.
    #[must_use]
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }
}

/// Builder for [`ClientConfig`], starting from [`ClientConfig::default`].
#[derive(Debug, Clone, Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Bound each call, redirects and body included.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Bound TCP connection establishment.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Idle connections kept per host.
    #[must_use]
    pub const fn pool_idle_per_host(mut self, count: usize) -> Self {
        self.config.pool_idle_per_host = count;
        self
    }

    /// Lifetime of an idle pooled connection.
    #[must_use]
    pub const fn pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.pool_idle_timeout = timeout;
        self
    }

    /// Resend requests whose pooled connection closed before use.
    #[must_use]
    pub const fn retry_canceled_requests(mut self, retry: bool) -> Self {
        self.config.retry_canceled_requests = retry;
        self
    }

    /// Keep or drop cookies between requests.
    #[must_use]
    pub const fn cookie_store(mut self, enabled: bool) -> Self {
        self.config.cookie_store = enabled;
        self
    }

    /// Redirect hops to follow, `0` to disable.
    #[must_use]
    pub const fn max_redirects(mut self, max: usize) -> Self {
        self.config.max_redirects = max;
        self
    }

    /// Finish the configuration.
    #[must_use]
    pub fn build(self) -> ClientConfig {
        self.config
    }
}
