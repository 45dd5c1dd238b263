//! Middleware for the braid client.
//!
//! Every layer here is both a tower [`Layer`] over [`Handler`](crate::Handler)
//! and a [`Middleware`](crate::Middleware), so it can be registered directly
//! with [`Client::use_middleware`](crate::Client::use_middleware).
//! Registration order is execution order: the first registered middleware is
//! the outermost and sees the request first.
//!
//! # Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `middleware-rate-limit` | [`RateLimitLayer`] and `.with_rate_limit_*()` helpers |
//!
//! # Available Layers
//!
//! - [`LoggingLayer`] - Logs requests/responses using `tracing`
//! - [`SetHeaderLayer`] - Sets a header on every request (incl. bearer auth)
//! - [`RetryPolicy`] - Retry policy for tower's [`RetryLayer`]
//! - [`RateLimitLayer`] - Limits request rate using a token bucket
//! - [`GlobalConcurrencyLimitLayer`] - Limits calls in flight across the client (tower)
//!
//! # Example
//!
//! ```ignore
//! use braid::Client;
//! use braid::middleware::{LoggingLayer, RetryLayer, RetryPolicy, SetHeaderLayer};
//!
//! let mut client = Client::new();
//! client
//!     .use_middleware(LoggingLayer::new())
//!     .use_middleware(SetHeaderLayer::bearer_auth("my-token"))
//!     .layer(RetryLayer::new(RetryPolicy::new(3)));
//! ```

mod logging;
#[cfg(feature = "middleware-rate-limit")]
mod rate_limit;
mod retry;
mod set_header;

pub use logging::{LogLevel, Logging, LoggingLayer};
#[cfg(feature = "middleware-rate-limit")]
pub use rate_limit::{RateLimit, RateLimitLayer};
pub use retry::RetryPolicy;
pub use set_header::{SetHeader, SetHeaderLayer};

// Re-export tower types for convenience
pub use tower::Layer;
pub use tower::limit::GlobalConcurrencyLimitLayer;
pub use tower::retry::RetryLayer;
