//! HTTP client with an ordered, composable middleware pipeline.
//!
//! A [`Client`] owns a [`Transport`] and a list of [`Middleware`]. Each call
//! to [`Client::send`] folds the list around the terminal round trip, first
//! registered outermost, runs it, then decodes the body. Failures never
//! panic or return early: they are recorded on [`Response::error`] with a
//! strict precedence (construction, then transport, then decode).
//!
//! # Example
//!
//! ```ignore
//! use braid::prelude::*;
//!
//! let client = Client::builder()
//!     .with_logging()
//!     .with_header("X-Test", "1")
//!     .with_retry(2)
//!     .build();
//!
//! let request = Request::builder(Method::Get, "https://api.example.com/users")
//!     .proxy("http://proxy.example:8080")
//!     .build();
//! let response = client.send(request).await;
//! if let Some(error) = response.error() {
//!     eprintln!("request failed: {error}");
//! }
//! ```

mod chain;
mod client;
mod config;
mod connector;
mod cookies;
pub mod middleware;
pub mod prelude;
mod terminal;
#[cfg(test)]
mod test_support;
mod transport;

pub use chain::{Handler, LayerMiddleware, Middleware, build_chain, handler_fn};
pub use client::{Client, ClientBuilder, default_client, send};
pub use config::{ClientConfig, ClientConfigBuilder};
pub use cookies::CookieJar;
pub use middleware::{LoggingLayer, RetryPolicy, SetHeaderLayer};
pub use transport::HyperTransport;

// Re-export tower for middleware composition
pub use tower;

// Re-export core types
pub use braid_core::{
    Decoder, Error, ErrorKind, Method, RawResponse, Request, RequestBuilder, Response,
    ResponseMeta, Result, TextDecoder, Transport,
};

// Re-export url for transport implementations
pub use url;
