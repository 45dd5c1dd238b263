//! Prelude module for convenient imports.
//!
//! This module re-exports the most commonly used types and functions for
//! easy glob importing:
//!
//! ```ignore
//! use braid::prelude::*;
//! ```

pub use crate::{
    Client, ClientBuilder, ClientConfig, Error, ErrorKind, Handler, Method, Middleware, Request,
    RequestBuilder, Response, Result, Transport, handler_fn,
};
pub use tower::ServiceExt;
