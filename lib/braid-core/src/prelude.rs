//! Prelude module for convenient imports.
//!
//! This module re-exports the most commonly used types for easy glob
//! importing:
//!
//! ```ignore
//! use braid_core::prelude::*;
//! ```

pub use crate::{
    Decoder, Error, ErrorKind, Method, RawResponse, Request, RequestBuilder, Response, Result,
    TextDecoder, Transport,
};
