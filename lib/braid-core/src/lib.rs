//! Core types and traits for the braid HTTP request pipeline.
//!
//! This crate provides the foundational types used by braid:
//! - [`Request`] and [`RequestBuilder`] - outgoing request descriptor
//! - [`Response`] and [`ResponseMeta`] - result holder with its error slot
//! - [`Method`] - HTTP method enum
//! - [`Error`], [`ErrorKind`] and [`Result`] - Error handling
//! - [`Transport`] and [`RawResponse`] - one physical HTTP exchange
//! - [`Decoder`] and [`TextDecoder`] - body to text decoding

mod decoder;
mod error;
mod method;
pub mod prelude;
mod request;
mod response;
mod transport;

pub use decoder::{Decoder, TextDecoder};
pub use error::{Error, ErrorKind, Result};
pub use method::Method;
pub use request::{Request, RequestBuilder};
pub use response::{Response, ResponseMeta};
pub use transport::{RawResponse, Transport};
