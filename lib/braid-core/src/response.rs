//! HTTP response handling.
//!
//! A [`Response`] is created once by the terminal handler (or by a middleware
//! that short-circuits) in exactly one of two states:
//!
//! - [`Response::failed`]: the error slot is set, the body is empty and there
//!   is no [`ResponseMeta`];
//! - [`Response::succeeded`]: status, headers and raw body are populated and
//!   the error slot is empty.
//!
//! The decode step may then fill [`Response::text`], or record a decode error
//! through [`Response::record_error`], which never overwrites an earlier error.

use std::collections::HashMap;

use bytes::Bytes;

use crate::{Error, RawResponse, Request};

/// Status and headers of a completed round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseMeta {
    status: u16,
    headers: HashMap<String, String>,
}

impl ResponseMeta {
    /// Creates new response metadata.
    #[must_use]
    pub fn new(status: u16, headers: HashMap<String, String>) -> Self {
        Self { status, headers }
    }

    /// HTTP status code.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// Response headers.
    #[must_use]
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }
}

/// Result of dispatching a [`Request`] through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    request: Request,
    meta: Option<ResponseMeta>,
    body: Bytes,
    text: String,
    error: Option<Error>,
}

impl Response {
    /// Creates a response for a request that failed before or during the
    /// round trip.
    #[must_use]
    pub fn failed(request: Request, error: Error) -> Self {
        Self {
            request,
            meta: None,
            body: Bytes::new(),
            text: String::new(),
            error: Some(error),
        }
    }

    /// Creates a response from a completed round trip.
    #[must_use]
    pub fn succeeded(request: Request, raw: RawResponse) -> Self {
        let RawResponse {
            status,
            headers,
            body,
        } = raw;
        Self {
            request,
            meta: Some(ResponseMeta::new(status, headers)),
            body,
            text: String::new(),
            error: None,
        }
    }

    /// The request this response answers.
    #[must_use]
    pub const fn request(&self) -> &Request {
        &self.request
    }

    /// Status and headers, present only after a successful round trip.
    #[must_use]
    pub const fn meta(&self) -> Option<&ResponseMeta> {
        self.meta.as_ref()
    }

    /// HTTP status code.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        self.meta.as_ref().map(ResponseMeta::status)
    }

    /// Single header value by name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        let meta = self.meta.as_ref()?;
        meta.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Raw response body.
    #[must_use]
    pub const fn body(&self) -> &Bytes {
        &self.body
    }

    /// Decoded text form of the body, filled by the decode step.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Error slot.
    #[must_use]
    pub const fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    /// Round trip completed, no error recorded and status is 2xx.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.status().is_some_and(|s| (200..300).contains(&s))
    }

    /// Records `error` unless an error is already present.
    ///
    /// Returns `true` if the error was recorded.
    pub fn record_error(&mut self, error: Error) -> bool {
        if self.error.is_some() {
            return false;
        }
        self.error = Some(error);
        true
    }

    /// Stores the decoded text form of the body.
    pub fn set_text(&mut self, text: String) {
        self.text = text;
    }

    /// Converts into a [`Result`], keeping the response on success.
    pub fn into_result(self) -> crate::Result<Self> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self),
        }
    }

    /// Consume into the originating request.
    #[must_use]
    pub fn into_request(self) -> Request {
        self.request
    }
}
