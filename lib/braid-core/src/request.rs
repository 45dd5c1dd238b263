//! HTTP request descriptor.
//!
//! Use [`Request::builder`] to construct requests. Construction never fails:
//! a malformed URL is recorded in the request's error slot, and the pipeline
//! short-circuits on it at dispatch time without touching the network.
//!
//! # Example
//!
//! ```
//! use braid_core::{Method, Request};
//!
//! let request = Request::builder(Method::Get, "https://api.example.com/users")
//!     .header("Accept", "application/json")
//!     .query("page", "1")
//!     .build();
//! assert!(request.error().is_none());
//!
//! let broken = Request::builder(Method::Get, "not a url").build();
//! assert!(broken.error().is_some());
//! ```

use std::collections::HashMap;

use bytes::Bytes;
use url::Url;

use crate::{Error, Method};

/// An outgoing HTTP request with method, URL, headers, optional body,
/// optional per-request proxy and construction error slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    method: Method,
    url: Option<Url>,
    headers: HashMap<String, String>,
    body: Option<Bytes>,
    proxy_url: Option<String>,
    error: Option<Error>,
}

impl Request {
    /// Creates a new [`RequestBuilder`].
    #[must_use]
    pub fn builder(method: Method, url: impl AsRef<str>) -> RequestBuilder {
        RequestBuilder::new(method, url)
    }

    /// HTTP method.
    #[must_use]
    pub const fn method(&self) -> Method {
        self.method
    }

    /// Request URL, `None` only when the construction error is set.
    #[must_use]
    pub const fn url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    /// Request headers.
    #[must_use]
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Mutable access to headers, for middleware editing the request.
    #[must_use]
    pub fn headers_mut(&mut self) -> &mut HashMap<String, String> {
        &mut self.headers
    }

    /// Single header value by name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// Request body.
    #[must_use]
    pub const fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Per-request proxy override.
    ///
    /// An empty string is treated the same as no override.
    #[must_use]
    pub fn proxy_url(&self) -> Option<&str> {
        self.proxy_url.as_deref().filter(|proxy| !proxy.is_empty())
    }

    /// Error recorded while building the request.
    #[must_use]
    pub const fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }
}

/// Builder for constructing [`Request`] instances.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    method: Method,
    url: Result<Url, Error>,
    headers: HashMap<String, String>,
    body: Option<Bytes>,
    proxy_url: Option<String>,
}

impl RequestBuilder {
    /// Creates a new builder, parsing the URL.
    #[must_use]
    pub fn new(method: Method, url: impl AsRef<str>) -> Self {
        Self {
            method,
            url: Url::parse(url.as_ref()).map_err(Error::from),
            headers: HashMap::new(),
            body: None,
            proxy_url: None,
        }
    }

    /// Creates a new builder from an already parsed URL.
    #[must_use]
    pub fn from_url(method: Method, url: Url) -> Self {
        Self {
            method,
            url: Ok(url),
            headers: HashMap::new(),
            body: None,
            proxy_url: None,
        }
    }

    /// Sets a header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Appends a query parameter to the URL.
    #[must_use]
    pub fn query(mut self, name: &str, value: &str) -> Self {
        if let Ok(url) = &mut self.url {
            url.query_pairs_mut().append_pair(name, value);
        }
        self
    }

    /// Sets the request body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Routes this request, and only this one, through the given proxy.
    ///
    /// The address is parsed at dispatch time; a malformed address fails the
    /// round trip with [`Error::InvalidProxy`].
    #[must_use]
    pub fn proxy(mut self, proxy_url: impl Into<String>) -> Self {
        self.proxy_url = Some(proxy_url.into());
        self
    }

    /// Builds the [`Request`].
    #[must_use]
    pub fn build(self) -> Request {
        let (url, error) = match self.url {
            Ok(url) => (Some(url), None),
            Err(error) => (None, Some(error)),
        };
        Request {
            method: self.method,
            url,
            headers: self.headers,
            body: self.body,
            proxy_url: self.proxy_url,
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};

    use super::*;

    #[test]
    fn request_builder_basic() {
        let request = Request::builder(Method::Get, "https://api.example.com/users")
            .header("Accept", "application/json")
            .build();

        check!(request.method() == Method::Get);
        let_assert!(Some(url) = request.url());
        check!(url.as_str() == "https://api.example.com/users");
        check!(request.header("Accept") == Some("application/json"));
        check!(request.body().is_none());
        check!(request.error().is_none());
    }

    #[test]
    fn request_builder_with_query() {
        let request = Request::builder(Method::Get, "https://api.example.com/users")
            .query("page", "1")
            .query("limit", "10")
            .build();

        let_assert!(Some(url) = request.url());
        check!(url.as_str() == "https://api.example.com/users?page=1&limit=10");
    }

    #[test]
    fn request_builder_with_body() {
        let request = Request::builder(Method::Post, "https://api.example.com/users")
            .body(r#"{"name":"test"}"#)
            .build();

        check!(request.method() == Method::Post);
        check!(request.body() == Some(&Bytes::from(r#"{"name":"test"}"#)));
    }

    #[test]
    fn malformed_url_is_recorded_not_raised() {
        let request = Request::builder(Method::Get, "://missing-scheme")
            .query("ignored", "1")
            .build();

        check!(request.url().is_none());
        let_assert!(Some(Error::InvalidUrl(_)) = request.error());
    }

    #[test]
    fn empty_proxy_means_no_override() {
        let request = Request::builder(Method::Get, "https://example.com")
            .proxy("")
            .build();
        check!(request.proxy_url().is_none());

        let request = Request::builder(Method::Get, "https://example.com")
            .proxy("http://proxy.example:8080")
            .build();
        check!(request.proxy_url() == Some("http://proxy.example:8080"));
    }
}
