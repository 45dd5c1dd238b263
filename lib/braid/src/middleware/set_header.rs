//! Header injection middleware.
//!
//! Sets a fixed header on every outgoing request, e.g. an API key or an
//! `Authorization: Bearer <token>` header.

use std::convert::Infallible;
use std::sync::Arc;
use std::task::{Context, Poll};

use tower::{Layer, Service, util::BoxCloneService};

use crate::{Client, Handler, Middleware, Request, Response, Transport};

/// Layer that sets a header on every request.
///
/// # Example
///
/// ```ignore
/// use braid::{Client, middleware::SetHeaderLayer};
///
/// let mut client = Client::new();
/// client.use_middleware(SetHeaderLayer::new("X-Api-Key", "secret"));
/// client.use_middleware(SetHeaderLayer::bearer_auth("my-secret-token"));
/// ```
#[derive(Debug, Clone)]
pub struct SetHeaderLayer {
    name: Arc<str>,
    value: Arc<str>,
    overwrite: bool,
}

impl SetHeaderLayer {
    /// Set `name` to `value`, replacing any value already present.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: Arc::from(name.into()),
            value: Arc::from(value.into()),
            overwrite: true,
        }
    }

    /// Set `name` to `value` only when the request does not carry it yet.
    pub fn if_not_present(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            overwrite: false,
            ..Self::new(name, value)
        }
    }

    /// Adds an `Authorization: Bearer <token>` header.
    pub fn bearer_auth(token: impl AsRef<str>) -> Self {
        Self::new("Authorization", format!("Bearer {}", token.as_ref()))
    }
}

impl<S> Layer<S> for SetHeaderLayer {
    type Service = SetHeader<S>;

    fn layer(&self, inner: S) -> Self::Service {
        SetHeader {
            inner,
            name: Arc::clone(&self.name),
            value: Arc::clone(&self.value),
            overwrite: self.overwrite,
        }
    }
}

impl<T: Transport> Middleware<T> for SetHeaderLayer {
    fn wrap(&self, _client: &Client<T>, next: Handler) -> Handler {
        BoxCloneService::new(self.layer(next))
    }
}

/// Service that sets a header on every request.
#[derive(Debug, Clone)]
pub struct SetHeader<S> {
    inner: S,
    name: Arc<str>,
    value: Arc<str>,
    overwrite: bool,
}

impl<S> Service<Request> for SetHeader<S>
where
    S: Service<Request, Response = Response, Error = Infallible>,
{
    type Response = Response;
    type Error = Infallible;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Infallible>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request) -> Self::Future {
        let headers = request.headers_mut();
        let existing = headers
            .keys()
            .find(|key| key.eq_ignore_ascii_case(&self.name))
            .cloned();

        match existing {
            Some(_) if !self.overwrite => {}
            Some(key) => {
                headers.insert(key, self.value.to_string());
            }
            None => {
                headers.insert(self.name.to_string(), self.value.to_string());
            }
        }

        self.inner.call(request)
    }
}
