//! Terminal handler: the innermost step of every chain.

use std::sync::Arc;

use tracing::debug;
use url::Url;

use crate::{Error, Handler, Request, Response, Result, Transport, handler_fn};

/// Build the terminal handler performing the round trip on `transport`.
pub(crate) fn handler<T: Transport>(transport: Arc<T>) -> Handler {
    handler_fn(move |request| dispatch(Arc::clone(&transport), request))
}

/// Run one request against the transport.
///
/// A request carrying a construction error never reaches the transport; the
/// response carries that same error.
pub(crate) async fn dispatch<T: Transport>(transport: Arc<T>, request: Request) -> Response {
    if let Some(error) = request.error() {
        debug!(error = %error, "request not sent");
        let error = error.clone();
        return Response::failed(request, error);
    }

    let proxy = match resolve_proxy(&request) {
        Ok(proxy) => proxy,
        Err(error) => return Response::failed(request, error),
    };

    match transport.round_trip(&request, proxy.as_ref()).await {
        Ok(raw) => Response::succeeded(request, raw),
        Err(error) => Response::failed(request, error),
    }
}

/// Parse the per-request proxy override, if any.
fn resolve_proxy(request: &Request) -> Result<Option<Url>> {
    request
        .proxy_url()
        .map(|raw| Url::parse(raw).map_err(|err| Error::invalid_proxy(raw, err.to_string())))
        .transpose()
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};

    use super::*;
    use crate::Method;
    use crate::test_support::{StubTransport, request};

    #[tokio::test]
    async fn construction_error_skips_transport() {
        let transport = Arc::new(StubTransport::ok("never"));
        let broken = Request::builder(Method::Get, "not a url").build();
        let_assert!(Some(expected) = broken.error().cloned());

        let response = dispatch(Arc::clone(&transport), broken).await;

        check!(transport.calls() == 0);
        check!(response.error() == Some(&expected));
        check!(response.meta().is_none());
    }

    #[tokio::test]
    async fn transport_error_is_recorded() {
        let transport = Arc::new(StubTransport::failing(Error::connection("refused")));

        let response = dispatch(Arc::clone(&transport), request()).await;

        check!(transport.calls() == 1);
        check!(response.error() == Some(&Error::connection("refused")));
        check!(response.body().is_empty());
    }

    #[tokio::test]
    async fn success_populates_meta() {
        let transport = Arc::new(StubTransport::ok("hello"));

        let response = dispatch(transport, request()).await;

        check!(response.error().is_none());
        check!(response.status() == Some(200));
        check!(response.body().as_ref() == b"hello");
    }

    #[tokio::test]
    async fn proxy_is_passed_for_this_call_only() {
        let transport = Arc::new(StubTransport::ok(""));
        let proxied = Request::builder(Method::Get, "https://example.com")
            .proxy("http://proxy.example:8080")
            .build();

        dispatch(Arc::clone(&transport), proxied).await;
        dispatch(Arc::clone(&transport), request()).await;

        check!(
            transport.proxies()
                == vec![Some("http://proxy.example:8080/".to_string()), None]
        );
    }

    #[tokio::test]
    async fn malformed_proxy_is_a_transport_error() {
        let transport = Arc::new(StubTransport::ok(""));
        let proxied = Request::builder(Method::Get, "https://example.com")
            .proxy("::not a proxy")
            .build();

        let response = dispatch(Arc::clone(&transport), proxied).await;

        check!(transport.calls() == 0);
        let_assert!(Some(Error::InvalidProxy { proxy, .. }) = response.error());
        check!(proxy == "::not a proxy");
    }
}
