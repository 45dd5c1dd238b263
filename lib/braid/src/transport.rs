//! Default transport using hyper-util.

use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::sync::{Arc, Mutex, PoisonError};

use bytes::Bytes;
use http::HeaderValue;
use http::header::{
    AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, COOKIE, LOCATION, PROXY_AUTHORIZATION,
    SET_COOKIE, WWW_AUTHENTICATE,
};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper_rustls::HttpsConnector;
use hyper_util::{
    client::legacy::{
        Client,
        connect::{Connect, HttpConnector, proxy::Tunnel},
    },
    rt::TokioExecutor,
};
use tracing::debug;
use url::Url;

use crate::connector::{
    ForwardConnector, forward_connector, https_connector, proxy_authorization, tunnel_connector,
};
use crate::{ClientConfig, CookieJar, Error, Method, RawResponse, Request, Result, Transport};

type DirectClient = Client<HttpsConnector<HttpConnector>, Full<Bytes>>;
type TunnelClient = Client<HttpsConnector<Tunnel<HttpConnector>>, Full<Bytes>>;
type ForwardClient = Client<ForwardConnector, Full<Bytes>>;

/// Pooled clients going through one proxy.
#[derive(Clone)]
struct ProxyRoute {
    /// `http` targets, request sent to the proxy in absolute form.
    forward: ForwardClient,
    /// `https` targets, through a `CONNECT` tunnel.
    tunnel: TunnelClient,
    authorization: Option<HeaderValue>,
}

/// HTTP transport with connection pooling, TLS, cookies, redirects and
/// per-call proxies.
///
/// Requests without a proxy share one pooled client. Each distinct proxy gets
/// its own pooled clients, created on first use and kept for later calls; a
/// proxied call never changes what unproxied calls use.
///
/// Redirects are followed up to [`ClientConfig::max_redirects`] hops. Every
/// hop stores and sends cookies, and the whole chain shares one timeout.
///
/// # Example
///
/// ```ignore
/// use braid::{ClientConfig, HyperTransport};
///
/// let transport = HyperTransport::new(ClientConfig::default());
/// ```
pub struct HyperTransport {
    direct: DirectClient,
    proxies: Mutex<HashMap<String, ProxyRoute>>,
    cookies: Option<Arc<CookieJar>>,
    config: ClientConfig,
}

impl fmt::Debug for HyperTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HyperTransport")
            .field("config", &self.config)
            .field("cookies", &self.cookies.is_some())
            .finish_non_exhaustive()
    }
}

impl Default for HyperTransport {
    fn default() -> Self {
        Self::new(ClientConfig::default())
    }
}

impl HyperTransport {
    /// Create a transport, with a fresh cookie jar if `config.cookie_store`
    /// is enabled.
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        let cookies = config.cookie_store.then(|| Arc::new(CookieJar::new()));
        Self::build(config, cookies)
    }

    /// Create a transport sharing an existing cookie jar.
    #[must_use]
    pub fn with_cookie_jar(config: ClientConfig, jar: Arc<CookieJar>) -> Self {
        Self::build(config, Some(jar))
    }

    fn build(config: ClientConfig, cookies: Option<Arc<CookieJar>>) -> Self {
        let direct = Self::pooled(&config, https_connector(&config));
        Self {
            direct,
            proxies: Mutex::new(HashMap::new()),
            cookies,
            config,
        }
    }

    fn pooled<C>(config: &ClientConfig, connector: C) -> Client<C, Full<Bytes>>
    where
        C: Connect + Clone + Send + Sync + 'static,
    {
        Client::builder(TokioExecutor::new())
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_idle_per_host)
            .retry_canceled_requests(config.retry_canceled_requests)
            .build(connector)
    }

    /// The cookie jar, if cookies are enabled.
    #[must_use]
    pub fn cookie_jar(&self) -> Option<&Arc<CookieJar>> {
        self.cookies.as_ref()
    }

    /// Get the transport configuration.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn proxy_route(&self, proxy: &Url) -> Result<ProxyRoute> {
        let mut proxies = self.proxies.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(route) = proxies.get(proxy.as_str()) {
            return Ok(route.clone());
        }

        let route = ProxyRoute {
            forward: Self::pooled(&self.config, forward_connector(proxy, &self.config)?),
            tunnel: Self::pooled(&self.config, tunnel_connector(proxy, &self.config)?),
            authorization: proxy_authorization(proxy),
        };
        proxies.insert(proxy.to_string(), route.clone());
        Ok(route)
    }

    /// Build the hyper request for one hop, adding stored cookies.
    fn build_hyper_request(&self, hop: &Hop) -> Result<http::Request<Full<Bytes>>> {
        let mut builder = http::Request::builder()
            .method(http::Method::from(hop.method))
            .uri(hop.url.as_str());

        let mut cookie = None;
        for (name, value) in &hop.headers {
            if name.eq_ignore_ascii_case(COOKIE.as_str()) {
                cookie = Some(value.clone());
            } else {
                builder = builder.header(name.as_str(), value.as_str());
            }
        }

        let stored = self.cookies.as_ref().and_then(|jar| jar.cookie_header(&hop.url));
        let cookie = match (cookie, stored) {
            (Some(own), Some(stored)) => Some(format!("{own}; {stored}")),
            (own, stored) => own.or(stored),
        };
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }

        let body = hop.body.clone().map_or_else(Full::default, Full::new);
        builder
            .body(body)
            .map_err(|e| Error::invalid_request(e.to_string()))
    }

    /// Extract response headers as a `HashMap`, joining repeated headers.
    fn extract_headers(headers: &http::HeaderMap) -> HashMap<String, String> {
        let mut extracted = HashMap::<String, String>::new();
        for (name, value) in headers {
            let Ok(value) = value.to_str() else {
                continue;
            };
            extracted
                .entry(name.to_string())
                .and_modify(|existing| {
                    existing.push_str(", ");
                    existing.push_str(value);
                })
                .or_insert_with(|| value.to_string());
        }
        extracted
    }

    fn store_cookies(&self, url: &Url, headers: &http::HeaderMap) {
        if let Some(jar) = &self.cookies {
            let set_cookie = headers
                .get_all(SET_COOKIE)
                .iter()
                .filter_map(|value| value.to_str().ok());
            jar.set_cookies(url, set_cookie);
        }
    }

    async fn send_hop(
        &self,
        hop: &Hop,
        route: Option<&ProxyRoute>,
    ) -> Result<http::Response<Incoming>> {
        let mut hyper_request = self.build_hyper_request(hop)?;

        debug!(
            method = %hop.method,
            url = %hop.url,
            proxied = route.is_some(),
            "sending request"
        );

        let pending = match route {
            None => self.direct.request(hyper_request),
            Some(route) if hop.url.scheme() == "https" => route.tunnel.request(hyper_request),
            Some(route) => {
                if let Some(auth) = &route.authorization {
                    hyper_request
                        .headers_mut()
                        .entry(PROXY_AUTHORIZATION)
                        .or_insert_with(|| auth.clone());
                }
                route.forward.request(hyper_request)
            }
        };
        pending.await.map_err(|err| classify(&err))
    }

    async fn exchange(&self, request: &Request, proxy: Option<&Url>) -> Result<RawResponse> {
        let url = request
            .url()
            .ok_or_else(|| Error::invalid_request("request has no URL"))?;
        let route = proxy.map(|proxy| self.proxy_route(proxy)).transpose()?;

        let mut hop = Hop::first(request, url.clone());
        let mut redirects = 0;
        let response = loop {
            let response = self.send_hop(&hop, route.as_ref()).await?;
            let status = response.status().as_u16();
            self.store_cookies(&hop.url, response.headers());

            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|value| value.to_str().ok())
                .filter(|_| is_redirect(status) && self.config.max_redirects > 0)
                .map(ToString::to_string);
            let Some(location) = location else {
                break response;
            };
            if redirects == self.config.max_redirects {
                return Err(Error::TooManyRedirects {
                    max: self.config.max_redirects,
                });
            }

            debug!(status, location = %location, "following redirect");
            hop = hop.follow(status, &location)?;
            redirects += 1;
        };

        let status = response.status().as_u16();
        let headers = Self::extract_headers(response.headers());

        // A failed read drops whatever was collected so far.
        let body = response
            .into_body()
            .collect()
            .await
            .map_err(|e| Error::body(e.to_string()))?
            .to_bytes();

        debug!(status, bytes = body.len(), redirects, "round trip completed");
        Ok(RawResponse::new(status, headers, body))
    }
}

impl Transport for HyperTransport {
    async fn round_trip(&self, request: &Request, proxy: Option<&Url>) -> Result<RawResponse> {
        tokio::time::timeout(self.config.timeout, self.exchange(request, proxy))
            .await
            .map_err(|_| Error::Timeout)?
    }
}

// ============================================================================
// Redirects
// ============================================================================

/// One request on the wire; the first hop mirrors the caller's request.
#[derive(Debug)]
struct Hop {
    method: Method,
    url: Url,
    headers: HashMap<String, String>,
    body: Option<Bytes>,
}

fn is_redirect(status: u16) -> bool {
    matches!(status, 301 | 302 | 303 | 307 | 308)
}

impl Hop {
    fn first(request: &Request, url: Url) -> Self {
        Self {
            method: request.method(),
            url,
            headers: request.headers().clone(),
            body: request.body().cloned(),
        }
    }

    /// The hop answering a redirect to `location`.
    ///
    /// 307 and 308 replay method and body. 301, 302 and 303 switch to `GET`
    /// without a body, except for `HEAD`. Credentials and cookies set on the
    /// request are dropped when the host or port changes.
    fn follow(self, status: u16, location: &str) -> Result<Self> {
        let url = self
            .url
            .join(location)
            .map_err(|err| Error::InvalidRedirect(format!("bad location '{location}': {err}")))?;

        let keeps_method = matches!(status, 307 | 308) || matches!(self.method, Method::Get | Method::Head);
        let (method, body) = if keeps_method {
            (self.method, self.body)
        } else {
            (Method::Get, None)
        };

        let cross_host = url.host_str() != self.url.host_str()
            || url.port_or_known_default() != self.url.port_or_known_default();
        let mut headers = self.headers;
        headers.retain(|name, _| {
            let dropped_body = body.is_none()
                && (name.eq_ignore_ascii_case(CONTENT_TYPE.as_str())
                    || name.eq_ignore_ascii_case(CONTENT_LENGTH.as_str()));
            let sensitive = cross_host
                && [AUTHORIZATION, COOKIE, PROXY_AUTHORIZATION, WWW_AUTHENTICATE]
                    .iter()
                    .any(|header| name.eq_ignore_ascii_case(header.as_str()));
            !dropped_body && !sensitive
        });

        Ok(Self {
            method,
            url,
            headers,
            body,
        })
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Map a hyper client failure, reading its whole cause chain.
///
/// The message joins the chain's descriptions. A rustls failure anywhere in
/// the chain makes it a TLS error, an I/O timeout a timeout, anything else a
/// connection error.
fn classify(err: &(dyn StdError + 'static)) -> Error {
    let mut message = err.to_string();
    let mut tls = is_tls_failure(err);
    let mut timed_out = false;

    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        tls |= is_tls_failure(cause);
        timed_out |= cause
            .downcast_ref::<io::Error>()
            .is_some_and(|io| io.kind() == io::ErrorKind::TimedOut);
        source = cause.source();
    }

    if tls {
        Error::tls(message)
    } else if timed_out {
        Error::Timeout
    } else {
        Error::connection(message)
    }
}

/// I/O errors hide their payload from `source()`; look inside them too.
fn is_tls_failure(err: &(dyn StdError + 'static)) -> bool {
    if err.is::<rustls::Error>() {
        return true;
    }
    err.downcast_ref::<io::Error>()
        .and_then(io::Error::get_ref)
        .is_some_and(|inner| is_tls_failure(inner))
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};

    use super::*;

    fn hop(method: Method, url: &str) -> Hop {
        let request = Request::builder(method, url)
            .header("Authorization", "Bearer t")
            .header("Content-Type", "application/json")
            .header("X-Trace", "1")
            .body("{}")
            .build();
        let_assert!(Some(url) = request.url().cloned());
        Hop::first(&request, url)
    }

    #[test]
    fn transport_default_has_cookies() {
        let transport = HyperTransport::default();
        check!(transport.cookie_jar().is_some());
    }

    #[test]
    fn transport_without_cookies() {
        let config = ClientConfig::builder().cookie_store(false).build();
        let transport = HyperTransport::new(config);
        check!(transport.cookie_jar().is_none());
    }

    #[test]
    fn builds_request_with_stored_and_own_cookies() {
        let jar = Arc::new(CookieJar::new());
        let url = Url::parse("https://example.com/a").expect("valid url");
        jar.set_cookies(&url, ["session=abc; Path=/"]);
        let transport = HyperTransport::with_cookie_jar(ClientConfig::default(), jar);

        let request = Request::builder(Method::Post, url.as_str())
            .header("Cookie", "lang=fr")
            .header("X-Trace", "1")
            .body("payload")
            .build();
        let hop = Hop::first(&request, url);
        let_assert!(Ok(hyper_request) = transport.build_hyper_request(&hop));

        check!(hyper_request.method() == http::Method::POST);
        check!(hyper_request.headers()["x-trace"] == "1");
        check!(hyper_request.headers()[COOKIE] == "lang=fr; session=abc");
    }

    #[test]
    fn repeated_headers_are_joined() {
        let mut headers = http::HeaderMap::new();
        headers.append("vary", http::HeaderValue::from_static("accept"));
        headers.append("vary", http::HeaderValue::from_static("origin"));

        let extracted = HyperTransport::extract_headers(&headers);
        check!(extracted.get("vary").map(String::as_str) == Some("accept, origin"));
    }

    #[tokio::test]
    async fn proxy_routes_are_cached_per_proxy() {
        let transport = HyperTransport::default();
        let proxy = Url::parse("http://user:pw@proxy.example:8080").expect("valid proxy");

        let_assert!(Ok(route) = transport.proxy_route(&proxy));
        let_assert!(Ok(_) = transport.proxy_route(&proxy));
        check!(route.authorization.is_some());
        let proxies = transport.proxies.lock().unwrap_or_else(PoisonError::into_inner);
        check!(proxies.len() == 1);
    }

    #[test]
    fn see_other_switches_to_get_without_body() {
        let_assert!(Ok(next) = hop(Method::Post, "https://example.com/form").follow(303, "/done"));

        check!(next.method == Method::Get);
        check!(next.url.as_str() == "https://example.com/done");
        check!(next.body.is_none());
        check!(!next.headers.contains_key("Content-Type"));
        check!(next.headers.contains_key("Authorization"));
    }

    #[test]
    fn permanent_redirect_replays_method_and_body() {
        let_assert!(
            Ok(next) = hop(Method::Put, "https://example.com/a").follow(308, "https://example.com/b")
        );

        check!(next.method == Method::Put);
        check!(next.body.as_deref() == Some(&b"{}"[..]));
        check!(next.headers.contains_key("Content-Type"));
    }

    #[test]
    fn cross_host_redirect_drops_credentials() {
        let_assert!(
            Ok(next) = hop(Method::Get, "https://example.com/a").follow(302, "https://other.example/b")
        );

        check!(!next.headers.contains_key("Authorization"));
        check!(next.headers.contains_key("X-Trace"));
    }

    #[test]
    fn tls_failure_is_found_inside_io_errors() {
        let rustls = rustls::Error::General("bad certificate".to_string());
        let wrapped = io::Error::other(io::Error::new(io::ErrorKind::InvalidData, rustls));

        let_assert!(Error::Tls(message) = classify(&wrapped));
        check!(message.contains("bad certificate"));
    }

    #[test]
    fn plain_io_failure_is_a_connection_error() {
        let refused = io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused");

        check!(classify(&refused) == Error::connection("connection refused"));
    }

    #[test]
    fn io_timeout_is_a_timeout() {
        #[derive(Debug)]
        struct Connect(io::Error);
        impl fmt::Display for Connect {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("tcp connect error")
            }
        }
        impl StdError for Connect {
            fn source(&self) -> Option<&(dyn StdError + 'static)> {
                Some(&self.0)
            }
        }

        let err = Connect(io::Error::new(io::ErrorKind::TimedOut, "timed out"));
        check!(classify(&err) == Error::Timeout);
    }
}
