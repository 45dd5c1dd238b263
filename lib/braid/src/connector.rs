//! Connectors for the default transport: direct HTTPS, and the two ways of
//! going through an HTTP proxy.
//!
//! Plain `http` targets are forwarded: the connection goes to the proxy and
//! the request line carries the absolute target URL. `https` targets are
//! tunnelled: an HTTP `CONNECT` to the proxy, then TLS end to end.

use std::error::Error as StdError;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use http::{HeaderValue, Uri};
use hyper::rt::{Read, ReadBufCursor, Write};
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::connect::{Connected, Connection, HttpConnector, proxy::Tunnel};
use percent_encoding::percent_decode_str;
use tower_service::Service;
use url::Url;

use crate::{ClientConfig, Error, Result};

type BoxError = Box<dyn StdError + Send + Sync>;

fn tls_config() -> rustls::ClientConfig {
    let root_store: rustls::RootCertStore =
        webpki_roots::TLS_SERVER_ROOTS.iter().cloned().collect();

    rustls::ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth()
}

fn http_connector(config: &ClientConfig) -> HttpConnector {
    let mut http = HttpConnector::new();
    http.enforce_http(false);
    http.set_connect_timeout(Some(config.connect_timeout));
    http
}

/// Create a direct HTTPS connector with rustls.
///
/// This connector supports both HTTP/1.1 and HTTP/2, with TLS enabled
/// using the Mozilla root certificates.
#[must_use]
pub fn https_connector(config: &ClientConfig) -> HttpsConnector<HttpConnector> {
    HttpsConnectorBuilder::new()
        .with_tls_config(tls_config())
        .https_or_http()
        .enable_http1()
        .enable_http2()
        .wrap_connector(http_connector(config))
}

/// Address of `proxy` as a connector destination.
///
/// Only `http` proxies with a host are accepted.
fn proxy_destination(proxy: &Url) -> Result<Uri> {
    if proxy.scheme() != "http" {
        return Err(Error::invalid_proxy(
            proxy.as_str(),
            format!("unsupported proxy scheme '{}'", proxy.scheme()),
        ));
    }
    let host = proxy
        .host_str()
        .ok_or_else(|| Error::invalid_proxy(proxy.as_str(), "missing host"))?;
    let port = proxy.port_or_known_default().unwrap_or(80);
    format!("http://{host}:{port}")
        .parse()
        .map_err(|err: http::uri::InvalidUri| Error::invalid_proxy(proxy.as_str(), err.to_string()))
}

/// Create an HTTPS connector reaching `https` destinations through an
/// HTTP `CONNECT` tunnel opened on `proxy`.
///
/// Credentials in the proxy URL are sent as `Proxy-Authorization: Basic` on
/// the `CONNECT` request.
///
/// # Errors
///
/// Returns [`Error::InvalidProxy`] for a non-`http` scheme or a URL without
/// a host.
pub fn tunnel_connector(
    proxy: &Url,
    config: &ClientConfig,
) -> Result<HttpsConnector<Tunnel<HttpConnector>>> {
    let mut tunnel = Tunnel::new(proxy_destination(proxy)?, http_connector(config));
    if let Some(auth) = proxy_authorization(proxy) {
        tunnel = tunnel.with_auth(auth);
    }

    Ok(HttpsConnectorBuilder::new()
        .with_tls_config(tls_config())
        .https_only()
        .enable_http1()
        .wrap_connector(tunnel))
}

/// Create a connector for plain `http` destinations behind `proxy`.
///
/// # Errors
///
/// Same as [`tunnel_connector`].
pub fn forward_connector(proxy: &Url, config: &ClientConfig) -> Result<ForwardConnector> {
    Ok(ForwardConnector {
        proxy: proxy_destination(proxy)?,
        http: http_connector(config),
    })
}

/// Connector dialing the proxy whatever the destination.
///
/// Its connections report themselves as proxied, which makes hyper send the
/// request target in absolute form (`GET http://host/path`).
#[derive(Debug, Clone)]
pub struct ForwardConnector {
    proxy: Uri,
    http: HttpConnector,
}

impl Service<Uri> for ForwardConnector {
    type Response = Proxied<<HttpConnector as Service<Uri>>::Response>;
    type Error = BoxError;
    type Future = Pin<Box<dyn Future<Output = std::result::Result<Self::Response, BoxError>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<std::result::Result<(), BoxError>> {
        self.http.poll_ready(cx).map_err(Into::into)
    }

    fn call(&mut self, _destination: Uri) -> Self::Future {
        let connecting = self.http.call(self.proxy.clone());
        Box::pin(async move { connecting.await.map(Proxied).map_err(Into::into) })
    }
}

/// Connection to a forward proxy.
#[derive(Debug)]
pub struct Proxied<T>(T);

impl<T: Connection> Connection for Proxied<T> {
    fn connected(&self) -> Connected {
        self.0.connected().proxy(true)
    }
}

impl<T: Read + Unpin> Read for Proxied<T> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: ReadBufCursor<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.0).poll_read(cx, buf)
    }
}

impl<T: Write + Unpin> Write for Proxied<T> {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.0).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.0).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.0).poll_shutdown(cx)
    }

    fn is_write_vectored(&self) -> bool {
        self.0.is_write_vectored()
    }

    fn poll_write_vectored(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        bufs: &[io::IoSlice<'_>],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.0).poll_write_vectored(cx, bufs)
    }
}

/// `Proxy-Authorization: Basic` value for the userinfo of `proxy`, if any.
pub fn proxy_authorization(proxy: &Url) -> Option<HeaderValue> {
    if proxy.username().is_empty() {
        return None;
    }
    let username = percent_decode_str(proxy.username()).decode_utf8_lossy();
    let password = proxy
        .password()
        .map(|password| percent_decode_str(password).decode_utf8_lossy())
        .unwrap_or_default();
    let credentials = STANDARD.encode(format!("{username}:{password}"));

    let mut value = HeaderValue::from_str(&format!("Basic {credentials}")).ok()?;
    value.set_sensitive(true);
    Some(value)
}
