//! Stub collaborators for unit tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use bytes::Bytes;
use url::Url;

use crate::{Error, Method, RawResponse, Request, Result, Transport};

/// Transport answering every call with the same outcome, counting calls and
/// recording the proxy each call received.
pub(crate) struct StubTransport {
    outcome: Result<RawResponse>,
    calls: AtomicUsize,
    proxies: Mutex<Vec<Option<String>>>,
}

impl StubTransport {
    pub(crate) fn ok(body: &'static str) -> Self {
        let mut headers = HashMap::new();
        headers.insert("content-type".to_string(), "text/plain; charset=utf-8".to_string());
        Self::with_outcome(Ok(RawResponse::new(200, headers, Bytes::from(body))))
    }

    pub(crate) fn bytes(body: &'static [u8]) -> Self {
        Self::with_outcome(Ok(RawResponse::new(200, HashMap::new(), Bytes::from(body))))
    }

    pub(crate) fn failing(error: Error) -> Self {
        Self::with_outcome(Err(error))
    }

    fn with_outcome(outcome: Result<RawResponse>) -> Self {
        Self {
            outcome,
            calls: AtomicUsize::new(0),
            proxies: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn proxies(&self) -> Vec<Option<String>> {
        self.proxies.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl Transport for StubTransport {
    async fn round_trip(&self, _request: &Request, proxy: Option<&Url>) -> Result<RawResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.proxies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(proxy.map(ToString::to_string));
        self.outcome.clone()
    }
}

pub(crate) fn request() -> Request {
    Request::builder(Method::Get, "https://example.com/test").build()
}
