//! Shared cookie jar.

use std::fmt;
use std::sync::{PoisonError, RwLock};

use cookie_store::CookieStore;
use url::Url;

/// Thread-safe cookie jar shared by every request of a transport.
///
/// Cookies are stored from `Set-Cookie` response headers and replayed as a
/// single `Cookie` request header for matching URLs.
#[derive(Default)]
pub struct CookieJar {
    store: RwLock<CookieStore>,
}

impl fmt::Debug for CookieJar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CookieJar").finish_non_exhaustive()
    }
}

impl CookieJar {
    /// Create an empty jar.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store cookies from raw `Set-Cookie` header values received for `url`.
    ///
    /// Values that do not parse as cookies are skipped.
    pub fn set_cookies<'a>(&self, url: &Url, set_cookie: impl IntoIterator<Item = &'a str>) {
        let cookies = set_cookie
            .into_iter()
            .filter_map(|value| cookie::Cookie::parse(value.to_owned()).ok())
            .collect::<Vec<_>>();
        if cookies.is_empty() {
            return;
        }

        self.store
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .store_response_cookies(cookies.into_iter(), url);
    }

    /// Value of the `Cookie` header to send to `url`, if any cookie matches.
    #[must_use]
    pub fn cookie_header(&self, url: &Url) -> Option<String> {
        let store = self.store.read().unwrap_or_else(PoisonError::into_inner);
        let header = store
            .get_request_values(url)
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ");
        (!header.is_empty()).then_some(header)
    }

    /// Remove every cookie.
    pub fn clear(&self) {
        self.store
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
