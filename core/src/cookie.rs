//! Cookie model, `Set-Cookie` parsing and the process-wide jar.
//!
//! # Design
//! The jar stores cookies per domain. Lookup matches the exact host or any
//! dot-suffix of a stored domain, plus a path check that only matches whole
//! segments. That covers the propagation this layer needs without a full
//! RFC 6265 implementation; expiry and the `Secure`/`HttpOnly` attributes
//! are ignored.
//!
//! [`CookieJar::shared`] is the one process-wide handle. Sessions default to
//! it but accept an explicit jar, which tests use for isolation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

/// A cookie as sent in `Cookie` and received in `Set-Cookie` headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub domain: Option<String>,
    pub path: Option<String>,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Cookie {
        Cookie {
            name: name.into(),
            value: value.into(),
            domain: None,
            path: None,
        }
    }

    /// Parse one `Set-Cookie` header value. Only the `Domain` and `Path`
    /// attributes are kept; everything else is ignored. Returns `None` when
    /// the value carries no `name=value` pair.
    pub fn parse_set_cookie(header: &str) -> Option<Cookie> {
        let mut segments = header.split(';');
        let first = segments.next()?.trim();
        let (name, value) = first.split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }

        let mut cookie = Cookie::new(name, value.trim());
        for segment in segments {
            let Some((attribute, attribute_value)) = segment.split_once('=') else {
                continue;
            };
            let attribute = attribute.trim();
            let attribute_value = attribute_value.trim();
            if attribute.eq_ignore_ascii_case("domain") {
                cookie.domain = Some(attribute_value.trim_start_matches('.').to_string());
            } else if attribute.eq_ignore_ascii_case("path") {
                cookie.path = Some(attribute_value.to_string());
            }
        }
        Some(cookie)
    }
}

/// `Cookie` request-header pair for a set of cookies.
pub(crate) fn request_header(cookies: &[Cookie]) -> (String, String) {
    let value = cookies
        .iter()
        .map(|cookie| format!("{}={}", cookie.name, cookie.value))
        .collect::<Vec<String>>()
        .join("; ");
    ("Cookie".to_string(), value)
}

/// Host component of a URL, without scheme, userinfo or port.
pub(crate) fn host_of(url: &str) -> Option<&str> {
    let rest = url.split_once("://").map(|(_, rest)| rest).unwrap_or(url);
    let authority = rest.split(['/', '?', '#']).next()?;
    let host = authority
        .rsplit_once('@')
        .map(|(_, host)| host)
        .unwrap_or(authority);
    let host = host.split(':').next().unwrap_or(host);
    if host.is_empty() {
        None
    } else {
        Some(host)
    }
}

/// Path component of a URL; `/` when the URL has none.
pub(crate) fn path_of(url: &str) -> &str {
    let rest = url.split_once("://").map(|(_, rest)| rest).unwrap_or(url);
    match rest.find('/') {
        Some(index) => rest[index..].split(['?', '#']).next().unwrap_or("/"),
        None => "/",
    }
}

/// Path match that stops at segment boundaries: `/api` covers `/api` and
/// `/api/users` but not `/apix`.
fn path_matches(request_path: &str, cookie_path: &str) -> bool {
    if request_path == cookie_path {
        return true;
    }
    if !request_path.starts_with(cookie_path) {
        return false;
    }
    cookie_path.ends_with('/') || request_path.as_bytes().get(cookie_path.len()) == Some(&b'/')
}

/// Thread-safe cookie store keyed by domain.
#[derive(Debug, Default)]
pub struct CookieJar {
    store: Mutex<HashMap<String, Vec<Cookie>>>,
}

impl CookieJar {
    pub fn new() -> CookieJar {
        CookieJar::default()
    }

    /// The process-wide jar, lazily initialized and alive for the process.
    pub fn shared() -> Arc<CookieJar> {
        static SHARED: OnceLock<Arc<CookieJar>> = OnceLock::new();
        Arc::clone(SHARED.get_or_init(|| Arc::new(CookieJar::new())))
    }

    /// Cookies whose domain and path match the given URL, in insertion order
    /// within each domain.
    pub fn cookies_for(&self, url: &str) -> Vec<Cookie> {
        let Some(host) = host_of(url) else {
            return Vec::new();
        };
        let path = path_of(url);

        let store = self.store.lock().unwrap();
        let mut matched = Vec::new();
        for (domain, cookies) in store.iter() {
            if host != domain && !host.ends_with(&format!(".{domain}")) {
                continue;
            }
            for cookie in cookies {
                let cookie_path = cookie.path.as_deref().unwrap_or("/");
                if path_matches(path, cookie_path) {
                    matched.push(cookie.clone());
                }
            }
        }
        matched
    }

    /// Store cookies received from `url`. A cookie's own `Domain` attribute
    /// wins over the URL host; a cookie with the same name replaces the
    /// stored one for that domain.
    pub fn set_cookies(&self, cookies: Vec<Cookie>, url: &str) {
        let fallback = host_of(url).map(str::to_string);
        let mut store = self.store.lock().unwrap();
        for cookie in cookies {
            let Some(domain) = cookie.domain.clone().or_else(|| fallback.clone()) else {
                continue;
            };
            let entry = store.entry(domain).or_default();
            entry.retain(|existing| existing.name != cookie.name);
            entry.push(cookie);
        }
    }

    /// Drop every stored cookie.
    pub fn clear(&self) {
        self.store.lock().unwrap().clear();
    }
}
