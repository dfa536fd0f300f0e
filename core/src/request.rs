//! The request model: what to call and how to frame it.
//!
//! # Design
//! A `Request` is mutable while the caller describes the call, then snapshots
//! into a transport-ready [`HttpRequest`] exactly once, when the session
//! consumes it. Every construction mints a fresh [`RequestId`]; duplication
//! goes through [`Request::from_request`] so a copy can never collide with
//! the original in the session's in-flight registry. `Clone` is deliberately
//! not derived for the same reason.

use std::collections::BTreeMap;
use std::fmt;

use uuid::Uuid;

use crate::cookie::{self, CookieJar};
use crate::encode;
use crate::error::EncodeError;
use crate::http::{ContentType, HttpRequest, Method};
use crate::multipart;
use crate::scalar::Scalar;

/// Identifier of one logical request. Fresh for every construction and never
/// shared by duplicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(Uuid);

impl RequestId {
    fn new() -> RequestId {
        RequestId(Uuid::new_v4())
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Request payload.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Body {
    /// No payload.
    #[default]
    Empty,

    /// Bytes handed to the transport verbatim, bypassing the encoder.
    Raw(Vec<u8>),

    /// Form fields, framed according to the declared content type.
    Fields(BTreeMap<String, Scalar>),

    /// Explicit multipart items, framed in order.
    Multipart(Vec<multipart::Item>),
}

/// One HTTP call to make: URL, method, headers, query and body, plus the
/// per-request cookie and logging switches.
#[derive(Debug)]
pub struct Request {
    id: RequestId,
    url: String,
    method: Method,
    pub headers: BTreeMap<String, String>,
    pub query: Option<BTreeMap<String, Scalar>>,
    pub body: Body,
    pub content_type: Option<ContentType>,
    pub should_handle_cookies: bool,
    pub is_logging_enabled: bool,
}

impl Request {
    pub fn new(url: impl Into<String>, method: Method) -> Request {
        Request {
            id: RequestId::new(),
            url: url.into(),
            method,
            headers: BTreeMap::new(),
            query: None,
            body: Body::Empty,
            content_type: None,
            should_handle_cookies: false,
            is_logging_enabled: true,
        }
    }

    pub fn get(url: impl Into<String>) -> Request {
        Request::new(url, Method::Get)
    }

    pub fn post(url: impl Into<String>) -> Request {
        Request::new(url, Method::Post)
    }

    pub fn put(url: impl Into<String>) -> Request {
        Request::new(url, Method::Put)
    }

    pub fn delete(url: impl Into<String>) -> Request {
        Request::new(url, Method::Delete)
    }

    /// Duplicate another request's URL, method, query, body and headers under
    /// a fresh identifier. The content type and the cookie and logging
    /// switches reset to their defaults.
    pub fn from_request(other: &Request) -> Request {
        let mut request = Request::new(other.url.clone(), other.method);
        request.headers = other.headers.clone();
        request.query = other.query.clone();
        request.body = other.body.clone();
        request
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn method(&self) -> Method {
        self.method
    }

    fn query_string(&self) -> String {
        match &self.query {
            Some(query) => encode::query_string(query),
            None => String::new(),
        }
    }

    /// Snapshot this request into transport-ready form.
    ///
    /// Appends the encoded query string to the URL, resolves cookies for the
    /// final URL when cookie handling is on, adds the explicit headers, and
    /// delegates body framing to the encoder. `Raw` bodies bypass the encoder
    /// and contribute no `Content-Type` header.
    pub fn materialize(&self, jar: &CookieJar) -> Result<HttpRequest, EncodeError> {
        let mut url = self.url.clone();
        url.push_str(&self.query_string());

        let mut headers: Vec<(String, String)> = Vec::new();
        if self.should_handle_cookies {
            let cookies = jar.cookies_for(&url);
            if !cookies.is_empty() {
                headers.push(cookie::request_header(&cookies));
            }
        }
        for (name, value) in &self.headers {
            headers.push((name.clone(), value.clone()));
        }

        let body = match &self.body {
            Body::Raw(bytes) => Some(bytes.clone()),
            other => match encode::encode_body(other, self.content_type.as_ref())? {
                Some(encoded) => {
                    if let Some(content_type) = encoded.content_type {
                        headers.push(("Content-Type".to_string(), content_type));
                    }
                    Some(encoded.bytes)
                }
                None => None,
            },
        };

        Ok(HttpRequest {
            method: self.method,
            url,
            headers,
            body,
        })
    }

    /// Debug dump of the request, silent unless logging is enabled for it.
    /// The format is for humans and not part of any contract.
    pub fn log_print(&self) {
        if !self.is_logging_enabled {
            return;
        }
        let body = match &self.body {
            Body::Empty => String::new(),
            Body::Raw(bytes) => format!("<{} raw byte(s)>", bytes.len()),
            Body::Fields(fields) => format!("{fields:?}"),
            Body::Multipart(items) => format!("<{} multipart item(s)>", items.len()),
        };
        log::debug!(
            "request {id}: {method} {url}{query} headers={headers:?} {body}",
            id = self.id,
            method = self.method,
            url = self.url,
            query = self.query_string(),
            headers = self.headers,
            body = body,
        );
    }
}
