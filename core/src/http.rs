//! Wire-level HTTP types shared by the request model, the session and the
//! transport seam.
//!
//! # Design
//! `HttpRequest` and `HttpResponse` describe one HTTP exchange as plain data.
//! The core builds `HttpRequest` values and consumes `HttpResponse` values
//! without ever touching the network; a `Transport` implementation owns the
//! actual I/O. This separation keeps the core deterministic and easy to test.
//!
//! All fields use owned types (`String`, `Vec`) so snapshots can cross thread
//! boundaries without lifetime concerns.

use std::borrow::Cow;
use std::fmt;

use crate::error::TransportError;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    /// Wire name of the method.
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared framing of a request body.
///
/// Equality compares the underlying wire string, so a value built with
/// [`ContentType::new`] compares equal to the matching constant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentType(Cow<'static, str>);

impl ContentType {
    pub const JSON: ContentType = ContentType(Cow::Borrowed("application/json"));
    pub const FORM_URL_ENCODED: ContentType =
        ContentType(Cow::Borrowed("application/x-www-form-urlencoded"));
    pub const MULTIPART_FORM_DATA: ContentType =
        ContentType(Cow::Borrowed("multipart/form-data"));

    /// A content type from its wire string.
    pub fn new(value: impl Into<String>) -> ContentType {
        ContentType(Cow::Owned(value.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An HTTP request in transport-ready form.
///
/// Produced by `Request::materialize`: the URL already carries the encoded
/// query string, the header list is final and the body is raw bytes. The
/// transport executes it verbatim.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

/// The raw outcome of one transport call.
///
/// A completed exchange carries a status; an exchange that failed before any
/// status line was received carries an error instead. Typed responses are
/// constructed from this via the `Response` trait.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: Option<u16>,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
    pub error: Option<TransportError>,
}

impl HttpResponse {
    /// A completed exchange.
    pub fn completed(status: u16, headers: Vec<(String, String)>, body: Vec<u8>) -> HttpResponse {
        HttpResponse {
            status: Some(status),
            headers,
            body: Some(body),
            error: None,
        }
    }

    /// An exchange that failed before producing a status line.
    pub fn failed(error: TransportError) -> HttpResponse {
        HttpResponse {
            status: None,
            headers: Vec::new(),
            body: None,
            error: Some(error),
        }
    }

    /// First header value with the given name, compared case-insensitively.
    /// The returned borrow is tied to the response alone, not to `name`.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(header, _)| header.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// All header values with the given name, compared case-insensitively.
    pub fn headers_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> {
        self.headers
            .iter()
            .filter(move |(header, _)| header.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}
