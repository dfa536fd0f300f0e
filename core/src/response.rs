//! Typed response construction.
//!
//! # Design
//! The session is generic over anything constructible from the raw transport
//! outcome; callers pick the decoding by choosing `R` at the `send` call
//! site. [`BasicResponse`] keeps the outcome as-is and knows how to extract
//! `Set-Cookie` headers; [`JsonResponse`] decodes the body into a typed
//! value. Decoding is best-effort: a body that does not parse leaves `data`
//! empty instead of failing the completion.

use serde::de::DeserializeOwned;

use crate::cookie::Cookie;
use crate::error::TransportError;
use crate::http::HttpResponse;

/// Capability of being built from a raw transport outcome.
pub trait Response: Send + 'static {
    /// Construct from the raw outcome and the originating request's logging
    /// switch.
    fn from_http(raw: HttpResponse, is_logging_enabled: bool) -> Self
    where
        Self: Sized;

    /// Cookies this response carries, if the type knows how to extract them.
    /// `None` means there is nothing to persist.
    fn extracted_cookies(&self) -> Option<Vec<Cookie>> {
        None
    }

    /// Debug dump, respecting the logging switch the value was constructed
    /// with.
    fn log_print(&self) {}
}

/// A response that keeps the raw outcome unchanged.
#[derive(Debug, Clone)]
pub struct BasicResponse {
    pub status: Option<u16>,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
    pub error: Option<TransportError>,
    is_logging_enabled: bool,
}

impl BasicResponse {
    /// Body as UTF-8 text, lossy and empty when there is none.
    pub fn text(&self) -> String {
        self.body
            .as_deref()
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
            .unwrap_or_default()
    }

    pub fn is_success(&self) -> bool {
        self.status.is_some_and(|status| (200..300).contains(&status))
    }
}

impl Response for BasicResponse {
    fn from_http(raw: HttpResponse, is_logging_enabled: bool) -> BasicResponse {
        BasicResponse {
            status: raw.status,
            headers: raw.headers,
            body: raw.body,
            error: raw.error,
            is_logging_enabled,
        }
    }

    fn extracted_cookies(&self) -> Option<Vec<Cookie>> {
        let cookies: Vec<Cookie> = self
            .headers
            .iter()
            .filter(|(name, _)| name.eq_ignore_ascii_case("set-cookie"))
            .filter_map(|(_, value)| Cookie::parse_set_cookie(value))
            .collect();
        if cookies.is_empty() {
            None
        } else {
            Some(cookies)
        }
    }

    fn log_print(&self) {
        if !self.is_logging_enabled {
            return;
        }
        log::debug!(
            "response: status={status:?} error={error:?} headers={headers:?} {body}",
            status = self.status,
            error = self.error,
            headers = self.headers,
            body = self.text(),
        );
    }
}

/// A response that decodes its body as JSON into `T`.
#[derive(Debug, Clone)]
pub struct JsonResponse<T> {
    pub status: Option<u16>,
    pub error: Option<TransportError>,
    /// The decoded body, or `None` when there was no body or it did not
    /// parse as `T`.
    pub data: Option<T>,
    is_logging_enabled: bool,
}

impl<T> Response for JsonResponse<T>
where
    T: DeserializeOwned + Send + 'static,
{
    fn from_http(raw: HttpResponse, is_logging_enabled: bool) -> JsonResponse<T> {
        let data = raw
            .body
            .as_deref()
            .and_then(|bytes| serde_json::from_slice(bytes).ok());
        JsonResponse {
            status: raw.status,
            error: raw.error,
            data,
            is_logging_enabled,
        }
    }

    fn log_print(&self) {
        if !self.is_logging_enabled {
            return;
        }
        log::debug!(
            "response: status={status:?} error={error:?} decoded={decoded}",
            status = self.status,
            error = self.error,
            decoded = self.data.is_some(),
        );
    }
}
