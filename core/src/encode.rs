//! Body and query-string encoding.
//!
//! # Design
//! `encode_body` is the single place that maps a logical body plus a declared
//! content type onto wire bytes and the header value describing them. A
//! combination with no defined encoding produces no payload and no header,
//! which is a deliberate fallback rather than an error; values the declared
//! encoding cannot represent fail loudly before any I/O happens.

use std::collections::BTreeMap;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::error::EncodeError;
use crate::http::ContentType;
use crate::multipart;
use crate::request::Body;
use crate::scalar::Scalar;

/// RFC 3986 unreserved characters stay literal; everything else is escaped.
const QUERY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// An encoded body and the `Content-Type` value describing it, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedBody {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// Percent-encode one query key or value.
pub fn url_encode(value: &str) -> String {
    utf8_percent_encode(value, QUERY_ENCODE_SET).to_string()
}

/// `?k=v&…` for a non-empty query, the empty string otherwise. Keys and
/// values are percent-encoded independently; entries follow key order.
pub fn query_string(query: &BTreeMap<String, Scalar>) -> String {
    if query.is_empty() {
        return String::new();
    }
    let entries: Vec<String> = query
        .iter()
        .map(|(key, value)| format!("{}={}", url_encode(key), url_encode(&value.to_string())))
        .collect();
    format!("?{}", entries.join("&"))
}

/// Encode a non-raw body under the declared content type.
///
/// Field maps serialize to pretty-printed JSON under [`ContentType::JSON`]
/// and [`ContentType::FORM_URL_ENCODED`], with the declared type as the
/// header value, and to multipart under [`ContentType::MULTIPART_FORM_DATA`];
/// any other declaration leaves the request without a payload. Item lists
/// are always multipart-framed, whatever was declared. `Raw` bodies never
/// reach this function; `Request::materialize` passes them through verbatim.
pub fn encode_body(
    body: &Body,
    content_type: Option<&ContentType>,
) -> Result<Option<EncodedBody>, EncodeError> {
    match body {
        Body::Empty | Body::Raw(_) => Ok(None),
        Body::Fields(fields) => match content_type {
            // Url-encoded form declarations ship the same JSON payload as
            // JSON ones; only the header value differs.
            Some(declared)
                if *declared == ContentType::JSON
                    || *declared == ContentType::FORM_URL_ENCODED =>
            {
                let mut object = serde_json::Map::new();
                for (key, value) in fields {
                    object.insert(key.clone(), value.to_json(key)?);
                }
                let bytes = serde_json::to_vec_pretty(&serde_json::Value::Object(object))
                    .map_err(|e| EncodeError::Serialization(e.to_string()))?;
                Ok(Some(EncodedBody {
                    bytes,
                    content_type: Some(declared.as_str().to_string()),
                }))
            }
            Some(declared) if *declared == ContentType::MULTIPART_FORM_DATA => {
                let builder = multipart::Builder::from_fields(fields);
                Ok(Some(EncodedBody {
                    content_type: Some(builder.content_type()),
                    bytes: builder.build(),
                }))
            }
            _ => Ok(None),
        },
        Body::Multipart(items) => {
            let builder = multipart::Builder::from_items(items.clone());
            Ok(Some(EncodedBody {
                content_type: Some(builder.content_type()),
                bytes: builder.build(),
            }))
        }
    }
}
