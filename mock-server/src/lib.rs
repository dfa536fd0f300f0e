//! HTTP test double for the session tests.
//!
//! Every endpoint reflects what it received back as JSON, so a test can
//! assert on the exact bytes, headers and query the client put on the wire:
//! `/echo` for arbitrary exchanges, `/upload` for strictly parsed multipart,
//! `/status/{code}` and `/delay/{ms}` for outcome shaping, and the
//! `/cookies` pair for the persistence round trip.

use std::collections::HashMap;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{Multipart, Path, Query},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    routing::{any, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

/// Everything the server saw about one request.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Echo {
    pub method: String,
    pub query: HashMap<String, String>,
    pub headers: HashMap<String, String>,
    pub body: String,
}

/// Metadata of one strictly parsed multipart part.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Part {
    pub name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub size: usize,
    pub text: Option<String>,
}

/// The `Cookie` header as the server received it, if any.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CookieEcho {
    pub cookie: Option<String>,
}

pub fn app() -> Router {
    Router::new()
        .route("/echo", any(echo))
        .route("/upload", post(upload))
        .route("/status/{code}", get(status))
        .route("/delay/{ms}", get(delay))
        .route("/cookies/set", get(set_cookies))
        .route("/cookies", get(read_cookies))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn echo(
    method: axum::http::Method,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Json<Echo> {
    let headers = headers
        .iter()
        .map(|(name, value)| {
            (
                name.to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();
    Json(Echo {
        method: method.to_string(),
        query,
        headers,
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}

async fn upload(mut multipart: Multipart) -> Result<Json<Vec<Part>>, StatusCode> {
    let mut parts = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| StatusCode::BAD_REQUEST)?
    {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(|_| StatusCode::BAD_REQUEST)?;
        let text = std::str::from_utf8(&bytes).ok().map(str::to_string);
        parts.push(Part {
            name,
            file_name,
            content_type,
            size: bytes.len(),
            text,
        });
    }
    Ok(Json(parts))
}

async fn status(Path(code): Path<u16>) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_REQUEST)
}

async fn delay(Path(ms): Path<u64>) -> &'static str {
    tokio::time::sleep(Duration::from_millis(ms)).await;
    "delayed"
}

async fn set_cookies(Query(query): Query<HashMap<String, String>>) -> (HeaderMap, &'static str) {
    let mut headers = HeaderMap::new();
    for (name, value) in &query {
        if let Ok(header_value) = HeaderValue::from_str(&format!("{name}={value}; Path=/")) {
            headers.append(header::SET_COOKIE, header_value);
        }
    }
    (headers, "ok")
}

async fn read_cookies(headers: HeaderMap) -> Json<CookieEcho> {
    let cookie = headers
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    Json(CookieEcho { cookie })
}
