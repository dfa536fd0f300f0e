//! Client-side HTTP request and response layer over a pluggable transport.
//!
//! # Overview
//! A [`Request`] describes one call: URL, method, headers, typed query and
//! body. The encoder frames bodies as JSON or multipart/form-data, a
//! [`Session`] dispatches the materialized request through a [`Transport`]
//! and tracks it until its completion handler runs, and the [`Response`]
//! trait lets each call site choose the typed view it wants of the raw
//! outcome.
//!
//! # Design
//! - The core performs no network I/O. Transports own their threads and
//!   report through one-shot completion callbacks.
//! - All completion effects of a session run serialized on one worker
//!   thread: registry removal, response construction, cookie persistence,
//!   the caller's handler.
//! - Encoding failures surface synchronously from `send`; transport failures
//!   ride inside the constructed response.
//! - Cookie propagation and server-trust decisions are explicit
//!   collaborators ([`CookieJar`], [`TrustPolicy`]) with permissive
//!   defaults.

pub mod cookie;
pub mod encode;
pub mod error;
pub mod http;
pub mod multipart;
pub mod request;
pub mod response;
pub mod scalar;
pub mod session;
pub mod transport;

pub use cookie::{Cookie, CookieJar};
pub use error::{EncodeError, TransportError};
pub use http::{ContentType, HttpRequest, HttpResponse, Method};
pub use request::{Body, Request, RequestId};
pub use response::{BasicResponse, JsonResponse, Response};
pub use scalar::Scalar;
pub use session::{Session, SessionBuilder};
pub use transport::{
    AcceptAllTrust, Completion, ServerTrust, Transport, TransportHandle, TrustPolicy,
};
