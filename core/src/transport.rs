//! The transport seam: how the session hands I/O to a platform HTTP stack.
//!
//! # Design
//! The session never performs network I/O. A [`Transport`] implementation
//! receives a transport-ready request plus the session's trust policy,
//! performs the exchange on threads it owns, and reports the raw outcome
//! through a one-shot completion callback, from any thread. The returned
//! handle can abort the underlying call, but the session does not retain it:
//! cancelling a request suppresses its completion effects without stopping
//! I/O already in flight.

use std::sync::Arc;

use crate::http::{HttpRequest, HttpResponse};

/// One-shot completion callback. May be invoked from any thread, at most
/// once per issued request.
pub type Completion = Box<dyn FnOnce(HttpResponse) + Send + 'static>;

/// The credential a server offered during a TLS handshake.
#[derive(Debug, Clone)]
pub struct ServerTrust {
    pub host: String,
    /// DER-encoded leaf certificate, when the transport can surface it.
    pub certificate_der: Option<Vec<u8>>,
}

/// Decides whether to accept a server's offered credential.
pub trait TrustPolicy: Send + Sync {
    /// `true` accepts the credential and lets the exchange proceed; `false`
    /// makes the transport fail the call with a trust error.
    fn evaluate(&self, trust: &ServerTrust) -> bool;
}

/// Accepts every offered credential without validation.
///
/// This is the default policy and performs no certificate checking at all.
/// Supply a strict [`TrustPolicy`] wherever that is unacceptable.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAllTrust;

impl TrustPolicy for AcceptAllTrust {
    fn evaluate(&self, _trust: &ServerTrust) -> bool {
        true
    }
}

/// Handle to an in-flight transport call.
pub struct TransportHandle {
    abort: Option<Box<dyn FnOnce() + Send>>,
}

impl TransportHandle {
    /// A handle for transports that cannot abort an in-flight call.
    pub fn detached() -> TransportHandle {
        TransportHandle { abort: None }
    }

    /// A handle that runs `abort` when asked to stop the call.
    pub fn with_abort(abort: impl FnOnce() + Send + 'static) -> TransportHandle {
        TransportHandle {
            abort: Some(Box::new(abort)),
        }
    }

    /// Abort the underlying call if the transport supports it.
    pub fn abort(mut self) {
        if let Some(abort) = self.abort.take() {
            abort();
        }
    }
}

/// A platform HTTP stack the session dispatches through.
pub trait Transport: Send + Sync {
    /// Issue the request. `on_complete` must be called at most once with the
    /// raw outcome; a transport that cannot deliver an outcome should call it
    /// with a failed response rather than dropping it silently.
    fn issue(
        &self,
        request: HttpRequest,
        trust: Arc<dyn TrustPolicy>,
        on_complete: Completion,
    ) -> TransportHandle;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn issue(
        &self,
        request: HttpRequest,
        trust: Arc<dyn TrustPolicy>,
        on_complete: Completion,
    ) -> TransportHandle {
        (**self).issue(request, trust, on_complete)
    }
}
