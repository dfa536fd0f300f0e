//! Request dispatch, in-flight bookkeeping and cancellation.
//!
//! # Design
//! A session owns a transport and a registry of outstanding request ids.
//! Completions arriving from the transport are marshaled onto one dedicated
//! worker thread before touching shared state, so registry removal, response
//! construction, cookie persistence and the caller's handler all run
//! serialized, in arrival order.
//!
//! `cancel` only removes bookkeeping: a completion that finds its id gone
//! does nothing. That makes the handler fire at most once per send and never
//! after cancellation, without requiring the transport to support aborting
//! I/O that is already in flight.

use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;

use crate::cookie::CookieJar;
use crate::error::EncodeError;
use crate::request::{Request, RequestId};
use crate::response::Response;
use crate::transport::{AcceptAllTrust, Transport, TrustPolicy};

type Job = Box<dyn FnOnce() + Send + 'static>;

static SHARED: Mutex<Option<Arc<Session>>> = Mutex::new(None);

/// Dispatches requests through a transport and tracks them until their
/// completion handlers run.
pub struct Session {
    transport: Arc<dyn Transport>,
    trust_policy: Arc<dyn TrustPolicy>,
    cookie_jar: Arc<CookieJar>,
    in_flight: Arc<Mutex<HashSet<RequestId>>>,
    completions: mpsc::Sender<Job>,
}

impl Session {
    /// A session over `transport` with the process-wide cookie jar and the
    /// accept-all trust policy.
    pub fn new(transport: impl Transport + 'static) -> Session {
        Session::builder(transport).build()
    }

    pub fn builder(transport: impl Transport + 'static) -> SessionBuilder {
        SessionBuilder {
            transport: Arc::new(transport),
            trust_policy: Arc::new(AcceptAllTrust),
            cookie_jar: CookieJar::shared(),
        }
    }

    /// Install `session` as the process-wide instance. Fails and hands the
    /// session back when one is already installed.
    pub fn init_shared(session: Session) -> Result<Arc<Session>, Session> {
        let mut shared = SHARED.lock().unwrap();
        if shared.is_some() {
            return Err(session);
        }
        let handle = Arc::new(session);
        *shared = Some(Arc::clone(&handle));
        Ok(handle)
    }

    /// The process-wide instance, when one has been installed.
    pub fn shared() -> Option<Arc<Session>> {
        SHARED.lock().unwrap().clone()
    }

    /// Drop the process-wide instance. Existing handles keep their session
    /// alive; subsequent [`Session::shared`] calls see none.
    pub fn reset_shared() {
        *SHARED.lock().unwrap() = None;
    }

    /// Ids dispatched but not yet completed or cancelled.
    pub fn outstanding(&self) -> Vec<RequestId> {
        self.in_flight.lock().unwrap().iter().copied().collect()
    }

    /// Forget `id`. The completion for a cancelled id becomes a no-op;
    /// transport I/O already in flight is not aborted.
    pub fn cancel(&self, id: RequestId) {
        self.in_flight.lock().unwrap().remove(&id);
    }

    /// Dispatch `request`, delivering an `R` to `handler` when the transport
    /// completes. The handler runs on the session's completion thread, at
    /// most once, and never after [`Session::cancel`].
    ///
    /// Fails before any I/O when the body cannot be framed as declared; a
    /// failed send leaves nothing registered.
    pub fn send<R, F>(&self, request: Request, handler: F) -> Result<RequestId, EncodeError>
    where
        R: Response,
        F: FnOnce(R) + Send + 'static,
    {
        let id = request.id();
        self.in_flight.lock().unwrap().insert(id);
        request.log_print();

        let http_request = match request.materialize(&self.cookie_jar) {
            Ok(materialized) => materialized,
            Err(error) => {
                self.in_flight.lock().unwrap().remove(&id);
                return Err(error);
            }
        };

        let completions = self.completions.clone();
        let in_flight = Arc::clone(&self.in_flight);
        let cookie_jar = Arc::clone(&self.cookie_jar);
        let url = request.url().to_string();
        let should_handle_cookies = request.should_handle_cookies;
        let is_logging_enabled = request.is_logging_enabled;

        // The handle could abort the call, but cancellation is bookkeeping
        // only; dropping it lets the transport run to completion.
        let _handle = self.transport.issue(
            http_request,
            Arc::clone(&self.trust_policy),
            Box::new(move |raw| {
                let job: Job = Box::new(move || {
                    if !in_flight.lock().unwrap().remove(&id) {
                        return;
                    }
                    let response = R::from_http(raw, is_logging_enabled);
                    if should_handle_cookies {
                        if let Some(cookies) = response.extracted_cookies() {
                            cookie_jar.set_cookies(cookies, &url);
                        }
                    }
                    response.log_print();
                    handler(response);
                });
                // A send error means the session and its worker are gone;
                // nobody is listening, so the completion is discarded.
                let _ = completions.send(job);
            }),
        );

        Ok(id)
    }
}

/// Configures a [`Session`].
pub struct SessionBuilder {
    transport: Arc<dyn Transport>,
    trust_policy: Arc<dyn TrustPolicy>,
    cookie_jar: Arc<CookieJar>,
}

impl SessionBuilder {
    /// Use `jar` instead of the process-wide shared jar.
    pub fn cookie_jar(mut self, jar: Arc<CookieJar>) -> SessionBuilder {
        self.cookie_jar = jar;
        self
    }

    /// Replace the default accept-all trust policy.
    pub fn trust_policy(mut self, policy: impl TrustPolicy + 'static) -> SessionBuilder {
        self.trust_policy = Arc::new(policy);
        self
    }

    pub fn build(self) -> Session {
        let (sender, receiver) = mpsc::channel::<Job>();
        // Completion worker: one job at a time, in arrival order, until the
        // session and every pending completion sender are gone. A panicking
        // handler is contained so later completions still run.
        thread::spawn(move || {
            while let Ok(job) = receiver.recv() {
                if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                    log::error!("completion handler panicked");
                }
            }
        });
        Session {
            transport: self.transport,
            trust_policy: self.trust_policy,
            cookie_jar: self.cookie_jar,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
            completions: sender,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::cookie::Cookie;
    use crate::error::TransportError;
    use crate::http::{HttpRequest, HttpResponse};
    use crate::response::BasicResponse;
    use crate::transport::{Completion, ServerTrust, TransportHandle};

    /// Records issued requests and lets the test fire their completions by
    /// hand, in any order.
    struct ManualTransport {
        issued: Mutex<Vec<(HttpRequest, Option<Completion>)>>,
    }

    impl ManualTransport {
        fn new() -> Arc<ManualTransport> {
            Arc::new(ManualTransport {
                issued: Mutex::new(Vec::new()),
            })
        }

        fn issued_count(&self) -> usize {
            self.issued.lock().unwrap().len()
        }

        fn request_at(&self, index: usize) -> HttpRequest {
            self.issued.lock().unwrap()[index].0.clone()
        }

        fn complete(&self, index: usize, raw: HttpResponse) {
            let completion = self.issued.lock().unwrap()[index]
                .1
                .take()
                .expect("completion already fired");
            completion(raw);
        }
    }

    impl Transport for ManualTransport {
        fn issue(
            &self,
            request: HttpRequest,
            _trust: Arc<dyn TrustPolicy>,
            on_complete: Completion,
        ) -> TransportHandle {
            self.issued
                .lock()
                .unwrap()
                .push((request, Some(on_complete)));
            TransportHandle::detached()
        }
    }

    fn isolated_session(transport: Arc<ManualTransport>) -> Session {
        Session::builder(transport)
            .cookie_jar(Arc::new(CookieJar::new()))
            .build()
    }

    fn quiet_get(url: &str) -> Request {
        let mut request = Request::get(url);
        request.is_logging_enabled = false;
        request
    }

    #[test]
    fn completion_reaches_the_handler() {
        let transport = ManualTransport::new();
        let session = isolated_session(Arc::clone(&transport));

        let (sender, receiver) = mpsc::channel();
        let id = session
            .send::<BasicResponse, _>(quiet_get("http://test.local/a"), move |response| {
                sender.send(response).unwrap();
            })
            .unwrap();

        assert_eq!(session.outstanding(), vec![id]);
        transport.complete(0, HttpResponse::completed(200, Vec::new(), b"ok".to_vec()));

        let response = receiver.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(response.status, Some(200));
        assert_eq!(response.text(), "ok");
        assert!(session.outstanding().is_empty());
    }

    #[test]
    fn cancelled_request_never_reaches_its_handler() {
        let transport = ManualTransport::new();
        let session = isolated_session(Arc::clone(&transport));

        let (sender, receiver) = mpsc::channel();
        let id = session
            .send::<BasicResponse, _>(quiet_get("http://test.local/a"), move |_| {
                sender.send(()).unwrap();
            })
            .unwrap();
        session.cancel(id);
        assert!(session.outstanding().is_empty());

        transport.complete(0, HttpResponse::completed(200, Vec::new(), Vec::new()));

        // A sentinel send flushes the serial completion worker, so by the
        // time it returns the cancelled completion has been processed.
        let (flush_sender, flush_receiver) = mpsc::channel();
        session
            .send::<BasicResponse, _>(quiet_get("http://test.local/b"), move |_| {
                flush_sender.send(()).unwrap();
            })
            .unwrap();
        transport.complete(1, HttpResponse::completed(200, Vec::new(), Vec::new()));
        flush_receiver.recv_timeout(Duration::from_secs(5)).unwrap();

        assert!(receiver.try_recv().is_err(), "cancelled handler must not run");
    }

    #[test]
    fn completions_survive_a_panicking_handler() {
        let transport = ManualTransport::new();
        let session = isolated_session(Arc::clone(&transport));

        session
            .send::<BasicResponse, _>(quiet_get("http://test.local/boom"), |_| {
                panic!("handler failure");
            })
            .unwrap();
        transport.complete(0, HttpResponse::completed(500, Vec::new(), Vec::new()));

        // The worker must still be serving completions afterwards.
        let (sender, receiver) = mpsc::channel();
        session
            .send::<BasicResponse, _>(quiet_get("http://test.local/next"), move |response| {
                sender.send(response.status).unwrap();
            })
            .unwrap();
        transport.complete(1, HttpResponse::completed(200, Vec::new(), Vec::new()));

        assert_eq!(
            receiver.recv_timeout(Duration::from_secs(5)).unwrap(),
            Some(200)
        );
        assert!(session.outstanding().is_empty());
    }

    #[test]
    fn concurrent_sends_complete_independently() {
        let transport = ManualTransport::new();
        let session = isolated_session(Arc::clone(&transport));

        let (sender_a, receiver_a) = mpsc::channel();
        session
            .send::<BasicResponse, _>(quiet_get("http://test.local/a"), move |response| {
                sender_a.send(response.text()).unwrap();
            })
            .unwrap();
        let (sender_b, receiver_b) = mpsc::channel();
        session
            .send::<BasicResponse, _>(quiet_get("http://test.local/b"), move |response| {
                sender_b.send(response.text()).unwrap();
            })
            .unwrap();

        assert_eq!(transport.request_at(0).url, "http://test.local/a");
        assert_eq!(transport.request_at(1).url, "http://test.local/b");

        // Complete out of order; each handler still sees its own outcome.
        transport.complete(1, HttpResponse::completed(200, Vec::new(), b"b-body".to_vec()));
        transport.complete(0, HttpResponse::completed(200, Vec::new(), b"a-body".to_vec()));

        assert_eq!(
            receiver_b.recv_timeout(Duration::from_secs(5)).unwrap(),
            "b-body"
        );
        assert_eq!(
            receiver_a.recv_timeout(Duration::from_secs(5)).unwrap(),
            "a-body"
        );
        assert!(session.outstanding().is_empty());
    }

    #[test]
    fn encode_failure_is_synchronous_and_leaves_no_trace() {
        let transport = ManualTransport::new();
        let session = isolated_session(Arc::clone(&transport));

        let mut request = Request::post("http://test.local/stats");
        request.is_logging_enabled = false;
        request.content_type = Some(crate::http::ContentType::JSON);
        request.body = crate::request::Body::Fields(std::collections::BTreeMap::from([(
            "ratio".to_string(),
            crate::scalar::Scalar::Float(f64::NAN),
        )]));

        let error = session
            .send::<BasicResponse, _>(request, |_| panic!("handler must not run"))
            .unwrap_err();

        assert!(matches!(error, EncodeError::UnrepresentableJson { .. }));
        assert_eq!(transport.issued_count(), 0, "nothing may reach the transport");
        assert!(session.outstanding().is_empty());
    }

    #[test]
    fn cookies_persist_when_the_request_opts_in() {
        let transport = ManualTransport::new();
        let jar = Arc::new(CookieJar::new());
        let session = Session::builder(Arc::clone(&transport))
            .cookie_jar(Arc::clone(&jar))
            .build();

        let mut request = quiet_get("http://test.local/login");
        request.should_handle_cookies = true;

        let (sender, receiver) = mpsc::channel();
        session
            .send::<BasicResponse, _>(request, move |_| {
                sender.send(()).unwrap();
            })
            .unwrap();
        transport.complete(
            0,
            HttpResponse::completed(
                200,
                vec![("Set-Cookie".to_string(), "sid=abc; Path=/".to_string())],
                Vec::new(),
            ),
        );
        receiver.recv_timeout(Duration::from_secs(5)).unwrap();

        let cookies = jar.cookies_for("http://test.local/account");
        assert_eq!(cookies, vec![{
            let mut cookie = Cookie::new("sid", "abc");
            cookie.path = Some("/".to_string());
            cookie
        }]);
    }

    #[test]
    fn cookies_are_ignored_without_opt_in() {
        let transport = ManualTransport::new();
        let jar = Arc::new(CookieJar::new());
        let session = Session::builder(Arc::clone(&transport))
            .cookie_jar(Arc::clone(&jar))
            .build();

        let (sender, receiver) = mpsc::channel();
        session
            .send::<BasicResponse, _>(quiet_get("http://test.local/login"), move |_| {
                sender.send(()).unwrap();
            })
            .unwrap();
        transport.complete(
            0,
            HttpResponse::completed(
                200,
                vec![("Set-Cookie".to_string(), "sid=abc".to_string())],
                Vec::new(),
            ),
        );
        receiver.recv_timeout(Duration::from_secs(5)).unwrap();

        assert!(jar.cookies_for("http://test.local/").is_empty());
    }

    /// Fails the handshake for every host, standing in for a transport that
    /// consults the policy mid-exchange.
    struct PickyTransport;

    impl Transport for PickyTransport {
        fn issue(
            &self,
            request: HttpRequest,
            trust: Arc<dyn TrustPolicy>,
            on_complete: Completion,
        ) -> TransportHandle {
            let host = crate::cookie::host_of(&request.url)
                .unwrap_or_default()
                .to_string();
            let offered = ServerTrust {
                host: host.clone(),
                certificate_der: None,
            };
            if trust.evaluate(&offered) {
                on_complete(HttpResponse::completed(200, Vec::new(), Vec::new()));
            } else {
                on_complete(HttpResponse::failed(TransportError::TrustRejected { host }));
            }
            TransportHandle::detached()
        }
    }

    struct RejectAllTrust;

    impl TrustPolicy for RejectAllTrust {
        fn evaluate(&self, _trust: &ServerTrust) -> bool {
            false
        }
    }

    #[test]
    fn trust_rejection_arrives_as_a_response_error() {
        let session = Session::builder(PickyTransport)
            .cookie_jar(Arc::new(CookieJar::new()))
            .trust_policy(RejectAllTrust)
            .build();

        let (sender, receiver) = mpsc::channel();
        session
            .send::<BasicResponse, _>(quiet_get("https://secure.test/data"), move |response| {
                sender.send(response).unwrap();
            })
            .unwrap();

        let response = receiver.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(response.status, None);
        assert_eq!(
            response.error,
            Some(TransportError::TrustRejected {
                host: "secure.test".to_string()
            })
        );
    }

    #[test]
    fn default_policy_lets_the_exchange_proceed() {
        let session = Session::builder(PickyTransport)
            .cookie_jar(Arc::new(CookieJar::new()))
            .build();

        let (sender, receiver) = mpsc::channel();
        session
            .send::<BasicResponse, _>(quiet_get("https://secure.test/data"), move |response| {
                sender.send(response.status).unwrap();
            })
            .unwrap();

        assert_eq!(
            receiver.recv_timeout(Duration::from_secs(5)).unwrap(),
            Some(200)
        );
    }

    #[test]
    fn shared_session_installs_once() {
        Session::reset_shared();
        assert!(Session::shared().is_none());

        let Ok(installed) = Session::init_shared(isolated_session(ManualTransport::new())) else {
            panic!("first install must succeed");
        };
        let seen = Session::shared().expect("installed session is visible");
        assert!(Arc::ptr_eq(&installed, &seen));

        // A second install is refused and hands the session back.
        let rejected = Session::init_shared(Session::new(ManualTransport::new()));
        assert!(rejected.is_err());

        Session::reset_shared();
        assert!(Session::shared().is_none());
    }
}
