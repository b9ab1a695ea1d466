//! Asynchronous request client.
//!
//! Requests are fire-and-forget envelopes tagged with a correlation id.
//! Responses may arrive in any order; each is matched to its call by id,
//! classified, and handed to the call's completion exactly once.
//!
//! ```text
//! call ──► register(id) ──► transport.send ─────► remote peer
//!                                                     │
//! completion ◄── classify ◄── take(id) ◄── deliver ◄──┘
//! ```
//!
//! Authentication envelopes bypass the registry and go to the installed
//! [`AuthSession`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use protocol::{classify, CorrelationId, Envelope, RequestType};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::auth::{AuthFlow, AuthHandler, AuthSession};
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::registry::{PendingCall, PendingCalls};
use crate::transport::{Transport, TransportError};

/// What became of an inbound envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The envelope completed the call with this id.
    Completed(CorrelationId),
    /// No call was waiting for it.
    Dropped,
    /// It was handled by the authentication session.
    Auth(AuthFlow),
}

/// Authentication state owned by the client.
///
/// The session is moved out while its hooks run so they can call back into
/// the client without holding the lock.
enum AuthSlot {
    Empty,
    Idle(AuthSession<Box<dyn AuthHandler>>),
    Busy { finished: bool },
}

/// Client-side session with a remote peer.
///
/// The client is `Send + Sync`; share it behind an [`Arc`] between the task
/// issuing requests and the transport's read loop.
pub struct Client {
    config: ClientConfig,
    request_timeout: Option<Duration>,
    transport: RwLock<Option<Arc<dyn Transport>>>,
    pending: PendingCalls,
    next_id: AtomicU64,
    auth: Mutex<AuthSlot>,
}

impl Client {
    /// Create a disconnected client.
    pub fn new(config: ClientConfig) -> Self {
        let request_timeout = config.request_timeout();
        Self {
            config,
            request_timeout,
            transport: RwLock::new(None),
            pending: PendingCalls::new(),
            next_id: AtomicU64::new(1),
            auth: Mutex::new(AuthSlot::Empty),
        }
    }

    /// Override the timeout applied by [`Client::request`].
    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Attach the transport used for outbound envelopes.
    pub fn connect<T: Transport + 'static>(&self, transport: T) {
        let mut slot = self.transport.write().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            info!("Replacing existing transport");
        }
        *slot = Some(Arc::new(transport));
    }

    pub fn is_connected(&self) -> bool {
        self.transport
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Number of calls awaiting a response.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    fn transport(&self) -> Option<Arc<dyn Transport>> {
        self.transport
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Issue a request and arrange for `completion` to receive its outcome.
    ///
    /// Returns the correlation id. If the transport refuses the envelope the
    /// error is returned here, the call is forgotten and `completion` is never
    /// invoked.
    pub fn call<F>(&self, kind: RequestType, data: Value, completion: F) -> Result<CorrelationId>
    where
        F: FnOnce(Result<Value>) + Send + 'static,
    {
        let transport = self.transport().ok_or(ClientError::NotConnected)?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        // Registered before sending so an immediate response finds it.
        self.pending
            .register(id, PendingCall::new(kind, Box::new(completion)))?;

        debug!(id, kind = %kind, "Sending request");
        if let Err(e) = transport.send(Envelope::request(id, kind, data)) {
            warn!(id, kind = %kind, error = %e, "Failed to send request");
            self.pending.take(id);
            return Err(e.into());
        }

        Ok(id)
    }

    /// Issue a request and wait for its outcome.
    ///
    /// Applies the configured request timeout. A call that times out is
    /// removed from the registry, so a late response is dropped.
    pub async fn request(&self, kind: RequestType, data: Value) -> Result<Value> {
        let (tx, mut rx) = oneshot::channel();
        let id = self.call(kind, data, move |outcome| {
            let _ = tx.send(outcome);
        })?;

        let Some(limit) = self.request_timeout else {
            return rx.await.unwrap_or(Err(ClientError::Cancelled));
        };

        match tokio::time::timeout(limit, &mut rx).await {
            Ok(outcome) => outcome.unwrap_or(Err(ClientError::Cancelled)),
            Err(_) => {
                if self.pending.take(id).is_some() {
                    warn!(id, kind = %kind, ?limit, "Request timed out");
                    Err(ClientError::Timeout(limit))
                } else {
                    // Completed between the deadline and the take.
                    rx.await.unwrap_or(Err(ClientError::Cancelled))
                }
            }
        }
    }

    /// Hand an inbound envelope to the client.
    ///
    /// Authentication envelopes go to the authentication session. Anything
    /// else is matched by id; envelopes nobody is waiting for are dropped.
    pub fn deliver(&self, envelope: Envelope) -> Delivery {
        if envelope.is_auth() {
            return self.handle_auth(&envelope);
        }

        match envelope.id {
            Some(id) => self.resolve(id, Some(envelope)),
            None => {
                trace!(kind = %envelope.kind, "Dropping response without correlation id");
                Delivery::Dropped
            }
        }
    }

    /// Complete the call `id` with `response`.
    ///
    /// For transports that correlate on their own. A missing response
    /// completes the call with the nil-response error.
    pub fn resolve(&self, id: CorrelationId, response: Option<Envelope>) -> Delivery {
        let Some(call) = self.pending.take(id) else {
            trace!(id, "Dropping response for unknown call");
            return Delivery::Dropped;
        };

        let kind = call.kind();
        let outcome = classify(response.as_ref())
            .map(|data| kind.success_value(data))
            .map_err(ClientError::from);

        match &outcome {
            Ok(_) => debug!(id, kind = %kind, "Request succeeded"),
            Err(e) => debug!(id, kind = %kind, error = %e, "Request failed"),
        }
        call.complete(outcome);
        Delivery::Completed(id)
    }

    /// Give up on the call `id`, completing it with `error`.
    ///
    /// Returns false if the call had already completed.
    pub fn abandon(&self, id: CorrelationId, error: ClientError) -> bool {
        match self.pending.take(id) {
            Some(call) => {
                debug!(id, kind = %call.kind(), error = %error, "Abandoning request");
                call.complete(Err(error));
                true
            }
            None => false,
        }
    }

    /// Detach the transport and fail every outstanding call.
    ///
    /// The authentication session belongs to the connection and is dropped
    /// too. Returns the number of calls failed.
    pub fn disconnect(&self, reason: &str) -> usize {
        let previous = self
            .transport
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if previous.is_some() {
            info!(reason, "Disconnected");
        }
        *self.auth.lock().unwrap_or_else(PoisonError::into_inner) = AuthSlot::Empty;

        let calls = self.pending.drain();
        let failed = calls.len();
        for (id, call) in calls {
            debug!(id, kind = %call.kind(), "Failing request on disconnect");
            call.complete(Err(ClientError::ConnectionClosed(reason.to_string())));
        }
        failed
    }

    /// Pump inbound envelopes from `inbound` into [`Client::deliver`].
    ///
    /// When the channel closes the client disconnects. Authentication
    /// envelopes are handled on the blocking pool, since their hooks wait for
    /// user input; the reader waits for each one so ordering is preserved.
    pub fn spawn_reader(
        self: &Arc<Self>,
        mut inbound: mpsc::UnboundedReceiver<Envelope>,
    ) -> JoinHandle<()> {
        let client = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(envelope) = inbound.recv().await {
                let delivery = if envelope.is_auth() {
                    let client = Arc::clone(&client);
                    match tokio::task::spawn_blocking(move || client.deliver(envelope)).await {
                        Ok(delivery) => delivery,
                        Err(e) => {
                            warn!(error = %e, "Authentication hook failed");
                            Delivery::Dropped
                        }
                    }
                } else {
                    client.deliver(envelope)
                };

                if let Delivery::Auth(AuthFlow::Stop) = delivery {
                    debug!("Authentication handshake stopped");
                }
            }
            client.disconnect("transport closed");
        })
    }

    /// Install the handler for a new authentication exchange.
    pub fn set_auth_handler<H: AuthHandler + 'static>(&self, handler: H) {
        let session: AuthSession<Box<dyn AuthHandler>> = AuthSession::new(Box::new(handler));
        *self.auth.lock().unwrap_or_else(PoisonError::into_inner) = AuthSlot::Idle(session);
    }

    /// True once the current authentication exchange reached a terminal state.
    pub fn auth_finished(&self) -> bool {
        match &*self.auth.lock().unwrap_or_else(PoisonError::into_inner) {
            AuthSlot::Empty => false,
            AuthSlot::Idle(session) => session.finished(),
            AuthSlot::Busy { finished } => *finished,
        }
    }

    /// Run the session's hooks for `envelope` with the slot unlocked.
    ///
    /// An envelope arriving while another is being handled is dropped. If the
    /// handler was replaced or the client disconnected meanwhile, the session
    /// is discarded instead of put back.
    fn handle_auth(&self, envelope: &Envelope) -> Delivery {
        let mut session = {
            let mut slot = self.auth.lock().unwrap_or_else(PoisonError::into_inner);
            match std::mem::replace(&mut *slot, AuthSlot::Empty) {
                AuthSlot::Idle(session) => {
                    *slot = AuthSlot::Busy {
                        finished: session.finished(),
                    };
                    session
                }
                AuthSlot::Empty => {
                    warn!(kind = %envelope.kind, "No authentication handler installed");
                    return Delivery::Dropped;
                }
                busy @ AuthSlot::Busy { .. } => {
                    *slot = busy;
                    warn!(kind = %envelope.kind, "Authentication handler busy");
                    return Delivery::Dropped;
                }
            }
        };

        let transport = self.transport();
        let flow = session.handle_msg(envelope, |reply| match &transport {
            Some(transport) => transport.send(reply),
            None => Err(TransportError::Closed),
        });

        let mut slot = self.auth.lock().unwrap_or_else(PoisonError::into_inner);
        if let AuthSlot::Busy { .. } = *slot {
            *slot = AuthSlot::Idle(session);
        } else {
            debug!("Authentication session replaced while handling a message");
        }
        Delivery::Auth(flow)
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new(ClientConfig::default())
    }
}
