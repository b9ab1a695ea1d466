//! Authentication handshake.
//!
//! The remote peer drives the exchange; we react to whichever message
//! arrives. Ordering between message types is not enforced locally, the peer
//! is trusted to sequence the protocol:
//!
//! ```text
//! auth_initialization ──► auth_initialization_response
//! auth_start_method
//! auth_challenge      ──► auth_challenge_response
//! auth_verification   ──► auth_verification_response
//! auth_info           (any time)
//! auth_finished | auth_error(fatal)
//! ```
//!
//! [`AuthSession`] owns the dispatch, the reply shaping and the `finished`
//! flag. Presentation is delegated to an [`AuthHandler`], whose hooks can be
//! overridden individually.

mod handler;
mod prompt;

pub use handler::{is_affirmative, AuthHandler, StandardAuthHandler};
pub use prompt::{Prompter, ScriptedPrompter, TerminalPrompter};

use protocol::auth::{
    AuthChallenge, AuthChallengeResponse, AuthError, AuthInfo, AuthInitialization,
    AuthInitializationResponse, AuthStartMethod, AuthVerification, AuthVerificationResponse,
};
use protocol::{AuthType, Envelope, MessageType, ProtocolError};
use serde::Serialize;
use tracing::{debug, warn};

use crate::transport::TransportError;

/// What the caller of [`AuthSession::handle_msg`] should do next.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFlow {
    /// The message was handled; keep the handshake going.
    Continue,
    /// Stop the handshake and send no further authentication traffic.
    ///
    /// Returned for `auth_error` and for anything not recognised.
    Stop,
}

impl AuthFlow {
    pub fn is_continue(&self) -> bool {
        matches!(self, AuthFlow::Continue)
    }
}

enum Failure {
    Payload(ProtocolError),
    Reply(TransportError),
}

impl From<ProtocolError> for Failure {
    fn from(err: ProtocolError) -> Self {
        Failure::Payload(err)
    }
}

impl From<TransportError> for Failure {
    fn from(err: TransportError) -> Self {
        Failure::Reply(err)
    }
}

/// State of one authentication exchange.
///
/// Created per connection. `finished` only ever moves from false to true.
#[derive(Debug)]
pub struct AuthSession<H> {
    handler: H,
    finished: bool,
}

impl<H: AuthHandler> AuthSession<H> {
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            finished: false,
        }
    }

    /// True once the exchange reached a terminal state.
    pub fn finished(&self) -> bool {
        self.finished
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    /// React to an inbound envelope.
    ///
    /// `reply` sends an envelope back to the peer. A reply that cannot be sent
    /// ends the handshake with [`AuthFlow::Stop`]. A recognised message whose
    /// payload does not decode is treated as unknown.
    pub fn handle_msg<R>(&mut self, envelope: &Envelope, mut reply: R) -> AuthFlow
    where
        R: FnMut(Envelope) -> Result<(), TransportError>,
    {
        let kind = match &envelope.kind {
            MessageType::Auth(kind) if kind.is_inbound() => *kind,
            _ => return self.unknown(envelope),
        };
        debug!(kind = %kind, "Handling authentication message");

        match self.dispatch(kind, envelope, &mut reply) {
            Ok(flow) => flow,
            Err(Failure::Payload(e)) => {
                warn!(kind = %kind, error = %e, "Malformed authentication payload");
                self.unknown(envelope)
            }
            Err(Failure::Reply(e)) => {
                warn!(kind = %kind, error = %e, "Failed to send authentication reply");
                AuthFlow::Stop
            }
        }
    }

    fn dispatch<R>(
        &mut self,
        kind: AuthType,
        envelope: &Envelope,
        reply: &mut R,
    ) -> Result<AuthFlow, Failure>
    where
        R: FnMut(Envelope) -> Result<(), TransportError>,
    {
        match kind {
            AuthType::Initialization => {
                let msg: AuthInitialization = envelope.payload()?;
                let methods = self.handler.on_initialization(&msg);
                send(
                    reply,
                    AuthType::InitializationResponse,
                    &AuthInitializationResponse { methods },
                )?;
                Ok(AuthFlow::Continue)
            }
            AuthType::StartMethod => {
                let msg: AuthStartMethod = envelope.payload()?;
                self.handler.on_start_method(&msg);
                Ok(AuthFlow::Continue)
            }
            AuthType::Challenge => {
                let msg: AuthChallenge = envelope.payload()?;
                let answers = self.handler.on_challenge(&msg);
                send(
                    reply,
                    AuthType::ChallengeResponse,
                    &AuthChallengeResponse { answers },
                )?;
                Ok(AuthFlow::Continue)
            }
            AuthType::Verification => {
                let msg: AuthVerification = envelope.payload()?;
                let valid = self.handler.on_verification(&msg);
                send(
                    reply,
                    AuthType::VerificationResponse,
                    &AuthVerificationResponse { valid },
                )?;
                Ok(AuthFlow::Continue)
            }
            AuthType::Info => {
                let msg: AuthInfo = envelope.payload()?;
                self.handler.on_info(&msg);
                Ok(AuthFlow::Continue)
            }
            AuthType::Error => {
                let msg: AuthError = envelope.payload()?;
                self.handler.on_error(&msg);
                if !self.finished && msg.is_fatal() {
                    self.finished = true;
                }
                Ok(AuthFlow::Stop)
            }
            AuthType::Finished => {
                self.handler.on_finished();
                self.finished = true;
                Ok(AuthFlow::Continue)
            }
            AuthType::InitializationResponse
            | AuthType::ChallengeResponse
            | AuthType::VerificationResponse => Ok(self.unknown(envelope)),
        }
    }

    fn unknown(&mut self, envelope: &Envelope) -> AuthFlow {
        self.handler.on_unknown(envelope);
        AuthFlow::Stop
    }
}

fn send<R, T>(reply: &mut R, kind: AuthType, payload: &T) -> Result<(), Failure>
where
    R: FnMut(Envelope) -> Result<(), TransportError>,
    T: Serialize,
{
    let envelope = Envelope::auth(kind, payload)?;
    reply(envelope)?;
    Ok(())
}
