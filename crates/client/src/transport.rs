//! The seam between the client and whatever carries envelopes.
//!
//! Connection establishment, framing and encryption live behind
//! [`Transport`]. The client only needs a synchronous send primitive; inbound
//! envelopes are pushed into [`Client::deliver`](crate::Client::deliver) by the
//! transport's own read loop, or pumped from a channel by
//! [`Client::spawn_reader`](crate::Client::spawn_reader).

use protocol::Envelope;
use thiserror::Error;
use tokio::sync::mpsc;

/// Failure to hand an envelope to the transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The transport has shut down.
    #[error("transport closed")]
    Closed,

    /// The transport rejected the envelope.
    #[error("send failed: {0}")]
    Send(String),
}

/// Outbound half of a duplex envelope transport.
pub trait Transport: Send + Sync {
    /// Queue an envelope for the remote peer.
    ///
    /// Must not block on the peer; failures are reported synchronously.
    fn send(&self, envelope: Envelope) -> Result<(), TransportError>;
}

/// Transport that forwards envelopes into an in-process channel.
///
/// Useful when the real connection runs on its own task and owns the
/// receiving end.
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    tx: mpsc::UnboundedSender<Envelope>,
}

impl ChannelTransport {
    /// Wrap an existing sender.
    pub fn new(tx: mpsc::UnboundedSender<Envelope>) -> Self {
        Self { tx }
    }

    /// Create a transport together with the receiver of everything sent
    /// through it.
    pub fn pair() -> (Self, mpsc::UnboundedReceiver<Envelope>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    /// Returns true once the receiving end has been dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl Transport for ChannelTransport {
    fn send(&self, envelope: Envelope) -> Result<(), TransportError> {
        self.tx.send(envelope).map_err(|_| TransportError::Closed)
    }
}
