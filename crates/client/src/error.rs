//! Error types for the client crate.

use std::time::Duration;

use protocol::{CorrelationId, ProtocolError, ResponseError};
use thiserror::Error;

use crate::transport::TransportError;

/// Errors surfaced to callers of the request client.
///
/// Call completions receive these in their error slot; synchronous failures
/// of [`Client::call`](crate::Client::call) are returned directly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// No transport is attached to the client.
    #[error("not connected")]
    NotConnected,

    /// A call with this id is already outstanding.
    #[error("correlation id {0} is already outstanding")]
    DuplicateId(CorrelationId),

    /// The transport refused the outbound envelope.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The connection went away before a response arrived.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// No response arrived within the configured timeout.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The completion was dropped without being invoked.
    #[error("request was cancelled")]
    Cancelled,

    /// The response was classified as a failure.
    #[error(transparent)]
    Response(#[from] ResponseError),

    /// An envelope could not be built.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl From<ProtocolError> for ClientError {
    fn from(err: ProtocolError) -> Self {
        ClientError::Protocol(err.to_string())
    }
}

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
