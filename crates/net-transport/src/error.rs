//! Transport error types

use crypto_session::CryptoError;
use shared_protocol::{HandshakeState, ProtocolError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Link closed by peer")]
    LinkClosed,

    #[error("Stopped before completion")]
    Stopped,

    #[error("Handshake incomplete: still in {0:?}")]
    HandshakeIncomplete(HandshakeState),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type TransportResult<T> = Result<T, TransportError>;
