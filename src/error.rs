use crate::session::Phase;
use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Framing error: {0}")]
    FramingError(String),
    /// A single packet payload could not be decoded. The stream itself is still aligned.
    #[error("Failed to decode packet 0x{packet_id:02x}: {source}")]
    DecodeError { packet_id: i32, source: io::Error },
    #[error("Protocol error: {0}")]
    ProtocolError(String),
    #[error("Disconnected by server: {0}")]
    Disconnected(String),
    #[error("Authentication failed: {0}")]
    AuthError(String),
    #[error("Encryption error: {0}")]
    CryptoError(String),
    #[error("Invalid phase transition from {from:?} to {to:?}")]
    InvalidPhase { from: Phase, to: Phase },
    #[error("Chat message is {0} bytes, the limit is 256")]
    ChatTooLong(usize),
    #[error("Connection closed by peer")]
    ConnectionClosed,
    #[error("Client is no longer running")]
    ClientStopped,
}

impl ClientError {
    pub fn decode(packet_id: i32, source: io::Error) -> Self {
        ClientError::DecodeError { packet_id, source }
    }

    /// Whether the connection has to be torn down after this error.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            ClientError::DecodeError { .. } | ClientError::ChatTooLong(_)
        )
    }
}
