//! Pipe client error types

use std::io;

use cefpipe_core::{ChannelName, ProtocolError};

/// Pipe client result type
pub type Result<T> = std::result::Result<T, Error>;

/// Pipe client errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The channel could not be opened or the worker did not accept in time
    #[error("Failed to connect to {channel}: {source}")]
    ConnectFailure {
        channel: ChannelName,
        #[source]
        source: io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

impl Error {
    /// Whether a read failure means the stream can no longer be used
    ///
    /// Malformed frames that were fully consumed leave the stream aligned on
    /// the next frame and are recoverable. An oversized length prefix is not,
    /// since the payload was never read.
    pub fn is_fatal(&self) -> bool {
        match self {
            Error::Protocol(ProtocolError::UnknownOpcode(_))
            | Error::Protocol(ProtocolError::PayloadLength { .. }) => false,
            Error::Protocol(ProtocolError::PayloadTooLarge { .. }) => true,
            Error::ConnectFailure { .. } | Error::Io(_) | Error::ConnectionClosed => true,
        }
    }
}
