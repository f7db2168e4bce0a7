//! Error taxonomy for control-socket queries.
//!
//! Every failure is terminal for the current exchange. Nothing is retried.

use std::io;

use thiserror::Error;

/// Errors produced while resolving an endpoint or running an exchange.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The socket could not be allocated.
    #[error("cannot create socket for {endpoint}: {source}")]
    SocketCreateFailed {
        endpoint: String,
        #[source]
        source: io::Error,
    },

    /// The peer is unreachable, not listening, or did not answer in time.
    #[error("cannot connect to {endpoint}: {source}")]
    ConnectFailed {
        endpoint: String,
        #[source]
        source: io::Error,
    },

    /// The local socket path does not fit in `sun_path`.
    #[error("socket path is {len} bytes, limit is {max}")]
    AddressTooLong { len: usize, max: usize },

    /// The command could not be written in a single write.
    #[error("cannot write to socket: {source}")]
    WriteFailed {
        #[source]
        source: io::Error,
    },

    /// The response could not be read.
    #[error("cannot read from socket: {source}")]
    ReadFailed {
        #[source]
        source: io::Error,
    },

    /// The arguments match neither `path command` nor `host port command`.
    #[error("invalid number of parameters: got {got}, expected {expected}")]
    InvalidParameterCount { got: usize, expected: &'static str },

    /// The port argument is not a valid TCP port.
    #[error("invalid port: {0:?}")]
    InvalidPort(String),

    /// The item key is not of the form `key` or `key[params]`.
    #[error("malformed item key {key:?}: {reason}")]
    InvalidItemKey { key: String, reason: &'static str },

    /// The item key is well formed but not in the catalog.
    #[error("unsupported item key: {0}")]
    UnknownItem(String),
}

impl ClientError {
    /// Stable category name, printed by the CLI in front of the detail.
    pub fn category(&self) -> &'static str {
        match self {
            Self::SocketCreateFailed { .. } => "SocketCreateFailed",
            Self::ConnectFailed { .. } => "ConnectFailed",
            Self::AddressTooLong { .. } => "AddressTooLong",
            Self::WriteFailed { .. } => "WriteFailed",
            Self::ReadFailed { .. } => "ReadFailed",
            Self::InvalidParameterCount { .. } => "InvalidParameterCount",
            Self::InvalidPort(_) => "InvalidPort",
            Self::InvalidItemKey { .. } => "InvalidItemKey",
            Self::UnknownItem(_) => "UnknownItem",
        }
    }

    /// Returns `true` if the failure happened before any socket was touched.
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            Self::AddressTooLong { .. }
                | Self::InvalidParameterCount { .. }
                | Self::InvalidPort(_)
                | Self::InvalidItemKey { .. }
                | Self::UnknownItem(_)
        )
    }
}

/// Build the error reported when a phase exceeds its deadline.
pub(crate) fn timed_out(phase: &str) -> io::Error {
    io::Error::new(io::ErrorKind::TimedOut, format!("{} timed out", phase))
}
