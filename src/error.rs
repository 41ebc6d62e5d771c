//! Error types for the bot core.
//!
//! Each concern gets its own error enum: parsing, rotation lists, channel
//! modes and connection setup. Configuration and collaborator errors live
//! next to the code that raises them.

use thiserror::Error;

/// Errors encountered when parsing raw IRC lines.
///
/// Only an empty line is a hard failure; every other malformed line degrades
/// into a partially populated [`Message`](crate::Message).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MessageParseError {
    /// Line was empty (or only a line terminator).
    #[error("empty message")]
    EmptyMessage,
}

/// Errors raised by [`RotationList`](crate::RotationList).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RotationError {
    /// A rotation list needs at least one candidate.
    #[error("rotation list cannot be empty")]
    Empty,

    /// The value to promote is not in the list.
    #[error("value not found in rotation list: {0}")]
    NotFound(String),
}

/// Errors raised by the channel mode mutator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModeError {
    /// The letter belongs to none of the known mode classes.
    #[error("unknown channel mode: {0}")]
    UnknownMode(char),

    /// A status or list mode was applied without its parameter.
    #[error("mode {0} requires a parameter")]
    MissingParameter(char),
}

/// Errors encountered while opening a connection to a server.
#[cfg(feature = "tokio")]
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConnectError {
    /// The TCP handshake did not finish within the configured timeout.
    #[error("timed out connecting to {server}")]
    Timeout {
        /// The `host:port` that was attempted.
        server: String,
    },

    /// The socket could not be opened or registration could not be written.
    #[error("failed to connect to {server}: {source}")]
    Io {
        /// The `host:port` that was attempted.
        server: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}
