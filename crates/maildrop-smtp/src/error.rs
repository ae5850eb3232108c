//! Error types for SMTP delivery.

use std::io;
use std::time::Duration;

/// Result type alias for SMTP operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The envelope was rejected before any connection was opened.
    Validation,
    /// The server answered with an unexpected code, or the reply stream
    /// could not be framed.
    Protocol,
    /// Connecting, reading, writing, or the TLS handshake failed.
    Transport,
    /// Anything else.
    Unknown,
}

/// SMTP error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No recipient with a non-whitespace character was given.
    #[error("Envelope has no valid recipient")]
    InvalidRecipient,

    /// The message body is empty.
    #[error("Envelope message is empty")]
    InvalidMessage,

    /// Server returned a reply outside the class the current step expects.
    #[error("SMTP error {code}: {message}")]
    SmtpError {
        /// Reply code (e.g., 550).
        code: u16,
        /// Reply text from server.
        message: String,
    },

    /// Malformed reply framing.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Feature required by the configuration is not offered by the server.
    #[error("Server does not support {0}")]
    NotSupported(String),

    /// An event arrived that the current session step cannot accept.
    #[error("Invalid state for operation: {0}")]
    InvalidState(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// TLS error.
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// Hostname cannot be used as a TLS server name.
    #[error("Invalid DNS name: {0}")]
    InvalidDnsName(#[from] rustls::pki_types::InvalidDnsNameError),

    /// Connection establishment timed out.
    #[error("Connection timed out after {0:?}")]
    Timeout(Duration),

    /// Unclassified failure.
    ///
    /// Never produced by this crate; for callers wrapping their own
    /// failures into this error type (see [`Error::unknown`]).
    #[error("Unknown error: {0}")]
    Unknown(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// Creates an SMTP error from a reply code and message.
    #[must_use]
    pub fn smtp_error(code: u16, message: impl Into<String>) -> Self {
        Self::SmtpError {
            code,
            message: message.into(),
        }
    }

    /// Wraps an arbitrary error as [`Error::Unknown`].
    pub fn unknown(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Unknown(err.into())
    }

    /// Returns the classification of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidRecipient | Self::InvalidMessage => ErrorKind::Validation,
            Self::SmtpError { .. }
            | Self::Protocol(_)
            | Self::NotSupported(_)
            | Self::InvalidState(_) => ErrorKind::Protocol,
            Self::Io(_) | Self::Tls(_) | Self::InvalidDnsName(_) | Self::Timeout(_) => {
                ErrorKind::Transport
            }
            Self::Unknown(_) => ErrorKind::Unknown,
        }
    }

    /// Returns the reply code if the server rejected a step.
    #[must_use]
    pub const fn reply_code(&self) -> Option<u16> {
        match self {
            Self::SmtpError { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Returns true if this is a permanent error (5xx).
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        matches!(self, Self::SmtpError { code, .. } if *code >= 500 && *code < 600)
    }

    /// Returns true if this is a transient error (4xx).
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::SmtpError { code, .. } if *code >= 400 && *code < 500)
    }
}
