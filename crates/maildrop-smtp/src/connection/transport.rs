//! Byte transport that can be upgraded to TLS in place.

use std::future::Future;

use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::Result;

/// A bidirectional byte stream carrying an SMTP session.
///
/// The session never needs to know which concrete stream is active; it only
/// asks for an upgrade after a successful STARTTLS reply. Implementations
/// must re-use the existing connection rather than open a new one.
pub trait Transport: AsyncRead + AsyncWrite + Unpin + Send + Sized {
    /// Performs a TLS handshake over this stream and returns the encrypted
    /// stream.
    ///
    /// # Errors
    ///
    /// Returns an error if the handshake fails or the stream is already TLS.
    /// The original stream is consumed either way.
    fn upgrade_to_tls(self, hostname: &str) -> impl Future<Output = Result<Self>> + Send;

    /// Returns true if traffic on this stream is encrypted.
    fn is_tls(&self) -> bool;
}
