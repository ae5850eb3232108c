//! Low-level SMTP stream handling.

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use rustls::pki_types::ServerName;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;
use tokio_rustls::rustls::{ClientConfig, RootCertStore};

use super::config::{Config, Security};
use super::transport::Transport;
use crate::error::{Error, Result};

/// SMTP stream (TCP or TLS).
#[derive(Debug)]
pub enum SmtpStream {
    /// Plain TCP connection.
    Plain(TcpStream),
    /// TLS-encrypted connection (boxed to reduce enum size).
    Tls(Box<TlsStream<TcpStream>>),
}

impl Transport for SmtpStream {
    async fn upgrade_to_tls(self, hostname: &str) -> Result<Self> {
        let tcp = match self {
            Self::Plain(tcp) => tcp,
            Self::Tls(_) => return Err(Error::InvalidState("Stream is already TLS".into())),
        };
        let tls = tls_handshake(tcp, hostname).await?;
        Ok(Self::Tls(Box::new(tls)))
    }

    fn is_tls(&self) -> bool {
        matches!(self, Self::Tls(_))
    }
}

impl AsyncRead for SmtpStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_read(cx, buf),
            Self::Tls(stream) => Pin::new(stream).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for SmtpStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_write(cx, buf),
            Self::Tls(stream) => Pin::new(stream).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_flush(cx),
            Self::Tls(stream) => Pin::new(stream).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_shutdown(cx),
            Self::Tls(stream) => Pin::new(stream).poll_shutdown(cx),
        }
    }
}

/// Connects to the configured server.
///
/// For [`Security::Implicit`] the TLS handshake is part of connecting.
/// Both the TCP connect and that handshake are bounded by
/// `config.connect_timeout`.
///
/// # Errors
///
/// Returns [`Error::Timeout`] if the deadline passes, or the underlying I/O
/// or TLS error.
pub async fn connect(config: &Config) -> Result<SmtpStream> {
    tokio::time::timeout(config.connect_timeout, establish(config))
        .await
        .map_err(|_| Error::Timeout(config.connect_timeout))?
}

async fn establish(config: &Config) -> Result<SmtpStream> {
    let tcp = TcpStream::connect((config.hostname.as_str(), config.port)).await?;
    if config.security == Security::Implicit {
        let tls = tls_handshake(tcp, &config.hostname).await?;
        Ok(SmtpStream::Tls(Box::new(tls)))
    } else {
        Ok(SmtpStream::Plain(tcp))
    }
}

async fn tls_handshake(tcp: TcpStream, hostname: &str) -> Result<TlsStream<TcpStream>> {
    let server_name = ServerName::try_from(hostname.to_string())?;
    let tls = create_tls_connector().connect(server_name, tcp).await?;
    Ok(tls)
}

/// Creates a TLS connector with the webpki root certificates.
fn create_tls_connector() -> TlsConnector {
    let root_store = RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
    };

    let config = ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    TlsConnector::from(Arc::new(config))
}
