//! Session driver and high-level client.

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::Instrument;

use super::config::Config;
use super::stream::connect;
use super::tap::Tap;
use super::transport::Transport;
use crate::command::Command;
use crate::error::{Error, Result};
use crate::parser::ReplyDecoder;
use crate::session::{Effect, Event, Session};
use crate::types::{Envelope, Reply};

/// Owns the stream and receive buffer for one session.
///
/// The stream is held in an `Option` so it can be moved out for the TLS
/// upgrade and so that closing happens at most once.
#[derive(Debug)]
struct Connection<T> {
    stream: Option<T>,
    buffer: BytesMut,
    decoder: ReplyDecoder,
}

impl<T: AsyncRead + AsyncWrite + Unpin> Connection<T> {
    fn new(stream: T) -> Self {
        Self {
            stream: Some(stream),
            buffer: BytesMut::with_capacity(4096),
            decoder: ReplyDecoder::new(),
        }
    }

    fn stream(&mut self) -> Result<&mut T> {
        self.stream
            .as_mut()
            .ok_or_else(|| Error::InvalidState("Connection already closed".into()))
    }

    async fn send(&mut self, command: &Command) -> Result<()> {
        let data = command.serialize();
        let stream = self.stream()?;
        stream.write_all(&data).await?;
        stream.flush().await?;
        Ok(())
    }

    /// Reads the next complete reply.
    ///
    /// Returns `Ok(None)` if the server closed the connection between
    /// replies.
    async fn read_reply(&mut self) -> Result<Option<Reply>> {
        loop {
            if let Some(reply) = self.decoder.decode(&mut self.buffer)? {
                return Ok(Some(reply));
            }

            let Some(stream) = self.stream.as_mut() else {
                return Err(Error::InvalidState("Connection already closed".into()));
            };
            if stream.read_buf(&mut self.buffer).await? == 0 {
                return self.decoder.decode_eof(&mut self.buffer);
            }
        }
    }

    async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.shutdown().await {
                tracing::debug!(error = %e, "Shutdown failed");
            }
        }
    }
}

impl<T: Transport> Connection<T> {
    async fn upgrade_to_tls(&mut self, hostname: &str) -> Result<()> {
        // Bytes received before the handshake must not be read as if they
        // had been protected by it.
        if !self.buffer.is_empty() {
            return Err(Error::Protocol(
                "Server sent data after accepting STARTTLS".into(),
            ));
        }
        let Some(stream) = self.stream.take() else {
            return Err(Error::InvalidState("Connection already closed".into()));
        };
        self.stream = Some(stream.upgrade_to_tls(hostname).await?);
        self.decoder = ReplyDecoder::new();
        Ok(())
    }
}

/// Delivers one message over an already connected transport.
///
/// Runs the whole session: banner, greeting, optional STARTTLS and AUTH
/// LOGIN, then the mail transaction and QUIT. The transport is shut down
/// exactly once before this returns, whatever the outcome.
///
/// # Errors
///
/// Returns the first error of the session: a negative or unexpected reply,
/// a framing error, or a transport failure.
pub async fn deliver<T: Transport>(stream: T, config: &Config, envelope: &Envelope) -> Result<()> {
    let mut session = Session::new(config, envelope, stream.is_tls());
    let mut conn = Connection::new(stream);

    let result = drive(&mut conn, &mut session, &config.hostname).await;
    conn.close().await;

    match &result {
        Ok(()) => tracing::info!(
            recipients = envelope.recipients().len(),
            tls = session.is_tls_active(),
            "Message delivered"
        ),
        Err(e) => tracing::warn!(
            error = %e,
            step = session.state().name(),
            "Delivery failed"
        ),
    }
    result
}

async fn drive<T: Transport>(
    conn: &mut Connection<T>,
    session: &mut Session<'_>,
    hostname: &str,
) -> Result<()> {
    loop {
        let mut effect = match conn.read_reply().await? {
            Some(reply) => {
                tracing::debug!(code = reply.code.as_u16(), "Received reply");
                session.handle(Event::Reply(&reply))?
            }
            None => session.handle(Event::Closed)?,
        };

        loop {
            match effect {
                Effect::Send(command) => {
                    tracing::debug!(command = command.name(), "Sending command");
                    conn.send(&command).await?;
                    break;
                }
                Effect::UpgradeTls => {
                    tracing::debug!("Starting TLS handshake");
                    conn.upgrade_to_tls(hostname).await?;
                    effect = session.handle(Event::TlsEstablished)?;
                }
                Effect::Finish => return Ok(()),
            }
        }
    }
}

/// SMTP client that sends each message over a fresh connection.
///
/// # Example
///
/// ```ignore
/// use maildrop_smtp::{Client, Config, Envelope, Security, SignInMethod};
///
/// let config = Config::builder("smtp.example.com")
///     .security(Security::StartTls)
///     .sign_in(SignInMethod::credentials("user", "secret"))
///     .build();
/// let client = Client::new(config);
///
/// let envelope = Envelope::new(
///     "me@example.com",
///     ["you@example.com"],
///     "Subject: Hi\r\n\r\nHello!",
/// )?;
/// client.send(&envelope).await?;
/// ```
#[derive(Debug, Clone)]
pub struct Client {
    config: Config,
}

impl Client {
    /// Creates a client for the given server.
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }

    /// Returns the server configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Connects, delivers the message and disconnects.
    ///
    /// Calls are independent; any number may run concurrently.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Timeout`] if connecting takes longer than the
    /// configured timeout, or any error from [`deliver`].
    pub async fn send(&self, envelope: &Envelope) -> Result<()> {
        let span = tracing::info_span!(
            "smtp",
            host = %self.config.hostname,
            port = self.config.port
        );
        async {
            let stream = connect(&self.config).await?;
            tracing::debug!(tls = stream.is_tls(), "Connected");
            deliver(Tap::new(stream), &self.config, envelope).await
        }
        .instrument(span)
        .await
    }
}
