//! Sans-I/O SMTP delivery state machine.
//!
//! The session decides what to send next; it never touches a socket. The
//! driver in [`connection`](crate::connection) feeds it [`Event`]s and
//! carries out the [`Effect`] each one produces:
//!
//! ```text
//! banner ─→ HELO/EHLO ─→ [STARTTLS ─→ handshake ─→ HELO/EHLO]
//!        ─→ [AUTH LOGIN ─→ user ─→ password]
//!        ─→ MAIL FROM ─→ RCPT TO × n ─→ DATA ─→ payload ─→ QUIT
//! ```
//!
//! Each step expects a reply of one class (2xx or 3xx). The first reply
//! outside that class ends the session with [`Error::SmtpError`]; QUIT is
//! not sent after a failure.

mod state;

pub use state::SessionState;

use std::io;

use crate::command::Command;
use crate::connection::{Config, HelloMethod, SignInMethod};
use crate::error::{Error, Result};
use crate::types::{Capabilities, Envelope, Reply, ReplyClass};

/// Input to the state machine.
#[derive(Debug, Clone, Copy)]
pub enum Event<'a> {
    /// A complete reply arrived.
    Reply(&'a Reply),
    /// The TLS handshake requested by [`Effect::UpgradeTls`] finished.
    TlsEstablished,
    /// The server closed the connection between replies.
    Closed,
}

/// What the driver must do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Write the command and wait for its reply.
    Send(Command),
    /// Run the TLS handshake over the current connection, then report
    /// [`Event::TlsEstablished`].
    UpgradeTls,
    /// The message was delivered; close the connection.
    Finish,
}

/// One delivery attempt over one connection.
#[derive(Debug)]
pub struct Session<'a> {
    config: &'a Config,
    envelope: &'a Envelope,
    state: SessionState,
    tls_active: bool,
    capabilities: Capabilities,
}

impl<'a> Session<'a> {
    /// Creates a session waiting for the server banner.
    ///
    /// `tls_active` is true when the transport is already encrypted
    /// (implicit TLS); STARTTLS is then never attempted.
    #[must_use]
    pub fn new(config: &'a Config, envelope: &'a Envelope, tls_active: bool) -> Self {
        Self {
            config,
            envelope,
            state: SessionState::AwaitingBanner,
            tls_active,
            capabilities: Capabilities::default(),
        }
    }

    /// Returns the current step.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Returns true if the session runs over TLS.
    #[must_use]
    pub const fn is_tls_active(&self) -> bool {
        self.tls_active
    }

    /// Returns the extensions from the latest EHLO reply.
    #[must_use]
    pub const fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// Advances the session by one event.
    ///
    /// # Errors
    ///
    /// Returns the error that ends the session: a reply of the wrong class,
    /// a refused or missing mandatory STARTTLS, the connection closing
    /// before QUIT, or an event the current step cannot accept. The session
    /// is [`SessionState::Failed`] afterwards and rejects further events.
    pub fn handle(&mut self, event: Event<'_>) -> Result<Effect> {
        let state = std::mem::replace(&mut self.state, SessionState::Failed);
        let (next, effect) = self.transition(state, event)?;
        if next != state {
            tracing::debug!(from = state.name(), to = next.name(), "session step");
        }
        self.state = next;
        Ok(effect)
    }

    fn transition(
        &mut self,
        state: SessionState,
        event: Event<'_>,
    ) -> Result<(SessionState, Effect)> {
        use SessionState as S;

        match (state, event) {
            (S::AwaitingBanner, Event::Reply(reply)) => {
                expect_class(reply, ReplyClass::PositiveCompletion)?;
                Ok((S::AwaitingGreeting, Effect::Send(self.greet())))
            }
            (S::AwaitingGreeting, Event::Reply(reply)) => {
                expect_class(reply, ReplyClass::PositiveCompletion)?;
                self.record_capabilities(reply);
                self.after_greeting()
            }
            (S::AwaitingStartTls, Event::Reply(reply)) => {
                if reply.is_success() {
                    return Ok((S::Upgrading, Effect::UpgradeTls));
                }
                if self.config.security.is_starttls_required() {
                    return Err(rejected(reply));
                }
                tracing::warn!(
                    code = reply.code.as_u16(),
                    "STARTTLS refused, continuing without TLS"
                );
                Ok(self.begin_transaction())
            }
            (S::Upgrading, Event::TlsEstablished) => {
                self.tls_active = true;
                let greet = Command::GreetAfterTls {
                    hostname: self.config.hello_name.clone(),
                    method: self.config.hello_method,
                };
                Ok((S::AwaitingGreetingAfterTls, Effect::Send(greet)))
            }
            (S::AwaitingGreetingAfterTls, Event::Reply(reply)) => {
                expect_class(reply, ReplyClass::PositiveCompletion)?;
                self.record_capabilities(reply);
                Ok(self.begin_transaction())
            }
            (S::AwaitingAuthUserPrompt, Event::Reply(reply)) => {
                expect_class(reply, ReplyClass::PositiveIntermediate)?;
                let (username, _) = self.credentials()?;
                let user = Command::AuthUser(username.to_string());
                Ok((S::AwaitingAuthPasswordPrompt, Effect::Send(user)))
            }
            (S::AwaitingAuthPasswordPrompt, Event::Reply(reply)) => {
                expect_class(reply, ReplyClass::PositiveIntermediate)?;
                let (_, password) = self.credentials()?;
                let password = Command::AuthPassword(password.to_string());
                Ok((S::AwaitingAuthResult, Effect::Send(password)))
            }
            (S::AwaitingAuthResult, Event::Reply(reply)) => {
                expect_class(reply, ReplyClass::PositiveCompletion)?;
                Ok(self.mail_from())
            }
            (S::AwaitingMailFrom, Event::Reply(reply)) => {
                expect_class(reply, ReplyClass::PositiveCompletion)?;
                Ok(self.recipient_or_data(0))
            }
            (S::AwaitingRecipient { index }, Event::Reply(reply)) => {
                expect_class(reply, ReplyClass::PositiveCompletion)?;
                Ok(self.recipient_or_data(index + 1))
            }
            (S::AwaitingDataReady, Event::Reply(reply)) => {
                expect_class(reply, ReplyClass::PositiveIntermediate)?;
                let payload = Command::Payload(self.envelope.data().to_string());
                Ok((S::AwaitingPayloadAccepted, Effect::Send(payload)))
            }
            (S::AwaitingPayloadAccepted, Event::Reply(reply)) => {
                expect_class(reply, ReplyClass::PositiveCompletion)?;
                Ok((S::AwaitingQuit, Effect::Send(Command::Quit)))
            }
            (S::AwaitingQuit, Event::Reply(reply)) => {
                expect_class(reply, ReplyClass::PositiveCompletion)?;
                Ok((S::Done, Effect::Finish))
            }
            (S::AwaitingQuit, Event::Closed) => Ok((S::Done, Effect::Finish)),
            (state, Event::Closed) if !state.is_terminal() => Err(Error::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("connection closed by server while waiting for {}", state.name()),
            ))),
            (state, event) => Err(Error::InvalidState(format!(
                "unexpected {} while waiting for {}",
                event_name(event),
                state.name()
            ))),
        }
    }

    fn greet(&self) -> Command {
        Command::Greet {
            hostname: self.config.hello_name.clone(),
            method: self.config.hello_method,
        }
    }

    fn record_capabilities(&mut self, reply: &Reply) {
        if self.config.hello_method == HelloMethod::Ehlo {
            self.capabilities = Capabilities::from_ehlo(reply);
            tracing::debug!(extensions = ?self.capabilities.extensions, "server capabilities");
        }
    }

    /// Chooses between STARTTLS and going straight to the transaction.
    ///
    /// After HELO nothing is known about extensions, so STARTTLS is tried.
    fn after_greeting(&self) -> Result<(SessionState, Effect)> {
        let security = self.config.security;
        if self.tls_active || !security.is_starttls_enabled() {
            return Ok(self.begin_transaction());
        }

        let offered = self.config.hello_method == HelloMethod::Helo
            || self.capabilities.supports_starttls();
        if offered {
            return Ok((SessionState::AwaitingStartTls, Effect::Send(Command::StartTls)));
        }
        if security.is_starttls_required() {
            return Err(Error::NotSupported("STARTTLS".into()));
        }
        tracing::warn!("Server does not offer STARTTLS, continuing without TLS");
        Ok(self.begin_transaction())
    }

    fn begin_transaction(&self) -> (SessionState, Effect) {
        if self.config.sign_in.requires_auth() {
            (
                SessionState::AwaitingAuthUserPrompt,
                Effect::Send(Command::AuthLogin),
            )
        } else {
            self.mail_from()
        }
    }

    fn mail_from(&self) -> (SessionState, Effect) {
        let from = Command::MailFrom(self.envelope.from().to_string());
        (SessionState::AwaitingMailFrom, Effect::Send(from))
    }

    fn recipient_or_data(&self, index: usize) -> (SessionState, Effect) {
        match self.envelope.recipients().get(index) {
            Some(to) => (
                SessionState::AwaitingRecipient { index },
                Effect::Send(Command::RcptTo(to.clone())),
            ),
            None => (SessionState::AwaitingDataReady, Effect::Send(Command::Data)),
        }
    }

    fn credentials(&self) -> Result<(&'a str, &'a str)> {
        let config: &'a Config = self.config;
        match &config.sign_in {
            SignInMethod::Credentials { username, password } => Ok((username, password)),
            SignInMethod::Anonymous => Err(Error::InvalidState(
                "AUTH LOGIN prompt without credentials".into(),
            )),
        }
    }
}

/// Fails unless the reply belongs to `class`.
fn expect_class(reply: &Reply, class: ReplyClass) -> Result<()> {
    if reply.code.class() == class {
        Ok(())
    } else {
        Err(rejected(reply))
    }
}

fn rejected(reply: &Reply) -> Error {
    Error::smtp_error(reply.code.as_u16(), reply.message_text())
}

fn event_name(event: Event<'_>) -> String {
    match event {
        Event::Reply(reply) => format!("{} reply", reply.code),
        Event::TlsEstablished => "TLS handshake".to_string(),
        Event::Closed => "connection close".to_string(),
    }
}
