//! # maildrop-smtp
//!
//! An asynchronous SMTP client for delivering one message per connection.
//!
//! ## Features
//!
//! - **Security modes**: plaintext, implicit TLS (port 465), mandatory or
//!   opportunistic STARTTLS
//! - **Authentication**: AUTH LOGIN with username and password
//! - **Greeting**: EHLO (default) or HELO
//! - **Sans-I/O core**: the [`session`] state machine decides every step and
//!   can be driven over any [`Transport`]
//!
//! ## Quick Start
//!
//! ```ignore
//! use maildrop_smtp::{Client, Config, Envelope, Security, SignInMethod};
//!
//! #[tokio::main]
//! async fn main() -> maildrop_smtp::Result<()> {
//!     let config = Config::builder("smtp.example.com")
//!         .security(Security::StartTls)
//!         .sign_in(SignInMethod::credentials("user@example.com", "password"))
//!         .build();
//!
//!     let envelope = Envelope::new(
//!         "user@example.com",
//!         ["friend@example.org"],
//!         "Subject: Test\r\n\r\nHello, World!",
//!     )?;
//!
//!     Client::new(config).send(&envelope).await
//! }
//! ```
//!
//! ## Session Flow
//!
//! ```text
//! banner ─→ EHLO ─→ STARTTLS ─→ EHLO ─→ AUTH LOGIN ─→ MAIL FROM
//!        ─→ RCPT TO × n ─→ DATA ─→ message ─→ QUIT
//! ```
//!
//! The first negative reply ends the session with [`Error::SmtpError`] and
//! closes the connection without sending QUIT.
//!
//! ## Logging
//!
//! Session steps are logged with [`tracing`] under an `smtp` span. Raw
//! traffic, credentials included, is logged at `trace` level under the
//! [`TRAFFIC_TARGET`] target.
//!
//! ## Modules
//!
//! - [`command`]: SMTP command encoder
//! - [`connection`]: Configuration, streams and the session driver
//! - [`parser`]: Reply decoder
//! - [`session`]: Delivery state machine
//! - [`types`]: Replies, envelopes and extensions

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
mod error;
pub mod parser;
pub mod session;
pub mod types;

pub use connection::{
    Client, Config, ConfigBuilder, HelloMethod, Security, SignInMethod, TRAFFIC_TARGET, Transport,
    connect, deliver,
};
pub use error::{Error, ErrorKind, Result};
pub use types::{Envelope, Reply, ReplyCode};
