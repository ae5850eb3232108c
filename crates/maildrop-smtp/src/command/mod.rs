//! SMTP command encoder.

use base64::Engine;

use crate::connection::HelloMethod;

/// SMTP command sent by the client.
#[derive(Clone, PartialEq, Eq)]
pub enum Command {
    /// HELO/EHLO - Initial greeting
    Greet {
        /// Domain announced to the server
        hostname: String,
        /// HELO or EHLO
        method: HelloMethod,
    },
    /// STARTTLS - Upgrade to TLS
    StartTls,
    /// HELO/EHLO - Greeting repeated over the TLS session
    GreetAfterTls {
        /// Domain announced to the server
        hostname: String,
        /// HELO or EHLO
        method: HelloMethod,
    },
    /// MAIL FROM - Start mail transaction
    MailFrom(String),
    /// RCPT TO - Add recipient
    RcptTo(String),
    /// DATA - Begin message data
    Data,
    /// Message payload followed by the end-of-data line
    Payload(String),
    /// QUIT - Close connection
    Quit,
    /// AUTH LOGIN - Begin authentication
    AuthLogin,
    /// Base64 username in answer to the first AUTH LOGIN prompt
    AuthUser(String),
    /// Base64 password in answer to the second AUTH LOGIN prompt
    AuthPassword(String),
}

impl Command {
    /// Serializes the command to bytes.
    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();

        match self {
            Self::Greet { hostname, method } | Self::GreetAfterTls { hostname, method } => {
                buf.extend_from_slice(method.as_str().as_bytes());
                buf.push(b' ');
                buf.extend_from_slice(hostname.as_bytes());
            }
            Self::StartTls => {
                buf.extend_from_slice(b"STARTTLS");
            }
            Self::MailFrom(from) => {
                buf.extend_from_slice(b"MAIL FROM:<");
                buf.extend_from_slice(from.as_bytes());
                buf.push(b'>');
            }
            Self::RcptTo(to) => {
                buf.extend_from_slice(b"RCPT TO:<");
                buf.extend_from_slice(to.as_bytes());
                buf.push(b'>');
            }
            Self::Data => {
                buf.extend_from_slice(b"DATA");
            }
            Self::Payload(message) => {
                // Sent verbatim: lines starting with '.' are not stuffed.
                buf.extend_from_slice(message.as_bytes());
                if !message.ends_with("\r\n") {
                    buf.extend_from_slice(b"\r\n");
                }
                buf.push(b'.');
            }
            Self::Quit => {
                buf.extend_from_slice(b"QUIT");
            }
            Self::AuthLogin => {
                buf.extend_from_slice(b"AUTH LOGIN");
            }
            Self::AuthUser(value) | Self::AuthPassword(value) => {
                buf.extend_from_slice(encode_base64(value).as_bytes());
            }
        }

        buf.extend_from_slice(b"\r\n");
        buf
    }

    /// Returns the command verb, for logging.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Greet { method, .. } | Self::GreetAfterTls { method, .. } => method.as_str(),
            Self::StartTls => "STARTTLS",
            Self::MailFrom(_) => "MAIL FROM",
            Self::RcptTo(_) => "RCPT TO",
            Self::Data => "DATA",
            Self::Payload(_) => "<payload>",
            Self::Quit => "QUIT",
            Self::AuthLogin => "AUTH LOGIN",
            Self::AuthUser(_) => "<username>",
            Self::AuthPassword(_) => "<password>",
        }
    }
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Greet { hostname, method } => f
                .debug_struct("Greet")
                .field("hostname", hostname)
                .field("method", method)
                .finish(),
            Self::GreetAfterTls { hostname, method } => f
                .debug_struct("GreetAfterTls")
                .field("hostname", hostname)
                .field("method", method)
                .finish(),
            Self::MailFrom(from) => f.debug_tuple("MailFrom").field(from).finish(),
            Self::RcptTo(to) => f.debug_tuple("RcptTo").field(to).finish(),
            Self::Payload(message) => f.debug_tuple("Payload").field(&message.len()).finish(),
            Self::AuthUser(_) => f.write_str("AuthUser(<redacted>)"),
            Self::AuthPassword(_) => f.write_str("AuthPassword(<redacted>)"),
            Self::StartTls | Self::Data | Self::Quit | Self::AuthLogin => f.write_str(self.name()),
        }
    }
}

/// Standard-alphabet, padded base64 of the UTF-8 bytes of `value`.
#[must_use]
pub fn encode_base64(value: &str) -> String {
    base64::engine::general_purpose::STANDARD.encode(value.as_bytes())
}
