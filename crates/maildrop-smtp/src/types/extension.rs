//! Service extensions advertised in an EHLO reply.

use super::Reply;

/// SMTP extension keyword from an EHLO reply line.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Extension {
    /// STARTTLS - TLS upgrade
    StartTls,
    /// AUTH - Authentication, with the advertised mechanism names
    Auth(Vec<String>),
    /// SIZE - Maximum message size
    Size,
    /// 8BITMIME - 8-bit MIME transport
    EightBitMime,
    /// PIPELINING - Command pipelining
    Pipelining,
    /// SMTPUTF8 - UTF-8 email addresses
    SmtpUtf8,
    /// Anything else, kept verbatim
    Unknown(String),
}

impl Extension {
    /// Parses an extension line from EHLO response.
    #[must_use]
    pub fn parse(line: &str) -> Self {
        let mut parts = line.split_whitespace();
        let Some(keyword) = parts.next() else {
            return Self::Unknown(line.to_string());
        };

        match keyword.to_uppercase().as_str() {
            "STARTTLS" => Self::StartTls,
            "AUTH" => Self::Auth(parts.map(str::to_uppercase).collect()),
            "SIZE" => Self::Size,
            "8BITMIME" => Self::EightBitMime,
            "PIPELINING" => Self::Pipelining,
            "SMTPUTF8" => Self::SmtpUtf8,
            _ => Self::Unknown(line.to_string()),
        }
    }
}

/// Capabilities learned from the most recent greeting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// Advertised extensions, in reply order.
    pub extensions: Vec<Extension>,
}

impl Capabilities {
    /// Builds the capability list from an EHLO reply.
    ///
    /// The first line is the server's greeting text and is skipped.
    #[must_use]
    pub fn from_ehlo(reply: &Reply) -> Self {
        Self {
            extensions: reply
                .message
                .iter()
                .skip(1)
                .map(|line| Extension::parse(line))
                .collect(),
        }
    }

    /// Checks if STARTTLS was advertised.
    #[must_use]
    pub fn supports_starttls(&self) -> bool {
        self.extensions.contains(&Extension::StartTls)
    }
}
