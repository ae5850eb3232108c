//! Message envelope.

use crate::error::{Error, Result};

/// Sender, recipients, and raw message for a single delivery.
///
/// The message is sent verbatim after `DATA`; it should be CRLF-delimited
/// and must not contain the terminating `<CRLF>.<CRLF>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    from: String,
    recipients: Vec<String>,
    data: String,
}

impl Envelope {
    /// Creates a new envelope.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRecipient`] if no recipient contains a
    /// non-whitespace character, and [`Error::InvalidMessage`] if `data` is
    /// empty.
    pub fn new<I, S>(from: impl Into<String>, recipients: I, data: impl Into<String>) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let recipients: Vec<String> = recipients.into_iter().map(Into::into).collect();
        if !recipients.iter().any(|r| !r.trim().is_empty()) {
            return Err(Error::InvalidRecipient);
        }

        let data = data.into();
        if data.is_empty() {
            return Err(Error::InvalidMessage);
        }

        Ok(Self {
            from: from.into(),
            recipients,
            data,
        })
    }

    /// Returns the envelope sender (`MAIL FROM`).
    #[must_use]
    pub fn from(&self) -> &str {
        &self.from
    }

    /// Returns the recipients (`RCPT TO`), in send order.
    #[must_use]
    pub fn recipients(&self) -> &[String] {
        &self.recipients
    }

    /// Returns the raw message payload.
    #[must_use]
    pub fn data(&self) -> &str {
        &self.data
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;

    #[test]
    fn rejects_missing_recipients() {
        let empty: [&str; 0] = [];
        assert!(matches!(
            Envelope::new("a", empty, "x"),
            Err(Error::InvalidRecipient)
        ));
        assert!(matches!(
            Envelope::new("a", [""], "x"),
            Err(Error::InvalidRecipient)
        ));
    }

    #[test]
    fn rejects_whitespace_recipients() {
        assert!(matches!(
            Envelope::new("a", ["   "], "x"),
            Err(Error::InvalidRecipient)
        ));
        assert!(matches!(
            Envelope::new("a", ["\t", " \r\n"], "x"),
            Err(Error::InvalidRecipient)
        ));
    }

    #[test]
    fn rejects_empty_message() {
        assert!(matches!(
            Envelope::new("a", ["b"], ""),
            Err(Error::InvalidMessage)
        ));
    }

    #[test]
    fn recipient_checked_before_message() {
        assert!(matches!(
            Envelope::new("a", [""], ""),
            Err(Error::InvalidRecipient)
        ));
    }

    #[test]
    fn accepts_valid_envelope() {
        let envelope = Envelope::new("a", ["b"], "x").unwrap();
        assert_eq!(envelope.from(), "a");
        assert_eq!(envelope.recipients(), ["b".to_string()]);
        assert_eq!(envelope.data(), "x");
    }

    #[test]
    fn keeps_recipient_order() {
        let envelope = Envelope::new(
            "sender@example.com",
            vec!["one@example.com".to_string(), "two@example.com".to_string()],
            "Subject: hi\r\n\r\nbody",
        )
        .unwrap();
        assert_eq!(
            envelope.recipients(),
            ["one@example.com".to_string(), "two@example.com".to_string()]
        );
    }
}
