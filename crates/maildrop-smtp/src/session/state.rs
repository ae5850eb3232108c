//! Session step types.

/// Position of a session in the delivery plan.
///
/// Every `Awaiting*` state has exactly one command outstanding (or, for
/// [`AwaitingBanner`](Self::AwaitingBanner), none yet) and advances on
/// exactly one reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Connected; waiting for the server's 220 banner.
    #[default]
    AwaitingBanner,
    /// HELO/EHLO sent.
    AwaitingGreeting,
    /// STARTTLS sent.
    AwaitingStartTls,
    /// STARTTLS accepted; the TLS handshake is in progress.
    Upgrading,
    /// HELO/EHLO repeated over TLS.
    AwaitingGreetingAfterTls,
    /// AUTH LOGIN sent; waiting for the username prompt.
    AwaitingAuthUserPrompt,
    /// Username sent; waiting for the password prompt.
    AwaitingAuthPasswordPrompt,
    /// Password sent.
    AwaitingAuthResult,
    /// MAIL FROM sent.
    AwaitingMailFrom,
    /// RCPT TO sent for the recipient at `index`.
    AwaitingRecipient {
        /// Index into the envelope's recipient list.
        index: usize,
    },
    /// DATA sent; waiting for 354.
    AwaitingDataReady,
    /// Payload sent; waiting for the message to be accepted.
    AwaitingPayloadAccepted,
    /// QUIT sent.
    AwaitingQuit,
    /// Delivered and closed down.
    Done,
    /// A step failed; nothing more will be sent.
    Failed,
}

impl SessionState {
    /// Returns true once no more events will be accepted.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Returns a short name for logs and error messages.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::AwaitingBanner => "banner",
            Self::AwaitingGreeting => "greeting",
            Self::AwaitingStartTls => "STARTTLS",
            Self::Upgrading => "TLS handshake",
            Self::AwaitingGreetingAfterTls => "greeting after TLS",
            Self::AwaitingAuthUserPrompt => "AUTH LOGIN",
            Self::AwaitingAuthPasswordPrompt => "AUTH username",
            Self::AwaitingAuthResult => "AUTH password",
            Self::AwaitingMailFrom => "MAIL FROM",
            Self::AwaitingRecipient { .. } => "RCPT TO",
            Self::AwaitingDataReady => "DATA",
            Self::AwaitingPayloadAccepted => "message data",
            Self::AwaitingQuit => "QUIT",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}
