//! Settings file model.

use std::time::Duration;

use maildrop_smtp::{Config, HelloMethod, Security, SignInMethod};
use serde::{Deserialize, Serialize};

/// Security mode as written in the settings file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SecurityMode {
    /// No encryption (not recommended).
    None,
    /// Implicit TLS (connect directly with TLS).
    Tls,
    /// STARTTLS upgrade after plaintext connect; required.
    #[default]
    Starttls,
    /// STARTTLS when the server offers it.
    StarttlsIfAvailable,
}

impl From<SecurityMode> for Security {
    fn from(mode: SecurityMode) -> Self {
        match mode {
            SecurityMode::None => Self::None,
            SecurityMode::Tls => Self::Implicit,
            SecurityMode::Starttls => Self::StartTls,
            SecurityMode::StarttlsIfAvailable => Self::OpportunisticStartTls,
        }
    }
}

/// Greeting command as written in the settings file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Hello {
    /// Plain SMTP greeting.
    Helo,
    /// Extended SMTP greeting.
    #[default]
    Ehlo,
}

/// Contents of the JSON settings file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Server hostname.
    pub host: String,
    /// Server port (default: 465 for TLS, 587 otherwise).
    #[serde(default)]
    pub port: Option<u16>,
    /// Security mode.
    #[serde(default)]
    pub security: SecurityMode,
    /// Greeting command.
    #[serde(default)]
    pub hello: Hello,
    /// Domain sent with the greeting (default: the server hostname).
    #[serde(default)]
    pub hello_name: Option<String>,
    /// Username for AUTH LOGIN; the password comes from the environment.
    #[serde(default)]
    pub username: Option<String>,
    /// Envelope sender.
    pub from: String,
    /// Envelope recipients.
    pub to: Vec<String>,
    /// Connect timeout in seconds.
    #[serde(default)]
    pub connect_timeout_secs: Option<u64>,
}

impl Settings {
    /// Builds the client configuration.
    ///
    /// Authentication is enabled only when both a username and a password
    /// are present.
    #[must_use]
    pub fn to_config(&self, password: Option<String>) -> Config {
        let mut builder = Config::builder(&self.host)
            .security(self.security.into())
            .hello_method(match self.hello {
                Hello::Helo => HelloMethod::Helo,
                Hello::Ehlo => HelloMethod::Ehlo,
            });

        if let Some(port) = self.port {
            builder = builder.port(port);
        }
        if let Some(name) = &self.hello_name {
            builder = builder.hello_name(name);
        }
        if let Some(secs) = self.connect_timeout_secs {
            builder = builder.connect_timeout(Duration::from_secs(secs));
        }
        if let (Some(username), Some(password)) = (&self.username, password) {
            builder = builder.sign_in(SignInMethod::credentials(username, password));
        }

        builder.build()
    }
}
