//! Connection configuration types.

use std::time::Duration;

/// Default connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection security mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Security {
    /// Plaintext for the whole session. **Not recommended for production.**
    None,
    /// TLS from the start (port 465).
    Implicit,
    /// Plaintext connect, then STARTTLS; fails if the upgrade is unavailable.
    #[default]
    StartTls,
    /// Plaintext connect, STARTTLS if the server allows it, plaintext otherwise.
    OpportunisticStartTls,
}

impl Security {
    /// Returns the default port for this security mode.
    #[must_use]
    pub const fn default_port(self) -> u16 {
        match self {
            Self::None | Self::StartTls | Self::OpportunisticStartTls => 587,
            Self::Implicit => 465,
        }
    }

    /// Returns true if the session should try STARTTLS after greeting.
    #[must_use]
    pub const fn is_starttls_enabled(self) -> bool {
        matches!(self, Self::StartTls | Self::OpportunisticStartTls)
    }

    /// Returns true if a missing or refused STARTTLS must fail the session.
    #[must_use]
    pub const fn is_starttls_required(self) -> bool {
        matches!(self, Self::StartTls)
    }
}

/// Greeting command sent at the start of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HelloMethod {
    /// HELO (RFC 821).
    Helo,
    /// EHLO, which also asks for the extension list.
    #[default]
    Ehlo,
}

impl HelloMethod {
    /// Returns the command verb.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Helo => "HELO",
            Self::Ehlo => "EHLO",
        }
    }
}

/// How the client signs in before the mail transaction.
#[derive(Clone, PartialEq, Eq, Default)]
pub enum SignInMethod {
    /// No authentication.
    #[default]
    Anonymous,
    /// AUTH LOGIN with a username and password.
    Credentials {
        /// Username.
        username: String,
        /// Password.
        password: String,
    },
}

impl SignInMethod {
    /// Creates a credentials sign-in.
    #[must_use]
    pub fn credentials(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Credentials {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Returns true if the session has to authenticate.
    #[must_use]
    pub const fn requires_auth(&self) -> bool {
        matches!(self, Self::Credentials { .. })
    }
}

impl std::fmt::Debug for SignInMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Anonymous => f.write_str("Anonymous"),
            Self::Credentials { username, .. } => f
                .debug_struct("Credentials")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
        }
    }
}

/// SMTP connection configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server hostname.
    pub hostname: String,
    /// Server port.
    pub port: u16,
    /// Security mode.
    pub security: Security,
    /// Connection timeout (TCP connect plus implicit TLS handshake).
    pub connect_timeout: Duration,
    /// Greeting command.
    pub hello_method: HelloMethod,
    /// Domain sent with HELO/EHLO.
    pub hello_name: String,
    /// Authentication.
    pub sign_in: SignInMethod,
}

impl Config {
    /// Creates a new configuration with mandatory STARTTLS on port 587.
    #[must_use]
    pub fn new(hostname: impl Into<String>) -> Self {
        Self::builder(hostname).build()
    }

    /// Creates a configuration builder.
    #[must_use]
    pub fn builder(hostname: impl Into<String>) -> ConfigBuilder {
        ConfigBuilder::new(hostname)
    }
}

/// Builder for connection configuration.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    hostname: String,
    port: Option<u16>,
    security: Security,
    connect_timeout: Duration,
    hello_method: HelloMethod,
    hello_name: Option<String>,
    sign_in: SignInMethod,
}

impl ConfigBuilder {
    /// Creates a new builder with the given hostname.
    #[must_use]
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            port: None,
            security: Security::default(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            hello_method: HelloMethod::default(),
            hello_name: None,
            sign_in: SignInMethod::Anonymous,
        }
    }

    /// Sets the port.
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Sets the security mode.
    #[must_use]
    pub const fn security(mut self, security: Security) -> Self {
        self.security = security;
        self
    }

    /// Sets the connection timeout.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the greeting command.
    #[must_use]
    pub const fn hello_method(mut self, method: HelloMethod) -> Self {
        self.hello_method = method;
        self
    }

    /// Sets the domain sent with HELO/EHLO. Defaults to the server hostname.
    #[must_use]
    pub fn hello_name(mut self, name: impl Into<String>) -> Self {
        self.hello_name = Some(name.into());
        self
    }

    /// Sets the sign-in method.
    #[must_use]
    pub fn sign_in(mut self, sign_in: SignInMethod) -> Self {
        self.sign_in = sign_in;
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> Config {
        Config {
            port: self.port.unwrap_or_else(|| self.security.default_port()),
            hello_name: self.hello_name.unwrap_or_else(|| self.hostname.clone()),
            hostname: self.hostname,
            security: self.security,
            connect_timeout: self.connect_timeout,
            hello_method: self.hello_method,
            sign_in: self.sign_in,
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ports() {
        assert_eq!(Security::None.default_port(), 587);
        assert_eq!(Security::StartTls.default_port(), 587);
        assert_eq!(Security::OpportunisticStartTls.default_port(), 587);
        assert_eq!(Security::Implicit.default_port(), 465);
    }

    #[test]
    fn test_starttls_flags() {
        assert!(!Security::None.is_starttls_enabled());
        assert!(!Security::Implicit.is_starttls_enabled());
        assert!(Security::StartTls.is_starttls_enabled());
        assert!(Security::OpportunisticStartTls.is_starttls_enabled());
        assert!(Security::StartTls.is_starttls_required());
        assert!(!Security::OpportunisticStartTls.is_starttls_required());
    }

    #[test]
    fn test_hello_method() {
        assert_eq!(HelloMethod::Helo.as_str(), "HELO");
        assert_eq!(HelloMethod::Ehlo.as_str(), "EHLO");
    }

    #[test]
    fn test_config_new() {
        let config = Config::new("smtp.example.com");
        assert_eq!(config.hostname, "smtp.example.com");
        assert_eq!(config.port, 587);
        assert_eq!(config.security, Security::StartTls);
        assert_eq!(config.connect_timeout, DEFAULT_CONNECT_TIMEOUT);
        assert_eq!(config.hello_method, HelloMethod::Ehlo);
        assert_eq!(config.hello_name, "smtp.example.com");
        assert_eq!(config.sign_in, SignInMethod::Anonymous);
    }

    #[test]
    fn test_config_builder() {
        let config = Config::builder("smtp.example.com")
            .security(Security::Implicit)
            .connect_timeout(Duration::from_secs(3))
            .hello_method(HelloMethod::Helo)
            .hello_name("client.example.org")
            .sign_in(SignInMethod::credentials("user", "secret"))
            .build();

        assert_eq!(config.port, 465);
        assert_eq!(config.connect_timeout, Duration::from_secs(3));
        assert_eq!(config.hello_method, HelloMethod::Helo);
        assert_eq!(config.hello_name, "client.example.org");
        assert!(config.sign_in.requires_auth());
    }

    #[test]
    fn test_explicit_port_wins() {
        let config = Config::builder("smtp.example.com")
            .security(Security::Implicit)
            .port(2465)
            .build();
        assert_eq!(config.port, 2465);
    }

    #[test]
    fn test_credentials_redacted_in_debug() {
        let sign_in = SignInMethod::credentials("user", "hunter2");
        let debug = format!("{sign_in:?}");
        assert!(debug.contains("user"));
        assert!(!debug.contains("hunter2"));
    }
}
