//! Dialer configuration.

use std::time::Duration;

use smtplogin_smtp::{AuthMechanism, TlsConfig};

/// Port for SMTP over implicit TLS (RFC 8314).
pub const SUBMISSIONS_PORT: u16 = 465;

/// Plain SMTP relay port.
pub const SMTP_PORT: u16 = 25;

/// Default TCP connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Settings for one dial-and-authenticate attempt.
#[derive(Clone)]
pub struct DialerConfig {
    /// Server hostname. Also the identity LOGIN insists on.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Username; empty means "connect only".
    pub username: String,
    /// Password.
    pub password: String,
    /// Mechanism to use regardless of what the server advertises.
    pub mechanism: Option<AuthMechanism>,
    /// Negotiate TLS before any SMTP traffic.
    pub ssl: bool,
    /// TLS settings for implicit TLS and STARTTLS.
    pub tls: Option<TlsConfig>,
    /// Identity sent with EHLO/HELO.
    pub local_name: Option<String>,
    /// Bound on the TCP connect.
    pub connect_timeout: Duration,
}

impl DialerConfig {
    /// Creates a configuration with defaults: implicit TLS only on port 465.
    #[must_use]
    pub fn new(
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self::builder(host)
            .port(port)
            .credentials(username, password)
            .build()
    }

    /// Creates a configuration builder.
    #[must_use]
    pub fn builder(host: impl Into<String>) -> DialerConfigBuilder {
        DialerConfigBuilder::new(host)
    }

    /// TLS settings to use, validating against `host` unless overridden.
    #[must_use]
    pub fn tls_config(&self) -> TlsConfig {
        self.tls
            .clone()
            .unwrap_or_else(|| TlsConfig::new(self.host.clone()))
    }
}

impl std::fmt::Debug for DialerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DialerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("mechanism", &self.mechanism)
            .field("ssl", &self.ssl)
            .field("tls", &self.tls)
            .field("local_name", &self.local_name)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

/// Builder for [`DialerConfig`].
#[derive(Clone)]
pub struct DialerConfigBuilder {
    host: String,
    port: Option<u16>,
    username: String,
    password: String,
    mechanism: Option<AuthMechanism>,
    ssl: Option<bool>,
    tls: Option<TlsConfig>,
    local_name: Option<String>,
    connect_timeout: Duration,
}

impl DialerConfigBuilder {
    /// Creates a new builder with the given hostname.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: None,
            username: String::new(),
            password: String::new(),
            mechanism: None,
            ssl: None,
            tls: None,
            local_name: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Sets the port.
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Sets the username and password.
    #[must_use]
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// Pins the mechanism instead of choosing from the server's list.
    #[must_use]
    pub const fn mechanism(mut self, mechanism: AuthMechanism) -> Self {
        self.mechanism = Some(mechanism);
        self
    }

    /// Enables or disables implicit TLS.
    #[must_use]
    pub const fn ssl(mut self, ssl: bool) -> Self {
        self.ssl = Some(ssl);
        self
    }

    /// Sets the TLS configuration.
    #[must_use]
    pub fn tls(mut self, tls: TlsConfig) -> Self {
        self.tls = Some(tls);
        self
    }

    /// Sets the identity sent with EHLO.
    #[must_use]
    pub fn local_name(mut self, name: impl Into<String>) -> Self {
        self.local_name = Some(name.into());
        self
    }

    /// Sets the connection timeout.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Builds the configuration.
    ///
    /// Without an explicit port, implicit TLS picks 465 and plaintext 25.
    /// Without an explicit `ssl`, it follows the port.
    #[must_use]
    pub fn build(self) -> DialerConfig {
        let port = self.port.unwrap_or(match self.ssl {
            Some(true) => SUBMISSIONS_PORT,
            _ => SMTP_PORT,
        });
        DialerConfig {
            host: self.host,
            port,
            username: self.username,
            password: self.password,
            mechanism: self.mechanism,
            ssl: self.ssl.unwrap_or(port == SUBMISSIONS_PORT),
            tls: self.tls,
            local_name: self.local_name,
            connect_timeout: self.connect_timeout,
        }
    }
}

impl std::fmt::Debug for DialerConfigBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DialerConfigBuilder")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}
