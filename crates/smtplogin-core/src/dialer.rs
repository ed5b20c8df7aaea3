//! Dial, negotiate and authenticate in one call.

use smtplogin_smtp::Session;

use crate::config::DialerConfig;
use crate::connector::{Connector, SmtpConnector};
use crate::error::{Error, Result};
use crate::outcome::AuthOutcome;
use crate::selector::{build_mechanism, select_mechanism};

/// Runs one connect-negotiate-authenticate cycle per call.
///
/// Each call opens its own session and closes it before returning, so a
/// `Dialer` can be reused and shared freely.
#[derive(Debug, Clone)]
pub struct Dialer<C = SmtpConnector> {
    config: DialerConfig,
    connector: C,
}

impl Dialer {
    /// Creates a dialer that connects to real servers.
    #[must_use]
    pub const fn new(config: DialerConfig) -> Self {
        Self::with_connector(config, SmtpConnector)
    }
}

impl<C: Connector> Dialer<C> {
    /// Creates a dialer that opens sessions through `connector`.
    #[must_use]
    pub const fn with_connector(config: DialerConfig, connector: C) -> Self {
        Self { config, connector }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &DialerConfig {
        &self.config
    }

    /// Connects, upgrades with STARTTLS when offered, and authenticates.
    ///
    /// The session is closed exactly once whatever the outcome.
    ///
    /// # Errors
    ///
    /// Returns the first failure, classified by the step that failed.
    pub async fn dial_and_auth(&self) -> Result<()> {
        let config = &self.config;
        tracing::debug!(host = %config.host, port = config.port, ssl = config.ssl, "Dialing");

        let mut session = self
            .connector
            .connect(config)
            .await
            .map_err(Error::connect)?;

        let result = self.negotiate(&mut session).await;
        session.close().await;

        match &result {
            Ok(()) => tracing::info!(host = %config.host, user = %config.username, "Authentication succeeded"),
            Err(e) => tracing::warn!(host = %config.host, user = %config.username, error = %e, "Authentication failed"),
        }
        result
    }

    /// Runs [`dial_and_auth`](Self::dial_and_auth) and reports the outcome.
    pub async fn authenticate(&self) -> AuthOutcome {
        self.dial_and_auth().await.into()
    }

    async fn negotiate<S: Session>(&self, session: &mut S) -> Result<()> {
        let config = &self.config;

        if let Some(local_name) = &config.local_name {
            session.hello(local_name).await.map_err(Error::Handshake)?;
        }

        if !config.ssl
            && session
                .extension("STARTTLS")
                .await
                .map_err(Error::Handshake)?
                .is_some()
        {
            session
                .starttls(&config.tls_config())
                .await
                .map_err(Error::Tls)?;
        }

        let mechanism = match config.mechanism {
            Some(mechanism) => Some(mechanism),
            None if !config.username.is_empty() => {
                let auth = session.extension("AUTH").await.map_err(Error::Handshake)?;
                let selected = select_mechanism(auth.as_deref());
                if selected.is_none() {
                    // Credentials were supplied but the server asks for none
                    tracing::debug!(host = %config.host, "No AUTH mechanism advertised, skipping authentication");
                }
                selected
            }
            None => None,
        };

        let Some(mechanism) = mechanism else {
            return Ok(());
        };
        tracing::debug!(%mechanism, "Selected mechanism");

        let mut engine = build_mechanism(mechanism, config);
        session.auth(engine.as_mut()).await.map_err(Error::auth)
    }
}
