//! Opening sessions.

use smtplogin_smtp::connection::{connect, connect_tls};
use smtplogin_smtp::{Client, Session};

use crate::config::DialerConfig;

/// Opens a session to the configured server.
///
/// The dialer receives its connector at construction, so tests can hand it
/// a scripted session instead of a socket.
#[allow(async_fn_in_trait)]
pub trait Connector {
    /// Session type produced by this connector.
    type Session: Session;

    /// Connects, applies implicit TLS when `config.ssl` is set, and reads
    /// the server greeting.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection, TLS handshake or greeting fails.
    async fn connect(&self, config: &DialerConfig) -> smtplogin_smtp::Result<Self::Session>;
}

/// Connector for real SMTP servers over TCP.
#[derive(Debug, Clone, Copy, Default)]
pub struct SmtpConnector;

impl Connector for SmtpConnector {
    type Session = Client;

    async fn connect(&self, config: &DialerConfig) -> smtplogin_smtp::Result<Client> {
        let stream = if config.ssl {
            let tls = config.tls_config();
            connect_tls(&config.host, config.port, config.connect_timeout, &tls).await?
        } else {
            connect(&config.host, config.port, config.connect_timeout).await?
        };
        Client::from_stream(stream, config.host.clone()).await
    }
}
