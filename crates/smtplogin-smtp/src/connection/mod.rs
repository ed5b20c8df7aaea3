//! SMTP connection management.

mod client;
mod stream;
mod tls;

pub use client::{Client, DEFAULT_LOCAL_NAME};
pub use stream::{SmtpStream, connect, connect_tls};
pub use tls::TlsConfig;

use crate::error::Result;
use crate::sasl::Mechanism;

/// What a mechanism may know about the server before authenticating.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerInfo {
    /// Server name the session was established for.
    pub name: String,
    /// Whether the connection is encrypted (implicit TLS or STARTTLS).
    pub tls: bool,
    /// AUTH mechanisms advertised by the server, verbatim.
    pub auth: Vec<String>,
}

impl ServerInfo {
    /// Returns true if `mechanism` appears literally in the advertised list.
    #[must_use]
    pub fn advertises(&self, mechanism: &str) -> bool {
        self.auth.iter().any(|m| m == mechanism)
    }
}

/// The operations needed to negotiate and authenticate an SMTP connection.
///
/// [`Client`] implements this over a real stream; tests substitute a fake.
#[allow(async_fn_in_trait)]
pub trait Session {
    /// Greets the server with `local_name` and records its extensions.
    async fn hello(&mut self, local_name: &str) -> Result<()>;

    /// Looks up an announced extension (case-insensitive), returning its parameters.
    async fn extension(&mut self, name: &str) -> Result<Option<String>>;

    /// Upgrades the connection in place with STARTTLS.
    async fn starttls(&mut self, tls: &TlsConfig) -> Result<()>;

    /// Runs a SASL exchange with `mechanism`.
    async fn auth(&mut self, mechanism: &mut dyn Mechanism) -> Result<()>;

    /// Says goodbye and releases the transport. Never fails.
    async fn close(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advertises_is_literal() {
        let info = ServerInfo {
            name: "smtp.example.com".into(),
            tls: false,
            auth: vec!["login".into(), "PLAIN".into()],
        };
        assert!(info.advertises("PLAIN"));
        assert!(!info.advertises("LOGIN"));
    }
}
