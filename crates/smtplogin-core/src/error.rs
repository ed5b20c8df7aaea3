//! Error types for the core library.

use smtplogin_smtp::SaslError;
use thiserror::Error;

/// Why an authentication attempt failed.
///
/// The `Display` text is the detail handed back to callers.
#[derive(Debug, Error)]
pub enum Error {
    /// TCP connect failed: timeout, refused, or name resolution.
    #[error("connection failed: {0}")]
    Connect(#[source] smtplogin_smtp::Error),

    /// Implicit TLS or STARTTLS negotiation failed.
    #[error("TLS negotiation failed: {0}")]
    Tls(#[source] smtplogin_smtp::Error),

    /// The server rejected the greeting.
    #[error("greeting rejected: {0}")]
    Handshake(#[source] smtplogin_smtp::Error),

    /// LOGIN refused to send credentials over an unencrypted connection.
    #[error("unencrypted connection")]
    InsecureAuth,

    /// LOGIN refused because the session is for another host.
    #[error("wrong host name")]
    HostMismatch,

    /// The server sent a prompt the mechanism does not recognise.
    #[error("unexpected server challenge: {}", String::from_utf8_lossy(.0))]
    UnexpectedChallenge(Vec<u8>),

    /// The server rejected the credentials or the exchange.
    #[error("authentication failed: {0}")]
    Auth(#[source] smtplogin_smtp::Error),
}

impl Error {
    /// Classifies a failure to open the session.
    pub(crate) fn connect(err: smtplogin_smtp::Error) -> Self {
        if err.is_tls() {
            Self::Tls(err)
        } else if matches!(err, smtplogin_smtp::Error::SmtpError { .. }) {
            Self::Handshake(err)
        } else {
            Self::Connect(err)
        }
    }

    /// Classifies a failure during the AUTH exchange.
    pub(crate) fn auth(err: smtplogin_smtp::Error) -> Self {
        match err {
            smtplogin_smtp::Error::Sasl(SaslError::InsecureConnection) => Self::InsecureAuth,
            smtplogin_smtp::Error::Sasl(SaslError::HostMismatch) => Self::HostMismatch,
            smtplogin_smtp::Error::Sasl(SaslError::UnexpectedChallenge(raw)) => {
                Self::UnexpectedChallenge(raw)
            }
            other => Self::Auth(other),
        }
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
