//! Error types for SMTP operations.

use std::io;

/// Result type alias for SMTP operations.
pub type Result<T> = std::result::Result<T, Error>;

/// SMTP error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// TLS error.
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// TLS handshake with the server failed.
    #[error("TLS handshake failed: {0}")]
    TlsHandshake(#[source] io::Error),

    /// The name used for certificate validation is not a valid DNS name or IP address.
    #[error("Invalid server name: {0}")]
    InvalidServerName(String),

    /// TCP connect did not complete in time.
    #[error("Connection to {0} timed out")]
    Timeout(String),

    /// Server returned error response.
    #[error("SMTP error {code}: {message}")]
    SmtpError {
        /// Reply code (e.g., 535).
        code: u16,
        /// Error message from server.
        message: String,
    },

    /// Protocol error (unexpected response).
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// An authentication mechanism refused to continue.
    #[error(transparent)]
    Sasl(#[from] SaslError),

    /// Invalid state for operation.
    #[error("Invalid state for operation: {0}")]
    InvalidState(String),
}

impl Error {
    /// Creates an SMTP error from a reply code and message.
    #[must_use]
    pub fn smtp_error(code: u16, message: impl Into<String>) -> Self {
        Self::SmtpError {
            code,
            message: message.into(),
        }
    }

    /// Returns true if the failure happened while setting up TLS.
    #[must_use]
    pub const fn is_tls(&self) -> bool {
        matches!(
            self,
            Self::Tls(_) | Self::TlsHandshake(_) | Self::InvalidServerName(_)
        )
    }

    /// Returns true if this is a permanent error (5xx).
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        matches!(self, Self::SmtpError { code, .. } if *code >= 500 && *code < 600)
    }
}

/// Errors raised by a SASL mechanism engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SaslError {
    /// Credentials would be sent over a plaintext connection.
    #[error("unencrypted connection")]
    InsecureConnection,

    /// The session was established for a different host than the credentials.
    #[error("wrong host name")]
    HostMismatch,

    /// The server sent a prompt the mechanism does not understand.
    #[error("unexpected server challenge: {}", String::from_utf8_lossy(.0))]
    UnexpectedChallenge(Vec<u8>),

    /// The server challenge was not valid base64.
    #[error("malformed server challenge: {0}")]
    MalformedChallenge(String),

    /// The secret could not be used as a MAC key.
    #[error("invalid key: {0}")]
    InvalidKey(String),
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn permanent_replies() {
        assert!(Error::smtp_error(535, "bad credentials").is_permanent());
        assert!(!Error::smtp_error(454, "try later").is_permanent());
        assert!(!Error::Protocol("x".into()).is_permanent());
    }

    #[test]
    fn tls_classification() {
        assert!(Error::InvalidServerName("bad name".into()).is_tls());
        assert!(Error::TlsHandshake(io::Error::other("alert")).is_tls());
        assert!(!Error::Timeout("smtp.example.com:25".into()).is_tls());
    }

    #[test]
    fn sasl_messages() {
        assert_eq!(
            SaslError::InsecureConnection.to_string(),
            "unencrypted connection"
        );
        assert_eq!(SaslError::HostMismatch.to_string(), "wrong host name");
        assert_eq!(
            SaslError::UnexpectedChallenge(b"Token:".to_vec()).to_string(),
            "unexpected server challenge: Token:"
        );
    }

    #[test]
    fn sasl_is_transparent() {
        let err = Error::from(SaslError::HostMismatch);
        assert_eq!(err.to_string(), "wrong host name");
    }
}
