//! TLS settings shared by implicit TLS and STARTTLS.

use crate::error::{Error, Result};
use rustls::pki_types::{CertificateDer, ServerName};
use std::sync::Arc;
use tokio_rustls::{
    TlsConnector,
    rustls::{ClientConfig, RootCertStore},
};

/// TLS configuration for a connection.
///
/// The same value is used whether TLS starts immediately (port 465) or via
/// STARTTLS, so both paths validate the server the same way.
#[derive(Debug, Clone, Default)]
pub struct TlsConfig {
    /// Name used for SNI and certificate validation. Falls back to the host
    /// being dialed when unset.
    pub server_name: Option<String>,
    /// Skip certificate validation entirely. Only for lab servers with
    /// self-signed certificates.
    pub accept_invalid_certs: bool,
    /// Trust anchors added on top of the webpki roots.
    pub extra_roots: Vec<CertificateDer<'static>>,
}

impl TlsConfig {
    /// Creates a configuration that validates against `server_name`.
    #[must_use]
    pub fn new(server_name: impl Into<String>) -> Self {
        Self {
            server_name: Some(server_name.into()),
            ..Self::default()
        }
    }

    /// Disables certificate validation.
    #[must_use]
    pub const fn accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    /// Adds a trust anchor.
    #[must_use]
    pub fn add_root(mut self, cert: CertificateDer<'static>) -> Self {
        self.extra_roots.push(cert);
        self
    }

    /// Returns the name to validate, preferring the explicit override.
    #[must_use]
    pub fn effective_name<'a>(&'a self, default_name: &'a str) -> &'a str {
        self.server_name.as_deref().unwrap_or(default_name)
    }

    /// Resolves the rustls server name.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is neither a DNS name nor an IP address.
    pub fn server_name(&self, default_name: &str) -> Result<ServerName<'static>> {
        let name = self.effective_name(default_name);
        ServerName::try_from(name.to_string()).map_err(|_| Error::InvalidServerName(name.into()))
    }

    /// Creates a connector for this configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if an extra root certificate is rejected.
    pub fn connector(&self) -> Result<TlsConnector> {
        let config = if self.accept_invalid_certs {
            ClientConfig::builder()
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(NoCertVerifier))
                .with_no_client_auth()
        } else {
            let mut root_store = RootCertStore {
                roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
            };
            for cert in &self.extra_roots {
                root_store.add(cert.clone())?;
            }
            ClientConfig::builder()
                .with_root_certificates(root_store)
                .with_no_client_auth()
        };

        Ok(TlsConnector::from(Arc::new(config)))
    }
}

#[derive(Debug)]
struct NoCertVerifier;

impl rustls::client::danger::ServerCertVerifier for NoCertVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls::pki_types::UnixTime,
    ) -> std::result::Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        vec![
            rustls::SignatureScheme::RSA_PKCS1_SHA256,
            rustls::SignatureScheme::RSA_PKCS1_SHA384,
            rustls::SignatureScheme::RSA_PKCS1_SHA512,
            rustls::SignatureScheme::ECDSA_NISTP256_SHA256,
            rustls::SignatureScheme::ECDSA_NISTP384_SHA384,
            rustls::SignatureScheme::ED25519,
            rustls::SignatureScheme::RSA_PSS_SHA256,
            rustls::SignatureScheme::RSA_PSS_SHA384,
            rustls::SignatureScheme::RSA_PSS_SHA512,
        ]
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
    fn test_effective_name_defaults_to_host() {
        let config = TlsConfig::default();
        assert_eq!(config.effective_name("smtp.example.com"), "smtp.example.com");
    }

    #[test]
    fn test_explicit_name_wins() {
        let config = TlsConfig::new("mx.example.net");
        assert_eq!(config.effective_name("smtp.example.com"), "mx.example.net");
    }

    #[test]
    fn test_server_name_accepts_ip() {
        let config = TlsConfig::default();
        assert!(config.server_name("127.0.0.1").is_ok());
    }

    #[test]
    fn test_server_name_rejects_garbage() {
        let config = TlsConfig::default();
        let err = config.server_name("not a host").unwrap_err();
        assert!(matches!(err, Error::InvalidServerName(_)));
    }

    #[test]
    fn test_create_connectors() {
        assert!(TlsConfig::default().connector().is_ok());
        assert!(
            TlsConfig::default()
                .accept_invalid_certs(true)
                .connector()
                .is_ok()
        );
    }
}
