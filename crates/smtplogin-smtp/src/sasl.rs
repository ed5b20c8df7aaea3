//! SASL authentication mechanisms.
//!
//! A [`Mechanism`] is driven by [`Session::auth`](crate::Session::auth):
//! `start` names the mechanism and may supply an initial response, then
//! `next` answers each server challenge until the server reports the
//! outcome.
//!
//! Implements:
//! - PLAIN (RFC 4616)
//! - CRAM-MD5 (RFC 2195)
//!
//! PLAIN hands over the password itself, so it only runs over TLS or to a
//! loopback server, and only against the host it was created for.

use crate::connection::ServerInfo;
use crate::error::SaslError;
use crate::types::AuthMechanism;
use hmac::{Hmac, Mac};

/// Result of a mechanism step.
pub type SaslResult<T> = std::result::Result<T, SaslError>;

/// Client side of a SASL challenge/response exchange.
pub trait Mechanism: Send {
    /// Begins authentication.
    ///
    /// Returns the mechanism to announce and an optional initial response.
    ///
    /// # Errors
    ///
    /// Returns an error if the mechanism refuses to run against this server;
    /// nothing has been sent to the server at that point.
    fn start(&mut self, server: &ServerInfo) -> SaslResult<(AuthMechanism, Option<Vec<u8>>)>;

    /// Answers a decoded server challenge.
    ///
    /// `more` is false once the server has accepted the exchange; returning
    /// `None` ends the exchange.
    ///
    /// # Errors
    ///
    /// Returns an error if the challenge is not one this mechanism expects.
    fn next(&mut self, challenge: &[u8], more: bool) -> SaslResult<Option<Vec<u8>>>;
}

/// Server names that never leave the machine.
const LOOPBACK_NAMES: [&str; 3] = ["localhost", "127.0.0.1", "::1"];

/// PLAIN mechanism (RFC 4616), bound to one host.
#[derive(Clone)]
pub struct Plain {
    identity: String,
    username: String,
    password: String,
    host: String,
}

impl Plain {
    /// Creates a PLAIN mechanism.
    ///
    /// `identity` is the authorization identity; leave it empty to act as
    /// `username`. The mechanism refuses to run against any server but `host`.
    #[must_use]
    pub fn new(
        identity: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        host: impl Into<String>,
    ) -> Self {
        Self {
            identity: identity.into(),
            username: username.into(),
            password: password.into(),
            host: host.into(),
        }
    }
}

impl std::fmt::Debug for Plain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Plain")
            .field("identity", &self.identity)
            .field("username", &self.username)
            .field("host", &self.host)
            .finish_non_exhaustive()
    }
}

impl Mechanism for Plain {
    fn start(&mut self, server: &ServerInfo) -> SaslResult<(AuthMechanism, Option<Vec<u8>>)> {
        // An unencrypted server can claim anything, including that PLAIN is fine
        if !server.tls && !LOOPBACK_NAMES.contains(&server.name.as_str()) {
            return Err(SaslError::InsecureConnection);
        }
        if server.name != self.host {
            return Err(SaslError::HostMismatch);
        }
        Ok((
            AuthMechanism::Plain,
            Some(plain_response(&self.identity, &self.username, &self.password)),
        ))
    }

    fn next(&mut self, challenge: &[u8], more: bool) -> SaslResult<Option<Vec<u8>>> {
        if more {
            // Everything was sent up front
            return Err(SaslError::UnexpectedChallenge(challenge.to_vec()));
        }
        Ok(None)
    }
}

/// CRAM-MD5 mechanism (RFC 2195).
#[derive(Clone)]
pub struct CramMd5 {
    username: String,
    secret: String,
}

impl CramMd5 {
    /// Creates a CRAM-MD5 mechanism.
    #[must_use]
    pub fn new(username: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            secret: secret.into(),
        }
    }
}

impl std::fmt::Debug for CramMd5 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CramMd5")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl Mechanism for CramMd5 {
    fn start(&mut self, _server: &ServerInfo) -> SaslResult<(AuthMechanism, Option<Vec<u8>>)> {
        Ok((AuthMechanism::CramMd5, None))
    }

    fn next(&mut self, challenge: &[u8], more: bool) -> SaslResult<Option<Vec<u8>>> {
        if !more {
            return Ok(None);
        }
        let digest = cram_md5_digest(&self.secret, challenge)?;
        Ok(Some(format!("{} {digest}", self.username).into_bytes()))
    }
}

/// Builds the raw PLAIN message: `authzid \0 authcid \0 password`.
#[must_use]
pub fn plain_response(identity: &str, username: &str, password: &str) -> Vec<u8> {
    format!("{identity}\0{username}\0{password}").into_bytes()
}

/// Computes the CRAM-MD5 HMAC digest as a lowercase hex string.
///
/// # Errors
///
/// Returns [`SaslError::InvalidKey`] if the secret is rejected as a MAC key.
pub fn cram_md5_digest(secret: &str, challenge: &[u8]) -> SaslResult<String> {
    type HmacMd5 = Hmac<md5::Md5>;

    let mut mac = <HmacMd5 as Mac>::new_from_slice(secret.as_bytes())
        .map_err(|e| SaslError::InvalidKey(e.to_string()))?;
    mac.update(challenge);
    Ok(hex::encode(mac.finalize().into_bytes()))
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

    fn server(name: &str, tls: bool, auth: &[&str]) -> ServerInfo {
        ServerInfo {
            name: name.to_string(),
            tls,
            auth: auth.iter().map(|m| (*m).to_string()).collect(),
        }
    }

    #[test]
    fn test_plain_response_format() {
        assert_eq!(plain_response("", "test", "pass"), b"\0test\0pass");
        assert_eq!(
            plain_response("admin", "user", "pass@word!"),
            b"admin\0user\0pass@word!"
        );
    }

    #[test]
    fn test_plain_initial_response() {
        let mut plain = Plain::new("", "user", "pass", "smtp.example.com");
        let (mech, initial) = plain
            .start(&server("smtp.example.com", true, &["LOGIN", "PLAIN"]))
            .unwrap();
        assert_eq!(mech, AuthMechanism::Plain);
        assert_eq!(initial.unwrap(), b"\0user\0pass");
        assert_eq!(plain.next(b"2.7.0 Accepted", false).unwrap(), None);
    }

    #[test]
    fn test_plain_refuses_plaintext() {
        let mut plain = Plain::new("", "user", "pass", "smtp.example.com");
        let err = plain
            .start(&server("smtp.example.com", false, &["LOGIN", "PLAIN"]))
            .unwrap_err();
        assert_eq!(err, SaslError::InsecureConnection);
        assert_eq!(err.to_string(), "unencrypted connection");
    }

    #[test]
    fn test_plain_plaintext_to_loopback() {
        for host in ["localhost", "127.0.0.1", "::1"] {
            let mut plain = Plain::new("", "user", "pass", host);
            let (mech, _) = plain.start(&server(host, false, &["PLAIN"])).unwrap();
            assert_eq!(mech, AuthMechanism::Plain);
        }
    }

    #[test]
    fn test_plain_refuses_other_host() {
        let mut plain = Plain::new("", "user", "pass", "smtp.example.com");
        let err = plain
            .start(&server("mx.attacker.test", true, &["PLAIN"]))
            .unwrap_err();
        assert_eq!(err, SaslError::HostMismatch);

        // Loopback names are exempt from the TLS check only
        let mut plain = Plain::new("", "user", "pass", "smtp.example.com");
        assert_eq!(
            plain.start(&server("localhost", false, &["PLAIN"])).unwrap_err(),
            SaslError::HostMismatch
        );
    }

    #[test]
    fn test_plain_rejects_challenge() {
        let mut plain = Plain::new("", "user", "pass", "smtp.example.com");
        assert!(matches!(
            plain.next(b"more?", true),
            Err(SaslError::UnexpectedChallenge(_))
        ));
    }

    #[test]
    fn test_cram_md5_rfc2195_example() {
        let mut cram = CramMd5::new("tim", "tanstaaftanstaaf");
        let (mech, initial) = cram.start(&server("localhost", false, &[])).unwrap();
        assert_eq!(mech, AuthMechanism::CramMd5);
        assert!(initial.is_none());

        let challenge = b"<1896.697170952@postoffice.reston.mci.net>";
        let response = cram.next(challenge, true).unwrap().unwrap();
        assert_eq!(
            String::from_utf8(response).unwrap(),
            "tim b913a602c7eda7a495b4e6e7334d3890"
        );
    }

    #[test]
    fn test_cram_md5_digest_any_key_length() {
        let long = "k".repeat(200);
        for secret in ["", "short", long.as_str()] {
            let digest = cram_md5_digest(secret, b"<1.2@host>").unwrap();
            assert_eq!(digest.len(), 32);
        }
    }

    #[test]
    fn test_cram_md5_final_frame() {
        let mut cram = CramMd5::new("tim", "secret");
        assert_eq!(cram.next(b"2.7.0 Accepted", false).unwrap(), None);
    }

    #[test]
    fn test_debug_hides_secrets() {
        let plain = Plain::new("", "user", "hunter2", "smtp.example.com");
        let cram = CramMd5::new("user", "hunter2");
        assert!(!format!("{plain:?}").contains("hunter2"));
        assert!(!format!("{cram:?}").contains("hunter2"));
    }
}
