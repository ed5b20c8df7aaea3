//! LOGIN mechanism.
//!
//! LOGIN is not a standardised SASL mechanism: the server prompts with the
//! literal texts `Username:` and `Password:` and the client answers each.
//! Because it ships credentials in clear base64, it only runs over TLS,
//! unless the server explicitly lists LOGIN among its mechanisms.

use smtplogin_smtp::sasl::SaslResult;
use smtplogin_smtp::{AuthMechanism, Mechanism, SaslError, ServerInfo};

const USERNAME_PROMPT: &[u8] = b"Username:";
const PASSWORD_PROMPT: &[u8] = b"Password:";

/// Client side of the LOGIN exchange, bound to one host.
#[derive(Clone)]
pub struct LoginAuth {
    username: String,
    password: String,
    host: String,
}

impl LoginAuth {
    /// Creates a LOGIN mechanism that only authenticates against `host`.
    #[must_use]
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        host: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            host: host.into(),
        }
    }
}

impl std::fmt::Debug for LoginAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginAuth")
            .field("username", &self.username)
            .field("host", &self.host)
            .finish_non_exhaustive()
    }
}

impl Mechanism for LoginAuth {
    fn start(&mut self, server: &ServerInfo) -> SaslResult<(AuthMechanism, Option<Vec<u8>>)> {
        if !server.tls && !server.advertises("LOGIN") {
            return Err(SaslError::InsecureConnection);
        }
        if server.name != self.host {
            return Err(SaslError::HostMismatch);
        }
        Ok((AuthMechanism::Login, None))
    }

    fn next(&mut self, challenge: &[u8], more: bool) -> SaslResult<Option<Vec<u8>>> {
        if !more {
            return Ok(None);
        }
        match challenge {
            USERNAME_PROMPT => Ok(Some(self.username.clone().into_bytes())),
            PASSWORD_PROMPT => Ok(Some(self.password.clone().into_bytes())),
            other => Err(SaslError::UnexpectedChallenge(other.to_vec())),
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::similar_names
)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn server(name: &str, tls: bool, auth: &[&str]) -> ServerInfo {
        ServerInfo {
            name: name.to_string(),
            tls,
            auth: auth.iter().map(|m| (*m).to_string()).collect(),
        }
    }

    #[test]
    fn test_start_over_tls() {
        let mut login = LoginAuth::new("user", "pass", "smtp.example.com");
        let (mech, initial) = login
            .start(&server("smtp.example.com", true, &["LOGIN"]))
            .unwrap();
        assert_eq!(mech, AuthMechanism::Login);
        assert!(initial.is_none());
    }

    #[test]
    fn test_start_plaintext_when_advertised() {
        let mut login = LoginAuth::new("user", "pass", "smtp.example.com");
        assert!(login
            .start(&server("smtp.example.com", false, &["PLAIN", "LOGIN"]))
            .is_ok());
    }

    #[test]
    fn test_start_refuses_insecure() {
        let mut login = LoginAuth::new("user", "pass", "smtp.example.com");
        let err = login
            .start(&server("smtp.example.com", false, &["PLAIN"]))
            .unwrap_err();
        assert_eq!(err, SaslError::InsecureConnection);
        assert_eq!(err.to_string(), "unencrypted connection");
    }

    #[test]
    fn test_advertisement_is_case_sensitive() {
        let mut login = LoginAuth::new("user", "pass", "smtp.example.com");
        assert_eq!(
            login
                .start(&server("smtp.example.com", false, &["login"]))
                .unwrap_err(),
            SaslError::InsecureConnection
        );
    }

    #[test]
    fn test_start_refuses_other_host() {
        let mut login = LoginAuth::new("user", "pass", "smtp.example.com");
        let err = login
            .start(&server("mx.attacker.test", true, &["LOGIN"]))
            .unwrap_err();
        assert_eq!(err, SaslError::HostMismatch);
        assert_eq!(err.to_string(), "wrong host name");
    }

    #[test]
    fn test_two_round_exchange() {
        let mut login = LoginAuth::new("user", "pass", "smtp.example.com");
        assert_eq!(login.next(b"Username:", true).unwrap().unwrap(), b"user");
        assert_eq!(login.next(b"Password:", true).unwrap().unwrap(), b"pass");
        assert_eq!(login.next(b"2.7.0 Accepted", false).unwrap(), None);
    }

    #[test]
    fn test_prompts_match_exactly() {
        let mut login = LoginAuth::new("user", "pass", "smtp.example.com");
        let prompts: [&[u8]; 4] = [b"username:", b"Username: ", b"User Name", b"Token:"];
        for prompt in prompts {
            assert_eq!(
                login.next(prompt, true).unwrap_err(),
                SaslError::UnexpectedChallenge(prompt.to_vec())
            );
        }
    }

    #[test]
    fn test_unexpected_challenge_message() {
        let mut login = LoginAuth::new("user", "pass", "smtp.example.com");
        let err = login.next(b"Token:", true).unwrap_err();
        assert_eq!(err.to_string(), "unexpected server challenge: Token:");
    }

    #[test]
    fn test_debug_hides_password() {
        let login = LoginAuth::new("user", "hunter2", "smtp.example.com");
        assert!(!format!("{login:?}").contains("hunter2"));
    }

    proptest! {
        #[test]
        fn prop_final_frame_never_fails(challenge in proptest::collection::vec(any::<u8>(), 0..64)) {
            let mut login = LoginAuth::new("user", "pass", "smtp.example.com");
            prop_assert_eq!(login.next(&challenge, false).unwrap(), None);
        }

        #[test]
        fn prop_unknown_prompt_is_echoed(challenge in proptest::collection::vec(any::<u8>(), 0..64)) {
            prop_assume!(challenge != USERNAME_PROMPT && challenge != PASSWORD_PROMPT);
            let mut login = LoginAuth::new("user", "pass", "smtp.example.com");
            prop_assert_eq!(
                login.next(&challenge, true).unwrap_err(),
                SaslError::UnexpectedChallenge(challenge.clone())
            );
        }

        #[test]
        fn prop_plaintext_without_login_is_refused(
            mechanisms in proptest::collection::vec("[A-Z0-9-]{1,12}", 0..5),
        ) {
            prop_assume!(!mechanisms.iter().any(|m| m == "LOGIN"));
            let auth: Vec<&str> = mechanisms.iter().map(String::as_str).collect();
            let mut login = LoginAuth::new("user", "pass", "smtp.example.com");
            prop_assert_eq!(
                login.start(&server("smtp.example.com", false, &auth)).unwrap_err(),
                SaslError::InsecureConnection
            );
        }
    }
}
