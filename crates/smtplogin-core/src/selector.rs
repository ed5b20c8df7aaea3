//! Mechanism selection.

use smtplogin_smtp::sasl::{CramMd5, Plain};
use smtplogin_smtp::{AuthMechanism, Mechanism};

use crate::config::DialerConfig;
use crate::login::LoginAuth;

/// Picks a mechanism from the parameters of the AUTH extension.
///
/// CRAM-MD5 is preferred, LOGIN is used only when PLAIN is not offered,
/// and PLAIN is the fallback. Returns `None` when the extension is absent
/// or lists nothing.
#[must_use]
pub fn select_mechanism(auth: Option<&str>) -> Option<AuthMechanism> {
    let tokens: Vec<&str> = auth?.split_whitespace().collect();
    if tokens.is_empty() {
        return None;
    }
    // Mechanisms we have no engine for still count as "something offered"
    let known: Vec<AuthMechanism> = tokens
        .iter()
        .filter_map(|token| AuthMechanism::parse(token))
        .collect();
    let has = |mechanism: AuthMechanism| known.contains(&mechanism);

    if has(AuthMechanism::CramMd5) {
        Some(AuthMechanism::CramMd5)
    } else if has(AuthMechanism::Login) && !has(AuthMechanism::Plain) {
        Some(AuthMechanism::Login)
    } else {
        Some(AuthMechanism::Plain)
    }
}

/// Builds the engine for `mechanism` from the configured credentials.
#[must_use]
pub fn build_mechanism(mechanism: AuthMechanism, config: &DialerConfig) -> Box<dyn Mechanism> {
    match mechanism {
        AuthMechanism::Plain => Box::new(Plain::new(
            "",
            &config.username,
            &config.password,
            &config.host,
        )),
        AuthMechanism::Login => Box::new(LoginAuth::new(
            &config.username,
            &config.password,
            &config.host,
        )),
        AuthMechanism::CramMd5 => Box::new(CramMd5::new(&config.username, &config.password)),
    }
}
