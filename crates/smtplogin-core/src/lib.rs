//! # smtplogin-core
//!
//! Checks SMTP credentials by dialing the server, negotiating TLS and an
//! AUTH mechanism, and reporting whether the server accepted them.
//!
//! ```ignore
//! let outcome = smtplogin_core::authenticate("smtp.example.com", 465, "user", "pass").await;
//! if !outcome.success() {
//!     eprintln!("login failed: {}", outcome.message());
//! }
//! ```
//!
//! For anything beyond the defaults, build a [`DialerConfig`] and run a
//! [`Dialer`]. Tests swap the network for a fake [`Connector`].

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod config;
pub mod connector;
pub mod dialer;
mod error;
pub mod login;
pub mod outcome;
pub mod selector;

pub use config::{DialerConfig, DialerConfigBuilder};
pub use connector::{Connector, SmtpConnector};
pub use dialer::Dialer;
pub use error::{Error, Result};
pub use login::LoginAuth;
pub use outcome::AuthOutcome;
pub use selector::{build_mechanism, select_mechanism};

/// Checks `username` and `password` against the server at `host:port`.
///
/// Port 465 uses implicit TLS; other ports upgrade with STARTTLS when the
/// server offers it.
pub async fn authenticate(
    host: impl Into<String>,
    port: u16,
    username: impl Into<String>,
    password: impl Into<String>,
) -> AuthOutcome {
    Dialer::new(DialerConfig::new(host, port, username, password))
        .authenticate()
        .await
}
