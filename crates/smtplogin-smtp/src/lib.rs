//! # smtplogin-smtp
//!
//! The slice of SMTP needed to check credentials against a server:
//! greeting and capability discovery, STARTTLS, and SASL authentication
//! (RFC 4954). Mail transfer commands are not supported.
//!
//! ## Quick Start
//!
//! ```ignore
//! use smtplogin_smtp::connection::{connect, Client, Session, TlsConfig};
//! use smtplogin_smtp::sasl::Plain;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> smtplogin_smtp::Result<()> {
//!     let stream = connect("smtp.example.com", 587, Duration::from_secs(10)).await?;
//!     let mut client = Client::from_stream(stream, "smtp.example.com").await?;
//!
//!     client.hello("client.example.com").await?;
//!     if client.extension("STARTTLS").await?.is_some() {
//!         client.starttls(&TlsConfig::default()).await?;
//!     }
//!
//!     let mut plain = Plain::new("", "user@example.com", "password", "smtp.example.com");
//!     let result = client.auth(&mut plain).await;
//!     client.close().await;
//!     result
//! }
//! ```
//!
//! ## Modules
//!
//! - [`command`]: SMTP command builders
//! - [`connection`]: Transport, TLS settings and the session client
//! - [`parser`]: Response parser
//! - [`sasl`]: Mechanism trait plus PLAIN and CRAM-MD5
//! - [`types`]: Core SMTP types (capabilities, mechanisms, replies)

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
mod error;
pub mod parser;
pub mod sasl;
pub mod types;

pub use connection::{Client, ServerInfo, Session, SmtpStream, TlsConfig};
pub use error::{Error, Result, SaslError};
pub use sasl::Mechanism;
pub use types::{AuthMechanism, Capabilities, Reply, ReplyCode};
