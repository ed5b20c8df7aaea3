//! SMTP session client.

use super::{ServerInfo, Session, SmtpStream, TlsConfig};
use crate::command::Command;
use crate::error::{Error, Result, SaslError};
use crate::parser::{parse_line, parse_reply};
use crate::sasl::Mechanism;
use crate::types::{Capabilities, Reply, ReplyCode};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Identity announced when the caller never sends a greeting explicitly.
pub const DEFAULT_LOCAL_NAME: &str = "localhost";

/// SMTP client for a single connection.
///
/// The client greets the server lazily: if [`Session::hello`] was not
/// called, the first operation needing capabilities sends `EHLO localhost`.
/// After STARTTLS the capabilities are discarded and fetched again the same
/// way, since servers may announce different extensions once encrypted.
#[derive(Debug)]
pub struct Client {
    stream: SmtpStream,
    server_name: String,
    greeting: String,
    local_name: String,
    capabilities: Option<Capabilities>,
    greeted: bool,
    upgraded: bool,
}

impl Client {
    /// Creates a client from a stream and reads the server greeting.
    ///
    /// `server_name` is the host the stream was dialed for; mechanisms compare
    /// it against the host they hold credentials for.
    ///
    /// # Errors
    ///
    /// Returns an error if reading the greeting fails or if the server returns an error.
    pub async fn from_stream(mut stream: SmtpStream, server_name: impl Into<String>) -> Result<Self> {
        let greeting = read_reply(&mut stream).await?;
        if !greeting.is_positive() {
            stream.shutdown().await;
            return Err(greeting.into_error());
        }

        let server_name = server_name.into();
        tracing::debug!(server = %server_name, greeting = greeting.first_line(), "Connected");

        Ok(Self {
            stream,
            server_name,
            greeting: greeting.text(),
            local_name: DEFAULT_LOCAL_NAME.to_string(),
            capabilities: None,
            greeted: false,
            upgraded: false,
        })
    }

    /// Returns the server greeting text.
    #[must_use]
    pub fn greeting(&self) -> &str {
        &self.greeting
    }

    /// Returns true if the connection is encrypted.
    #[must_use]
    pub const fn is_tls(&self) -> bool {
        self.stream.is_tls()
    }

    /// Returns the server capabilities, greeting first if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the greeting is rejected.
    pub async fn capabilities(&mut self) -> Result<&Capabilities> {
        if self.capabilities.is_none() {
            self.greet().await?;
        }
        // `greet` always stores capabilities on success
        self.capabilities
            .as_ref()
            .ok_or_else(|| Error::InvalidState("No capabilities after greeting".into()))
    }

    /// Describes the server for a SASL mechanism.
    ///
    /// # Errors
    ///
    /// Returns an error if the greeting is rejected.
    pub async fn server_info(&mut self) -> Result<ServerInfo> {
        let auth = self.capabilities().await?.auth_mechanisms();
        Ok(ServerInfo {
            name: self.server_name.clone(),
            tls: self.is_tls(),
            auth,
        })
    }

    /// Sends EHLO, falling back to HELO for servers without ESMTP.
    async fn greet(&mut self) -> Result<()> {
        let cmd = Command::Ehlo {
            hostname: self.local_name.clone(),
        };
        let reply = self.send_command(cmd).await?;
        self.greeted = true;

        let capabilities = if reply.is_positive() {
            // The first line is the server's name, not an extension
            Capabilities::parse(reply.lines.iter().skip(1).map(String::as_str))
        } else {
            tracing::debug!(code = %reply.code, "EHLO rejected, trying HELO");
            let cmd = Command::Helo {
                hostname: self.local_name.clone(),
            };
            let reply = self.send_command(cmd).await?;
            if !reply.is_positive() {
                return Err(reply.into_error());
            }
            Capabilities::default()
        };

        tracing::debug!(extensions = capabilities.len(), "Server capabilities");
        self.capabilities = Some(capabilities);
        Ok(())
    }

    /// Aborts a SASL exchange and returns the mechanism's error.
    async fn cancel_auth(&mut self, err: SaslError) -> Error {
        tracing::debug!(%err, "Cancelling authentication");
        if let Err(e) = self.send_command(Command::AuthCancel).await {
            tracing::debug!(?e, "AUTH cancel failed");
        }
        Error::Sasl(err)
    }

    async fn send_command(&mut self, cmd: Command) -> Result<Reply> {
        tracing::trace!(verb = cmd.verb(), "Sending command");
        let data = cmd.serialize();
        self.stream.write_all(&data).await?;
        read_reply(&mut self.stream).await
    }
}

impl Session for Client {
    async fn hello(&mut self, local_name: &str) -> Result<()> {
        if self.greeted {
            return Err(Error::InvalidState("HELO already sent".into()));
        }
        self.local_name = local_name.to_string();
        self.greet().await
    }

    async fn extension(&mut self, name: &str) -> Result<Option<String>> {
        Ok(self.capabilities().await?.get(name).map(str::to_string))
    }

    async fn starttls(&mut self, tls: &TlsConfig) -> Result<()> {
        if self.upgraded || self.is_tls() {
            return Err(Error::InvalidState("Connection already uses TLS".into()));
        }
        self.capabilities().await?;

        let reply = self.send_command(Command::StartTls).await?;
        if reply.code != ReplyCode::SERVICE_READY {
            return Err(reply.into_error());
        }

        // On failure the stream stays closed and the session is unusable
        let stream = std::mem::replace(&mut self.stream, SmtpStream::Closed);
        self.upgraded = true;
        self.stream = stream.upgrade_to_tls(tls, &self.server_name).await?;

        tracing::debug!(server = %self.server_name, "STARTTLS complete");
        self.capabilities = None;
        Ok(())
    }

    async fn auth(&mut self, mechanism: &mut dyn Mechanism) -> Result<()> {
        let info = self.server_info().await?;
        let (name, initial) = mechanism.start(&info)?;
        tracing::debug!(mechanism = %name, tls = info.tls, "Authenticating");

        let initial_response = initial.map(|resp| {
            if resp.is_empty() {
                "=".to_string()
            } else {
                STANDARD.encode(resp)
            }
        });
        let mut reply = self
            .send_command(Command::Auth {
                mechanism: name,
                initial_response,
            })
            .await?;

        loop {
            let (challenge, more) = match reply.code {
                ReplyCode::AUTH_CONTINUE => match STANDARD.decode(reply.first_line().trim()) {
                    Ok(challenge) => (challenge, true),
                    Err(e) => {
                        let err = SaslError::MalformedChallenge(e.to_string());
                        return Err(self.cancel_auth(err).await);
                    }
                },
                ReplyCode::AUTH_SUCCESS => (reply.first_line().as_bytes().to_vec(), false),
                _ => return Err(reply.into_error()),
            };

            let response = match mechanism.next(&challenge, more) {
                Ok(response) => response,
                Err(err) => return Err(self.cancel_auth(err).await),
            };

            if !more {
                // The server already accepted; nothing may follow the final frame
                if response.is_some() {
                    return Err(Error::Protocol(
                        "Mechanism answered after authentication completed".into(),
                    ));
                }
                break;
            }
            let line = response.map(|r| STANDARD.encode(r)).unwrap_or_default();
            reply = self.send_command(Command::AuthResponse(line)).await?;
        }

        tracing::debug!(mechanism = %name, "Authenticated");
        Ok(())
    }

    async fn close(&mut self) {
        if matches!(self.stream, SmtpStream::Closed) {
            return;
        }
        match self.send_command(Command::Quit).await {
            Ok(reply) if reply.code == ReplyCode::CLOSING => {}
            Ok(reply) => tracing::warn!(code = %reply.code, "QUIT rejected"),
            Err(e) => tracing::warn!(?e, "QUIT failed"),
        }
        self.stream.shutdown().await;
    }
}

async fn read_reply(stream: &mut SmtpStream) -> Result<Reply> {
    let mut lines = Vec::new();
    loop {
        let line = stream.read_line().await?;
        if line.is_empty() {
            continue;
        }

        // Fail on garbage instead of waiting for a final line that never comes
        let last = parse_line(&line)?.last;
        lines.push(line);
        if last {
            break;
        }
    }

    parse_reply(&lines)
}
