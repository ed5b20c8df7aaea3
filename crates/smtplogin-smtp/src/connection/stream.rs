//! Low-level SMTP stream handling.

use super::TlsConfig;
use crate::error::{Error, Result};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

/// SMTP stream (TCP or TLS).
#[derive(Debug)]
pub enum SmtpStream {
    /// Plain TCP connection.
    Tcp(BufReader<TcpStream>),
    /// TLS-encrypted connection.
    Tls(Box<BufReader<tokio_rustls::client::TlsStream<TcpStream>>>),
    /// Stream already shut down.
    Closed,
}

impl SmtpStream {
    /// Reads a line from the stream.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails or the peer closed the connection.
    pub async fn read_line(&mut self) -> Result<String> {
        let mut line = String::new();
        let read = match self {
            Self::Tcp(reader) => reader.read_line(&mut line).await?,
            Self::Tls(reader) => reader.read_line(&mut line).await?,
            Self::Closed => return Err(Error::InvalidState("Stream is closed".into())),
        };
        if read == 0 {
            return Err(Error::Io(std::io::ErrorKind::UnexpectedEof.into()));
        }
        Ok(line.trim_end().to_string())
    }

    /// Writes data to the stream.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn write_all(&mut self, data: &[u8]) -> Result<()> {
        match self {
            Self::Tcp(reader) => {
                reader.get_mut().write_all(data).await?;
                reader.get_mut().flush().await?;
            }
            Self::Tls(reader) => {
                reader.get_mut().write_all(data).await?;
                reader.get_mut().flush().await?;
            }
            Self::Closed => return Err(Error::InvalidState("Stream is closed".into())),
        }
        Ok(())
    }

    /// Returns true if the stream is TLS-encrypted.
    #[must_use]
    pub const fn is_tls(&self) -> bool {
        matches!(self, Self::Tls(_))
    }

    /// Upgrades a TCP stream to TLS.
    ///
    /// `default_name` is validated unless the config overrides it.
    ///
    /// # Errors
    ///
    /// Returns an error if the stream is not plain TCP or the TLS handshake fails.
    pub async fn upgrade_to_tls(self, tls: &TlsConfig, default_name: &str) -> Result<Self> {
        let tcp_stream = match self {
            Self::Tcp(reader) => reader.into_inner(),
            Self::Tls(_) => return Err(Error::InvalidState("Already using TLS".into())),
            Self::Closed => return Err(Error::InvalidState("Stream is closed".into())),
        };
        handshake(tcp_stream, tls, default_name).await
    }

    /// Shuts the stream down. Safe to call more than once.
    pub async fn shutdown(&mut self) {
        let result = match std::mem::replace(self, Self::Closed) {
            Self::Tcp(mut reader) => reader.get_mut().shutdown().await,
            Self::Tls(mut reader) => reader.get_mut().shutdown().await,
            Self::Closed => return,
        };
        if let Err(e) = result {
            tracing::debug!(?e, "Stream shutdown failed");
        }
    }
}

/// Connects to an SMTP server over plain TCP.
///
/// # Errors
///
/// Returns an error if the connection fails or does not complete within `timeout`.
pub async fn connect(hostname: &str, port: u16, timeout: Duration) -> Result<SmtpStream> {
    let stream = tcp_connect(hostname, port, timeout).await?;
    Ok(SmtpStream::Tcp(BufReader::new(stream)))
}

/// Connects to an SMTP server over TLS (implicit TLS on port 465).
///
/// The handshake completes before the stream is returned, so no SMTP bytes
/// ever travel in the clear.
///
/// # Errors
///
/// Returns an error if the connection or TLS handshake fails.
pub async fn connect_tls(
    hostname: &str,
    port: u16,
    timeout: Duration,
    tls: &TlsConfig,
) -> Result<SmtpStream> {
    let tcp_stream = tcp_connect(hostname, port, timeout).await?;
    handshake(tcp_stream, tls, hostname).await
}

async fn tcp_connect(hostname: &str, port: u16, timeout: Duration) -> Result<TcpStream> {
    let addr = format!("{hostname}:{port}");
    tracing::debug!(%addr, ?timeout, "Connecting");
    match tokio::time::timeout(timeout, TcpStream::connect(&addr)).await {
        Ok(stream) => Ok(stream?),
        Err(_) => Err(Error::Timeout(addr)),
    }
}

async fn handshake(tcp_stream: TcpStream, tls: &TlsConfig, default_name: &str) -> Result<SmtpStream> {
    let connector = tls.connector()?;
    let server_name = tls.server_name(default_name)?;
    tracing::debug!(server_name = tls.effective_name(default_name), "TLS handshake");

    let tls_stream = connector
        .connect(server_name, tcp_stream)
        .await
        .map_err(Error::TlsHandshake)?;
    Ok(SmtpStream::Tls(Box::new(BufReader::new(tls_stream))))
}
