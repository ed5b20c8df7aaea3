//! The real dialer against scripted servers on loopback sockets.
//!
//! These run `SmtpConnector`, the session client and the mechanisms over
//! TCP, so every reply below is decoded exactly as a server would send it.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use rustls::ServerConfig;
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_rustls::TlsAcceptor;

use smtplogin_core::{AuthOutcome, Dialer, DialerConfig, Error, authenticate};
use smtplogin_smtp::TlsConfig;

/// One exchange: the line the client must send (prefix match) and the raw reply.
type Step = (&'static str, &'static str);

const GREETING: &str = "220 mail.test ESMTP ready\r\n";

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("smtplogin_core=debug,smtplogin_smtp=debug")
        .with_test_writer()
        .try_init();
}

/// Answers each client line with the next reply, recording what was received.
async fn run_script<S>(reader: &mut BufReader<S>, script: Vec<Step>, received: &mut Vec<String>)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    for (expected, reply) in script {
        let mut line = String::new();
        if reader.read_line(&mut line).await.unwrap() == 0 {
            break;
        }
        let line = line.trim_end().to_string();
        assert!(
            line.starts_with(expected),
            "expected {expected:?}, got {line:?}"
        );
        received.push(line);
        reader.get_mut().write_all(reply.as_bytes()).await.unwrap();
    }
}

async fn scripted_server(script: Vec<Step>) -> (u16, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        let mut reader = BufReader::new(socket);
        let mut received = Vec::new();
        reader.get_mut().write_all(GREETING.as_bytes()).await.unwrap();
        run_script(&mut reader, script, &mut received).await;
        received
    });

    (port, handle)
}

/// Self-signed certificate for `localhost`, as a rustls acceptor plus the
/// certificate the client must trust.
fn localhost_tls() -> (TlsAcceptor, CertificateDer<'static>) {
    let cert = rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
    let cert_der = CertificateDer::from(cert.serialize_der().unwrap());
    let key_der = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(cert.serialize_private_key_der()));

    let config = ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(vec![cert_der.clone()], key_der)
        .unwrap();
    (TlsAcceptor::from(Arc::new(config)), cert_der)
}

/// Runs `plain` in the clear, answers STARTTLS with 220, then runs `secure`
/// inside the TLS session.
async fn starttls_server(
    acceptor: TlsAcceptor,
    plain: Vec<Step>,
    secure: Vec<Step>,
) -> (u16, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        let mut reader = BufReader::new(socket);
        let mut received = Vec::new();
        reader.get_mut().write_all(GREETING.as_bytes()).await.unwrap();
        run_script(&mut reader, plain, &mut received).await;

        // Nothing may be buffered past the STARTTLS line
        assert!(reader.buffer().is_empty());
        let tls = acceptor.accept(reader.into_inner()).await.unwrap();
        received.push("-- tls --".to_string());

        let mut reader = BufReader::new(tls);
        run_script(&mut reader, secure, &mut received).await;
        received
    });

    (port, handle)
}

fn config_for(port: u16, password: &str) -> DialerConfig {
    DialerConfig::builder("127.0.0.1")
        .port(port)
        .credentials("user", password)
        .build()
}

#[tokio::test]
async fn test_login_over_loopback() {
    init_tracing();
    let (port, server) = scripted_server(vec![
        ("EHLO localhost", "250-mail.test\r\n250 AUTH LOGIN\r\n"),
        ("AUTH LOGIN", "334 VXNlcm5hbWU6\r\n"),
        ("dXNlcg==", "334 UGFzc3dvcmQ6\r\n"),
        ("cGFzcw==", "235 2.7.0 Authentication successful\r\n"),
        ("QUIT", "221 2.0.0 Bye\r\n"),
    ])
    .await;

    let dialer = Dialer::new(config_for(port, "pass"));
    dialer.dial_and_auth().await.unwrap();

    let received = server.await.unwrap();
    assert_eq!(
        received,
        ["EHLO localhost", "AUTH LOGIN", "dXNlcg==", "cGFzcw==", "QUIT"]
    );
}

#[tokio::test]
async fn test_authenticate_entry_point_with_plain() {
    init_tracing();
    let (port, server) = scripted_server(vec![
        ("EHLO localhost", "250-mail.test\r\n250-SIZE 1000\r\n250 AUTH LOGIN PLAIN\r\n"),
        ("AUTH PLAIN AHVzZXIAcGFzcw==", "235 2.7.0 Accepted\r\n"),
        ("QUIT", "221 Bye\r\n"),
    ])
    .await;

    let outcome = authenticate("127.0.0.1", port, "user", "pass").await;
    assert_eq!(outcome, AuthOutcome::Success);
    assert_eq!(server.await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_rejected_password_over_loopback() {
    init_tracing();
    let (port, server) = scripted_server(vec![
        ("EHLO localhost", "250-mail.test\r\n250 AUTH LOGIN\r\n"),
        ("AUTH LOGIN", "334 VXNlcm5hbWU6\r\n"),
        ("dXNlcg==", "334 UGFzc3dvcmQ6\r\n"),
        ("d3Jvbmc=", "535 5.7.8 Authentication credentials invalid\r\n"),
        ("QUIT", "221 Bye\r\n"),
    ])
    .await;

    let err = Dialer::new(config_for(port, "wrong"))
        .dial_and_auth()
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Auth(_)), "{err:?}");
    assert!(err.to_string().contains("535"));

    // The session is still closed politely
    assert_eq!(server.await.unwrap().last().unwrap(), "QUIT");
}

#[tokio::test]
async fn test_unknown_prompt_cancels_over_loopback() {
    init_tracing();
    let (port, server) = scripted_server(vec![
        ("EHLO localhost", "250-mail.test\r\n250 AUTH LOGIN\r\n"),
        ("AUTH LOGIN", "334 VG9rZW46\r\n"),
        ("*", "501 5.7.0 Cancelled\r\n"),
        ("QUIT", "221 Bye\r\n"),
    ])
    .await;

    let outcome = Dialer::new(config_for(port, "pass")).authenticate().await;
    assert_eq!(
        outcome,
        AuthOutcome::Failure("unexpected server challenge: Token:".to_string())
    );
    assert_eq!(server.await.unwrap(), ["EHLO localhost", "AUTH LOGIN", "*", "QUIT"]);
}

#[tokio::test]
async fn test_starttls_then_plain_over_loopback() {
    init_tracing();
    let (acceptor, cert) = localhost_tls();
    let (port, server) = starttls_server(
        acceptor,
        vec![
            ("EHLO localhost", "250-mail.test\r\n250-STARTTLS\r\n250 SIZE 1000\r\n"),
            ("STARTTLS", "220 2.0.0 Ready to start TLS\r\n"),
        ],
        vec![
            // Capabilities are only trusted once TLS is up
            ("EHLO localhost", "250-mail.test\r\n250 AUTH PLAIN\r\n"),
            ("AUTH PLAIN AHVzZXIAcGFzcw==", "235 2.7.0 Accepted\r\n"),
            ("QUIT", "221 Bye\r\n"),
        ],
    )
    .await;

    let config = DialerConfig::builder("127.0.0.1")
        .port(port)
        .credentials("user", "pass")
        .tls(TlsConfig::new("localhost").add_root(cert))
        .build();
    Dialer::new(config).dial_and_auth().await.unwrap();

    assert_eq!(
        server.await.unwrap(),
        [
            "EHLO localhost",
            "STARTTLS",
            "-- tls --",
            "EHLO localhost",
            "AUTH PLAIN AHVzZXIAcGFzcw==",
            "QUIT",
        ]
    );
}

#[tokio::test]
async fn test_untrusted_certificate_is_tls_failure() {
    init_tracing();
    let (acceptor, _) = localhost_tls();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let server = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        let mut reader = BufReader::new(socket);
        let mut received = Vec::new();
        reader.get_mut().write_all(GREETING.as_bytes()).await.unwrap();
        run_script(
            &mut reader,
            vec![
                ("EHLO localhost", "250-mail.test\r\n250 STARTTLS\r\n"),
                ("STARTTLS", "220 Ready\r\n"),
            ],
            &mut received,
        )
        .await;
        // The client aborts the handshake
        assert!(acceptor.accept(reader.into_inner()).await.is_err());
    });

    let config = DialerConfig::builder("127.0.0.1")
        .port(port)
        .credentials("user", "pass")
        .tls(TlsConfig::new("localhost"))
        .build();
    let err = Dialer::new(config).dial_and_auth().await.unwrap_err();
    assert!(matches!(err, Error::Tls(_)), "{err:?}");
    server.await.unwrap();
}
