//! End-to-end session tests.
//!
//! These tests drive [`deliver`] over a scripted transport that plays the
//! server side of a conversation and records everything the client writes,
//! including TLS upgrades and the final shutdown.

#![allow(clippy::unwrap_used)]

use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use maildrop_smtp::{
    Config, Envelope, Error, ErrorKind, HelloMethod, Result, Security, SignInMethod, Transport,
    deliver,
};

/// Server side of a session, one reply per read.
struct ScriptedServer {
    replies: VecDeque<Vec<u8>>,
    transcript: Arc<Mutex<String>>,
    tls: bool,
    fail_handshake: bool,
}

impl ScriptedServer {
    fn new(replies: &[&str]) -> (Self, Arc<Mutex<String>>) {
        let transcript = Arc::new(Mutex::new(String::new()));
        let server = Self {
            replies: replies.iter().map(|r| r.as_bytes().to_vec()).collect(),
            transcript: Arc::clone(&transcript),
            tls: false,
            fail_handshake: false,
        };
        (server, transcript)
    }

    fn with_tls(mut self) -> Self {
        self.tls = true;
        self
    }

    fn failing_handshake(mut self) -> Self {
        self.fail_handshake = true;
        self
    }

    fn record(&self, text: &str) {
        self.transcript.lock().unwrap().push_str(text);
    }
}

impl Transport for ScriptedServer {
    async fn upgrade_to_tls(mut self, hostname: &str) -> Result<Self> {
        if self.fail_handshake {
            self.record("[TLS FAILED]");
            return Err(io::Error::new(io::ErrorKind::ConnectionReset, "handshake failed").into());
        }
        self.record(&format!("[TLS {hostname}]"));
        self.tls = true;
        Ok(self)
    }

    fn is_tls(&self) -> bool {
        self.tls
    }
}

impl AsyncRead for ScriptedServer {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if let Some(mut chunk) = self.replies.pop_front() {
            if chunk.len() > buf.remaining() {
                let rest = chunk.split_off(buf.remaining());
                self.replies.push_front(rest);
            }
            buf.put_slice(&chunk);
        }
        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for ScriptedServer {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.record(&String::from_utf8_lossy(buf));
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.record("[CLOSE]");
        Poll::Ready(Ok(()))
    }
}

const EHLO_STARTTLS: &str = "250-smtp.example.com\r\n250-PIPELINING\r\n250 STARTTLS\r\n";
const EHLO_PLAIN: &str = "250-smtp.example.com\r\n250 PIPELINING\r\n";

fn config(security: Security) -> Config {
    Config::builder("smtp.example.com").security(security).build()
}

fn envelope() -> Envelope {
    Envelope::new(
        "from@example.com",
        ["to@example.com"],
        "Subject: Test\r\n\r\nHello",
    )
    .unwrap()
}

fn transcript(handle: &Arc<Mutex<String>>) -> String {
    handle.lock().unwrap().clone()
}

#[tokio::test]
async fn test_mandatory_starttls_delivery() {
    let (server, log) = ScriptedServer::new(&[
        "220 smtp.example.com ESMTP\r\n",
        EHLO_STARTTLS,
        "220 Ready to start TLS\r\n",
        "250-smtp.example.com\r\n250 AUTH LOGIN PLAIN\r\n",
        "250 2.1.0 Ok\r\n",
        "250 2.1.5 Ok\r\n",
        "354 End data with <CR><LF>.<CR><LF>\r\n",
        "250 2.0.0 Ok: queued\r\n",
        "221 2.0.0 Bye\r\n",
    ]);

    deliver(server, &config(Security::StartTls), &envelope())
        .await
        .unwrap();

    assert_eq!(
        transcript(&log),
        "EHLO smtp.example.com\r\n\
         STARTTLS\r\n\
         [TLS smtp.example.com]\
         EHLO smtp.example.com\r\n\
         MAIL FROM:<from@example.com>\r\n\
         RCPT TO:<to@example.com>\r\n\
         DATA\r\n\
         Subject: Test\r\n\r\nHello\r\n.\r\n\
         QUIT\r\n\
         [CLOSE]"
    );
}

#[tokio::test]
async fn test_rejection_at_any_step_stops_the_session() {
    let happy = [
        "220 ready\r\n",
        EHLO_STARTTLS,
        "220 Ready to start TLS\r\n",
        EHLO_PLAIN,
        "250 sender ok\r\n",
        "250 recipient ok\r\n",
        "354 go ahead\r\n",
        "250 queued\r\n",
        "221 bye\r\n",
    ];
    // What the client has written by the time each reply arrives.
    let sent = [
        "EHLO smtp.example.com\r\n",
        "STARTTLS\r\n",
        "[TLS smtp.example.com]EHLO smtp.example.com\r\n",
        "MAIL FROM:<from@example.com>\r\n",
        "RCPT TO:<to@example.com>\r\n",
        "DATA\r\n",
        "Subject: Test\r\n\r\nHello\r\n.\r\n",
        "QUIT\r\n",
    ];

    // Fail each reply in turn, from the banner through QUIT.
    for failing in 0..happy.len() {
        let mut script: Vec<&str> = happy[..failing].to_vec();
        script.push("550 5.7.1 Rejected\r\n");
        let (server, log) = ScriptedServer::new(&script);

        let err = deliver(server, &config(Security::StartTls), &envelope())
            .await
            .unwrap_err();
        assert!(
            matches!(err, Error::SmtpError { code: 550, ref message } if message == "5.7.1 Rejected"),
            "step {failing}: {err:?}"
        );
        assert_eq!(err.kind(), ErrorKind::Protocol);

        let expected = format!("{}[CLOSE]", sent[..failing].concat());
        assert_eq!(transcript(&log), expected, "step {failing}");
    }
}

#[tokio::test]
async fn test_banner_rejection() {
    let (server, log) = ScriptedServer::new(&["554 No SMTP service here\r\n"]);

    let err = deliver(server, &config(Security::None), &envelope())
        .await
        .unwrap_err();
    assert_eq!(err.reply_code(), Some(554));
    assert_eq!(transcript(&log), "[CLOSE]");
}

#[tokio::test]
async fn test_multiline_banner() {
    let (server, log) = ScriptedServer::new(&[
        "220-smtp.example.com ESMTP\r\n220 No UCE\r\n",
        EHLO_PLAIN,
        "250 ok\r\n",
        "250 ok\r\n",
        "354 go\r\n",
        "250 ok\r\n",
        "221 bye\r\n",
    ]);

    deliver(server, &config(Security::None), &envelope())
        .await
        .unwrap();
    assert!(transcript(&log).starts_with("EHLO smtp.example.com\r\n"));
}

#[tokio::test]
async fn test_opportunistic_starttls_refused_continues_in_plaintext() {
    let (server, log) = ScriptedServer::new(&[
        "220 ready\r\n",
        EHLO_STARTTLS,
        "502 5.5.1 Not implemented\r\n",
        "250 ok\r\n",
        "250 ok\r\n",
        "354 go\r\n",
        "250 ok\r\n",
        "221 bye\r\n",
    ]);

    deliver(server, &config(Security::OpportunisticStartTls), &envelope())
        .await
        .unwrap();

    let log = transcript(&log);
    assert!(log.starts_with("EHLO smtp.example.com\r\nSTARTTLS\r\nMAIL FROM:<from@example.com>\r\n"));
    assert!(!log.contains("[TLS"));
    assert_eq!(log.matches("EHLO").count(), 1);
}

#[tokio::test]
async fn test_opportunistic_starttls_not_advertised() {
    let (server, log) = ScriptedServer::new(&[
        "220 ready\r\n",
        EHLO_PLAIN,
        "250 ok\r\n",
        "250 ok\r\n",
        "354 go\r\n",
        "250 ok\r\n",
        "221 bye\r\n",
    ]);

    deliver(server, &config(Security::OpportunisticStartTls), &envelope())
        .await
        .unwrap();
    assert!(!transcript(&log).contains("STARTTLS"));
}

#[tokio::test]
async fn test_mandatory_starttls_not_advertised() {
    let (server, log) = ScriptedServer::new(&["220 ready\r\n", EHLO_PLAIN]);

    let err = deliver(server, &config(Security::StartTls), &envelope())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotSupported(ref what) if what == "STARTTLS"));
    assert_eq!(transcript(&log), "EHLO smtp.example.com\r\n[CLOSE]");
}

#[tokio::test]
async fn test_mandatory_starttls_refused() {
    let (server, log) = ScriptedServer::new(&[
        "220 ready\r\n",
        EHLO_STARTTLS,
        "454 4.7.0 TLS not available\r\n",
    ]);

    let err = deliver(server, &config(Security::StartTls), &envelope())
        .await
        .unwrap_err();
    assert_eq!(err.reply_code(), Some(454));
    assert!(err.is_transient());
    assert_eq!(
        transcript(&log),
        "EHLO smtp.example.com\r\nSTARTTLS\r\n[CLOSE]"
    );
}

#[tokio::test]
async fn test_starttls_with_pipelined_data_is_rejected() {
    // Anything after the 220 arrived in plaintext and must not be trusted.
    let (server, log) = ScriptedServer::new(&[
        "220 ready\r\n",
        EHLO_STARTTLS,
        "220 go ahead\r\n250 injected\r\n",
    ]);

    let err = deliver(server, &config(Security::StartTls), &envelope())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Protocol(_)));
    assert!(!transcript(&log).contains("[TLS"));
}

#[tokio::test]
async fn test_handshake_failure_consumes_stream() {
    let (server, log) = ScriptedServer::new(&["220 ready\r\n", EHLO_STARTTLS, "220 go ahead\r\n"]);

    let err = deliver(
        server.failing_handshake(),
        &config(Security::StartTls),
        &envelope(),
    )
    .await
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);
    // The stream was consumed by the failed handshake; nothing is left to close.
    assert_eq!(
        transcript(&log),
        "EHLO smtp.example.com\r\nSTARTTLS\r\n[TLS FAILED]"
    );
}

#[tokio::test]
async fn test_implicit_tls_skips_starttls() {
    let (server, log) = ScriptedServer::new(&[
        "220 ready\r\n",
        EHLO_STARTTLS,
        "250 ok\r\n",
        "250 ok\r\n",
        "354 go\r\n",
        "250 ok\r\n",
        "221 bye\r\n",
    ]);

    deliver(server.with_tls(), &config(Security::Implicit), &envelope())
        .await
        .unwrap();
    let log = transcript(&log);
    assert!(!log.contains("STARTTLS"));
    assert!(log.ends_with("QUIT\r\n[CLOSE]"));
}

#[tokio::test]
async fn test_helo_attempts_starttls() {
    let (server, log) = ScriptedServer::new(&[
        "220 ready\r\n",
        "250 smtp.example.com\r\n",
        "220 go ahead\r\n",
        "250 smtp.example.com\r\n",
        "250 ok\r\n",
        "250 ok\r\n",
        "354 go\r\n",
        "250 ok\r\n",
        "221 bye\r\n",
    ]);
    let config = Config::builder("smtp.example.com")
        .hello_method(HelloMethod::Helo)
        .hello_name("client.example.net")
        .build();

    deliver(server, &config, &envelope()).await.unwrap();
    assert!(transcript(&log).starts_with(
        "HELO client.example.net\r\nSTARTTLS\r\n[TLS smtp.example.com]HELO client.example.net\r\n"
    ));
}

#[tokio::test]
async fn test_auth_login() {
    let (server, log) = ScriptedServer::new(&[
        "220 ready\r\n",
        "250-smtp.example.com\r\n250 AUTH LOGIN\r\n",
        "334 VXNlcm5hbWU6\r\n",
        "334 UGFzc3dvcmQ6\r\n",
        "235 2.7.0 Authentication successful\r\n",
        "250 ok\r\n",
        "250 ok\r\n",
        "354 go\r\n",
        "250 ok\r\n",
        "221 bye\r\n",
    ]);
    let config = Config::builder("smtp.example.com")
        .security(Security::None)
        .sign_in(SignInMethod::credentials("user", "pass"))
        .build();

    deliver(server, &config, &envelope()).await.unwrap();
    assert!(transcript(&log).starts_with(
        "EHLO smtp.example.com\r\nAUTH LOGIN\r\ndXNlcg==\r\ncGFzcw==\r\nMAIL FROM:<from@example.com>\r\n"
    ));
}

#[tokio::test]
async fn test_auth_rejected() {
    let (server, log) = ScriptedServer::new(&[
        "220 ready\r\n",
        EHLO_PLAIN,
        "334 VXNlcm5hbWU6\r\n",
        "334 UGFzc3dvcmQ6\r\n",
        "535 5.7.8 Authentication credentials invalid\r\n",
    ]);
    let config = Config::builder("smtp.example.com")
        .security(Security::None)
        .sign_in(SignInMethod::credentials("user", "wrong"))
        .build();

    let err = deliver(server, &config, &envelope()).await.unwrap_err();
    assert_eq!(err.reply_code(), Some(535));
    assert!(transcript(&log).ends_with("d3Jvbmc=\r\n[CLOSE]"));
}

#[tokio::test]
async fn test_recipients_sent_in_order() {
    let (server, log) = ScriptedServer::new(&[
        "220 ready\r\n",
        EHLO_PLAIN,
        "250 ok\r\n",
        "250 ok\r\n",
        "251 will forward\r\n",
        "250 ok\r\n",
        "354 go\r\n",
        "250 ok\r\n",
        "221 bye\r\n",
    ]);
    let envelope = Envelope::new(
        "from@example.com",
        ["a@example.com", "b@example.com", "c@example.com"],
        "body",
    )
    .unwrap();

    deliver(server, &config(Security::None), &envelope)
        .await
        .unwrap();
    assert!(transcript(&log).contains(
        "RCPT TO:<a@example.com>\r\nRCPT TO:<b@example.com>\r\nRCPT TO:<c@example.com>\r\nDATA\r\nbody\r\n.\r\n"
    ));
}

#[tokio::test]
async fn test_quit_answered_by_close() {
    let (server, log) = ScriptedServer::new(&[
        "220 ready\r\n",
        EHLO_PLAIN,
        "250 ok\r\n",
        "250 ok\r\n",
        "354 go\r\n",
        "250 ok\r\n",
    ]);

    deliver(server, &config(Security::None), &envelope())
        .await
        .unwrap();
    assert!(transcript(&log).ends_with("QUIT\r\n[CLOSE]"));
}

#[tokio::test]
async fn test_close_before_quit_is_an_error() {
    let (server, log) = ScriptedServer::new(&["220 ready\r\n", EHLO_PLAIN, "250 ok\r\n"]);

    let err = deliver(server, &config(Security::None), &envelope())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Io(ref e) if e.kind() == io::ErrorKind::UnexpectedEof));
    assert!(transcript(&log).ends_with("RCPT TO:<to@example.com>\r\n[CLOSE]"));
}

#[tokio::test]
async fn test_malformed_reply() {
    let (server, log) = ScriptedServer::new(&["2x0 hello\r\n"]);

    let err = deliver(server, &config(Security::None), &envelope())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Protocol(_)));
    assert_eq!(transcript(&log), "[CLOSE]");
}

#[tokio::test]
async fn test_independent_sessions_run_concurrently() {
    let script = [
        "220 ready\r\n",
        EHLO_PLAIN,
        "250 ok\r\n",
        "250 ok\r\n",
        "354 go\r\n",
        "250 ok\r\n",
        "221 bye\r\n",
    ];
    let config = config(Security::None);
    let envelope = envelope();

    let (first, first_log) = ScriptedServer::new(&script);
    let (second, second_log) = ScriptedServer::new(&script);
    let (a, b) = tokio::join!(
        deliver(first, &config, &envelope),
        deliver(second, &config, &envelope)
    );
    a.unwrap();
    b.unwrap();
    assert_eq!(transcript(&first_log), transcript(&second_log));
}
