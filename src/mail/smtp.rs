use lettre::message::header::ContentType;
use lettre::message::{Attachment as MimeAttachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::{Credentials, Mechanism};
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{error, info, warn};

use crate::config::SmtpConfig;

use super::compose::MailAttachment;
use super::{MailError, OutboundMessage};

const OCTET_STREAM: &str = "application/octet-stream";

/// Delivers composed messages to the single configured recipient.
pub struct Mailer {
    config: SmtpConfig,
}

impl Mailer {
    pub fn new(config: SmtpConfig) -> Self {
        if config.dry_run {
            warn!("SMTP_DRY_RUN enabled; submissions will be logged, not sent");
        }
        Self { config }
    }

    pub fn is_dry_run(&self) -> bool {
        self.config.dry_run
    }

    pub async fn send(&self, msg: &OutboundMessage) -> Result<(), MailError> {
        if self.config.dry_run {
            info!(
                to = %self.config.to,
                subject = %msg.subject,
                attachments = msg.attachments.len(),
                "SMTP_DRY_RUN enabled. Email not sent."
            );
            info!("{}", msg.body);
            return Ok(());
        }

        if self.config.username.is_empty() || self.config.password.is_empty() {
            return Err(MailError::MissingCredentials);
        }

        let email = self.build_message(msg)?;
        self.deliver(email).await?;

        info!(
            to = %self.config.to,
            subject = %msg.subject,
            attachments = msg.attachments.len(),
            "Email sent"
        );
        Ok(())
    }

    pub fn build_message(&self, msg: &OutboundMessage) -> Result<Message, MailError> {
        let from = parse_mailbox("sender", &self.config.from)?;
        let to = parse_mailbox("recipient", &self.config.to)?;

        let builder = Message::builder().from(from).to(to).subject(&msg.subject);

        let email = if msg.attachments.is_empty() {
            builder
                .header(ContentType::TEXT_PLAIN)
                .body(msg.body.clone())
        } else {
            let mut parts = MultiPart::mixed().singlepart(SinglePart::plain(msg.body.clone()));
            for att in &msg.attachments {
                let part = MimeAttachment::new(att.filename.clone())
                    .body(att.data.to_vec(), attachment_content_type(att)?);
                parts = parts.singlepart(part);
            }
            builder.multipart(parts)
        };

        email.map_err(|e| MailError::Build(e.to_string()))
    }

    /// One connection per message: connect, STARTTLS, AUTH, send, quit.
    /// The connection is owned by the transport and dropped on every return path.
    async fn deliver(&self, email: Message) -> Result<(), MailError> {
        let creds = Credentials::new(self.config.username.clone(), self.config.password.clone());

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.host)
            .map_err(|e| MailError::Transport(e.to_string()))?
            .port(self.config.port)
            .timeout(Some(self.config.timeout))
            .credentials(creds)
            .authentication(vec![Mechanism::Login, Mechanism::Plain])
            .build();

        // lettre's timeout guards individual socket operations; this caps the whole session
        match tokio::time::timeout(self.config.session_timeout, transport.send(email)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(err)) => {
                error!(host = %self.config.host, port = self.config.port, %err, "SMTP send failed");
                Err(MailError::Transport(err.to_string()))
            }
            Err(_) => {
                error!(host = %self.config.host, port = self.config.port, "SMTP session timed out");
                Err(MailError::Timeout(self.config.session_timeout))
            }
        }
    }
}

fn parse_mailbox(role: &'static str, address: &str) -> Result<Mailbox, MailError> {
    address
        .trim()
        .parse::<Mailbox>()
        .map_err(|_| MailError::InvalidAddress {
            role,
            address: address.to_string(),
        })
}

fn attachment_content_type(att: &MailAttachment) -> Result<ContentType, MailError> {
    ContentType::parse(&att.content_type())
        .or_else(|_| ContentType::parse(OCTET_STREAM))
        .map_err(|e| MailError::Build(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mail::compose::{compose, sample_form, Attachment};
    use axum::body::Bytes;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::{Duration, Instant};
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::TcpListener;

    fn smtp_config(port: u16) -> SmtpConfig {
        SmtpConfig {
            host: "127.0.0.1".into(),
            port,
            username: "desk@dealer.test".into(),
            password: "secret".into(),
            from: "desk@dealer.test".into(),
            to: "claims@example.com".into(),
            dry_run: false,
            timeout: Duration::from_millis(300),
            session_timeout: Duration::from_secs(2),
        }
    }

    fn formatted(email: &Message) -> String {
        String::from_utf8_lossy(&email.formatted()).into_owned()
    }

    #[tokio::test]
    async fn dry_run_never_touches_the_network() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let mut config = smtp_config(port);
        config.dry_run = true;
        config.from = "not an address".into();

        let mailer = Mailer::new(config);
        mailer
            .send(&compose(&sample_form(), Vec::new()))
            .await
            .unwrap();

        let accepted = tokio::time::timeout(Duration::from_millis(100), listener.accept()).await;
        assert!(accepted.is_err(), "dry run must not connect");
    }

    #[tokio::test]
    async fn missing_credentials_fail_before_connecting() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        for (user, pass) in [("", "secret"), ("desk@dealer.test", ""), ("", "")] {
            let mut config = smtp_config(port);
            config.username = user.into();
            config.password = pass.into();

            let err = Mailer::new(config)
                .send(&compose(&sample_form(), Vec::new()))
                .await
                .unwrap_err();
            assert!(matches!(err, MailError::MissingCredentials));
            assert_eq!(err.to_string(), "SMTP credentials are not set");
        }

        let accepted = tokio::time::timeout(Duration::from_millis(100), listener.accept()).await;
        assert!(accepted.is_err(), "no connection expected without credentials");
    }

    #[tokio::test]
    async fn silent_server_surfaces_as_send_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let err = Mailer::new(smtp_config(port))
            .send(&compose(&sample_form(), Vec::new()))
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("SMTP send failed"), "{err}");
    }

    /// Replies to every command after `delay`, advertises no STARTTLS and
    /// answers QUIT. Returns the port and a count of commands seen.
    async fn slow_peer_without_starttls(delay: Duration) -> (u16, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let commands = Arc::new(AtomicUsize::new(0));
        let seen = commands.clone();

        tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let (read, mut write) = socket.into_split();
            let mut lines = BufReader::new(read).lines();

            tokio::time::sleep(delay).await;
            write.write_all(b"220 mail.test ESMTP ready\r\n").await.unwrap();

            while let Ok(Some(line)) = lines.next_line().await {
                seen.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(delay).await;
                let verb = line.split_whitespace().next().unwrap_or("").to_ascii_uppercase();
                let reply: &[u8] = match verb.as_str() {
                    "EHLO" => b"250-mail.test\r\n250 SIZE 35882577\r\n",
                    "HELO" => b"250 mail.test\r\n",
                    "QUIT" => b"221 bye\r\n",
                    _ => b"502 command not implemented\r\n",
                };
                if write.write_all(reply).await.is_err() || verb == "QUIT" {
                    break;
                }
            }
        });

        (port, commands)
    }

    #[tokio::test]
    async fn slow_but_responsive_server_is_not_cut_off_by_per_operation_timeout() {
        // Each step answers inside the 300ms operation timeout, but the
        // session as a whole runs well past it.
        let (port, commands) = slow_peer_without_starttls(Duration::from_millis(200)).await;

        let started = Instant::now();
        let err = Mailer::new(smtp_config(port))
            .send(&compose(&sample_form(), Vec::new()))
            .await
            .unwrap_err();

        assert!(started.elapsed() > Duration::from_millis(300));
        assert!(commands.load(Ordering::SeqCst) >= 1, "EHLO expected");
        assert!(matches!(err, MailError::Transport(_)), "{err:?}");
    }

    #[tokio::test]
    async fn server_without_starttls_is_refused() {
        let (port, _) = slow_peer_without_starttls(Duration::ZERO).await;

        let err = Mailer::new(smtp_config(port))
            .send(&compose(&sample_form(), Vec::new()))
            .await
            .unwrap_err();

        assert!(matches!(err, MailError::Transport(_)), "{err:?}");
        let text = err.to_string();
        assert!(text.starts_with("SMTP send failed"), "{text}");
        assert!(text.contains("STARTTLS"), "{text}");
    }

    #[test]
    fn plain_message_without_attachments() {
        let mailer = Mailer::new(smtp_config(25));
        let email = mailer
            .build_message(&compose(&sample_form(), Vec::new()))
            .unwrap();
        let raw = formatted(&email);
        assert!(raw.contains("Subject: Arbitration Request - Maple Motors - 1HGCM82633A004352"));
        assert!(raw.contains("To: claims@example.com"));
        assert!(raw.contains("From: desk@dealer.test"));
        assert!(raw.contains("Content-Type: text/plain"));
        assert!(!raw.contains("multipart/mixed"));
    }

    #[test]
    fn attachments_make_a_mixed_message() {
        let mailer = Mailer::new(smtp_config(25));
        let msg = compose(
            &sample_form(),
            vec![
                Attachment::new(
                    Some("invoice.pdf"),
                    Some("application/pdf"),
                    Bytes::from_static(b"%PDF-1.4"),
                ),
                Attachment::new(Some("notes"), Some("weird"), Bytes::from_static(b"raw")),
                Attachment::new(Some("skipped.png"), Some("image/png"), Bytes::new()),
            ],
        );
        let raw = formatted(&mailer.build_message(&msg).unwrap());
        assert!(raw.contains("multipart/mixed"));
        assert!(raw.contains("application/pdf"));
        assert!(raw.contains("invoice.pdf"));
        assert!(raw.contains("application/octet-stream"));
        assert!(!raw.contains("skipped.png"));
    }

    #[test]
    fn bad_sender_is_reported() {
        let mut config = smtp_config(25);
        config.from = "not an address".into();
        let err = Mailer::new(config)
            .build_message(&compose(&sample_form(), Vec::new()))
            .unwrap_err();
        assert!(matches!(err, MailError::InvalidAddress { role: "sender", .. }));
    }
}
