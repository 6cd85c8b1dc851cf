use crate::config::Settings;
use crate::domain::summary::Summary;
use crate::email::templates;
use crate::email::ReportMailer;
use crate::retry::{self, RetryPolicy};
use crate::time::schedule::local_date;
use anyhow::Context;
use chrono::Utc;
use chrono_tz::Tz;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Report delivery over authenticated SMTP.
#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    host: String,
    port: u16,
    from: Mailbox,
    to: Vec<Mailbox>,
    error_to: Option<Vec<Mailbox>>,
    subject_prefix: String,
    timezone: Tz,
    retry: RetryPolicy,
}

impl std::fmt::Debug for SmtpMailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpMailer")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("from", &self.from.to_string())
            .field("to", &self.to.len())
            .finish_non_exhaustive()
    }
}

/// True when the chain holds an SMTP failure worth retrying: 4xx replies, timeouts and
/// connection errors. Permanent rejections, client-side and TLS errors are final.
pub fn is_transient_smtp(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<lettre::transport::smtp::Error>()
            .is_some_and(|e| !(e.is_permanent() || e.is_client() || e.is_tls()))
    })
}

/// Comma-separated recipient list.
pub fn parse_mailboxes(raw: &str) -> anyhow::Result<Vec<Mailbox>> {
    let boxes = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<Mailbox>()
                .with_context(|| format!("invalid email address: {s:?}"))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    anyhow::ensure!(!boxes.is_empty(), "no email recipients in {raw:?}");
    Ok(boxes)
}

impl SmtpMailer {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let host = settings.require_smtp_host()?.to_string();
        let (username, password) = settings.require_smtp_credentials()?;
        let from_address = settings
            .require_email_from()?
            .parse::<Address>()
            .context("EMAIL_FROM is not a valid email address")?;
        let from = Mailbox::new(Some(settings.email_from_name.clone()), from_address);
        let to = parse_mailboxes(settings.require_email_to()?).context("EMAIL_TO is invalid")?;
        let error_to = settings
            .error_notification_email
            .as_deref()
            .map(parse_mailboxes)
            .transpose()
            .context("ERROR_NOTIFICATION_EMAIL is invalid")?;

        let timeout_secs = std::env::var("SMTP_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        // SMTP_USE_TLS selects STARTTLS on a plain connection; otherwise TLS from the first byte.
        let builder = if settings.smtp_use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&host)
        }
        .with_context(|| format!("failed to configure SMTP relay {host}"))?;

        let transport = builder
            .port(settings.smtp_port)
            .credentials(Credentials::new(username.to_string(), password.to_string()))
            .timeout(Some(Duration::from_secs(timeout_secs)))
            .build();

        tracing::info!(
            %host,
            port = settings.smtp_port,
            starttls = settings.smtp_use_tls,
            "email sender initialized"
        );

        Ok(Self {
            transport,
            host,
            port: settings.smtp_port,
            from,
            to,
            error_to,
            subject_prefix: settings.email_subject_prefix.clone(),
            timezone: settings.timezone,
            retry: RetryPolicy::network(),
        })
    }

    pub fn report_subject(prefix: &str, website: &str, summary: &Summary, tz: Tz) -> String {
        format!(
            "{prefix} {website} - {} to {}",
            local_date(summary.period_start, tz).format("%b %d"),
            local_date(summary.period_end, tz).format("%b %d, %Y")
        )
    }

    fn build_message(
        from: &Mailbox,
        to: &[Mailbox],
        subject: &str,
        plain: String,
        html: String,
    ) -> anyhow::Result<Message> {
        let mut builder = Message::builder().from(from.clone()).subject(subject);
        for mailbox in to {
            builder = builder.to(mailbox.clone());
        }
        builder
            .multipart(MultiPart::alternative_plain_html(plain, html))
            .context("failed to build email message")
    }

    async fn deliver(&self, message: Message) -> anyhow::Result<()> {
        let message = &message;
        retry::retry("smtp send", self.retry, is_transient_smtp, move || async move {
            self.transport
                .send(message.clone())
                .await
                .map(|_| ())
                .with_context(|| format!("SMTP delivery via {}:{} failed", self.host, self.port))
        })
        .await
    }
}

#[async_trait::async_trait]
impl ReportMailer for SmtpMailer {
    async fn send_report(
        &self,
        summary: &Summary,
        ai_summary: &str,
        website: &str,
    ) -> anyhow::Result<()> {
        let generated_at = Utc::now().with_timezone(&self.timezone);
        let subject = Self::report_subject(&self.subject_prefix, website, summary, self.timezone);
        let message = Self::build_message(
            &self.from,
            &self.to,
            &subject,
            templates::report_plain(summary, ai_summary, website, &generated_at),
            templates::report_html(summary, ai_summary, website, &generated_at),
        )?;
        tracing::debug!(%subject, "email message created");

        self.deliver(message).await?;
        tracing::info!(recipients = self.to.len(), %subject, "analytics report sent");
        Ok(())
    }

    async fn send_error_notification(
        &self,
        message: &str,
        details: Option<&str>,
    ) -> anyhow::Result<bool> {
        let Some(error_to) = self.error_to.as_deref() else {
            tracing::debug!("error notification email not configured; skipping");
            return Ok(false);
        };

        let email = Self::build_message(
            &self.from,
            error_to,
            &format!("{} Error Notification", self.subject_prefix),
            templates::error_plain(message, details),
            templates::error_html(message, details),
        )?;
        self.deliver(email).await?;
        tracing::info!("error notification sent");
        Ok(true)
    }

    async fn test_connection(&self) -> anyhow::Result<()> {
        let ok = self
            .transport
            .test_connection()
            .await
            .with_context(|| format!("SMTP connection to {}:{} failed", self.host, self.port))?;
        anyhow::ensure!(ok, "SMTP server {}:{} did not accept NOOP", self.host, self.port);
        tracing::info!(host = %self.host, "SMTP connection test successful");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::test_support::sample_summary;

    #[test]
    fn subject_spans_the_period() {
        let summary = sample_summary();
        assert_eq!(
            SmtpMailer::report_subject("[Analytics Report]", "example.com", &summary, Tz::UTC),
            "[Analytics Report] example.com - Jan 01 to Jan 31, 2024"
        );
    }

    #[test]
    fn subject_dates_are_local() {
        use chrono::TimeZone;

        let mut summary = sample_summary();
        summary.period_start = Utc.with_ymd_and_hms(2023, 12, 2, 23, 30, 0).unwrap();
        summary.period_end = Utc.with_ymd_and_hms(2023, 12, 31, 23, 30, 0).unwrap();
        assert_eq!(
            SmtpMailer::report_subject("[R]", "example.com", &summary, Tz::Europe__Bratislava),
            "[R] example.com - Dec 03 to Jan 01, 2024"
        );
        assert_eq!(
            SmtpMailer::report_subject("[R]", "example.com", &summary, Tz::America__New_York),
            "[R] example.com - Dec 02 to Dec 31, 2023"
        );
    }

    #[test]
    fn parses_recipient_lists() {
        let boxes = parse_mailboxes("a@example.com, Team <team@example.com>,").unwrap();
        assert_eq!(boxes.len(), 2);
        assert_eq!(boxes[1].email.to_string(), "team@example.com");
        assert!(parse_mailboxes(" , ").is_err());
        assert!(parse_mailboxes("not-an-address").is_err());
    }

    #[test]
    fn message_is_multipart_alternative_plain_first() {
        let from = Mailbox::new(
            Some("Analytics Reporter".to_string()),
            "reports@example.com".parse().unwrap(),
        );
        let to = parse_mailboxes("owner@example.com").unwrap();
        let message = SmtpMailer::build_message(
            &from,
            &to,
            "subject line",
            "plain body".to_string(),
            "<p>html body</p>".to_string(),
        )
        .unwrap();

        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("Analytics Reporter"));
        assert!(raw.contains("<reports@example.com>"));
        assert!(raw.contains("owner@example.com"));
        assert!(raw.contains("Subject: subject line"));
        assert!(raw.contains("multipart/alternative"));
        let plain_at = raw.find("text/plain").unwrap();
        let html_at = raw.find("text/html").unwrap();
        assert!(plain_at < html_at);
    }

    fn test_message() -> Message {
        let from: Mailbox = "reports@example.com".parse().unwrap();
        let to = parse_mailboxes("owner@example.com").unwrap();
        SmtpMailer::build_message(&from, &to, "s", "p".to_string(), "<p>h</p>".to_string()).unwrap()
    }

    fn plain_transport(port: u16) -> AsyncSmtpTransport<Tokio1Executor> {
        AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous("127.0.0.1")
            .port(port)
            .credentials(Credentials::new("user".to_string(), "wrong".to_string()))
            .timeout(Some(Duration::from_secs(5)))
            .build()
    }

    /// Plain-text SMTP server that offers AUTH and rejects every credential with 535.
    async fn rejecting_server() -> u16 {
        use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let (read, mut write) = socket.into_split();
            write.write_all(b"220 localhost ESMTP\r\n").await.unwrap();
            let mut lines = BufReader::new(read).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                let reply: &[u8] = if line.starts_with("EHLO") {
                    b"250-localhost\r\n250 AUTH PLAIN LOGIN\r\n"
                } else if line.starts_with("QUIT") {
                    b"221 bye\r\n"
                } else {
                    b"535 5.7.8 authentication credentials invalid\r\n"
                };
                if write.write_all(reply).await.is_err() {
                    break;
                }
            }
        });
        port
    }

    #[tokio::test]
    async fn rejected_credentials_are_not_retried() {
        let port = rejecting_server().await;
        let err = plain_transport(port).send(test_message()).await.unwrap_err();
        assert!(err.is_permanent());

        let err = anyhow::Error::new(err).context("SMTP delivery via 127.0.0.1 failed");
        assert!(!is_transient_smtp(&err));
    }

    #[tokio::test]
    async fn refused_connection_is_retried() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let err = plain_transport(port).send(test_message()).await.unwrap_err();
        let err = anyhow::Error::new(err).context("SMTP delivery via 127.0.0.1 failed");
        assert!(is_transient_smtp(&err));
    }

    #[test]
    fn non_smtp_errors_are_not_retried() {
        let err = anyhow::anyhow!("failed to build email message");
        assert!(!is_transient_smtp(&err));
    }
}
