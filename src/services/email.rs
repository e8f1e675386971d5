//! Outgoing email for newsletter notices
//!
//! Three providers sit behind the [`Mailer`] trait:
//! - Resend HTTP API (default)
//! - SMTP through lettre
//! - Log only, for development

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use serde::Serialize;
use std::sync::Arc;

use crate::config::{MailProvider, NewsletterConfig, SmtpConfig};

pub const MISSING_RESEND_CONFIG: &str =
    "Missing RESEND_API_KEY or RESEND_FROM_EMAIL in environment.";

/// One rendered message for one recipient
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<()>;
}

/// Build the mailer selected by configuration.
///
/// Fails when the selected provider is missing its credentials.
pub fn create_mailer(config: &NewsletterConfig) -> Result<Arc<dyn Mailer>> {
    match config.provider {
        MailProvider::Resend => {
            let api_key = config.resend_api_key.as_deref().filter(|k| !k.is_empty());
            let from = config.from_email.as_deref().filter(|f| !f.is_empty());
            match (api_key, from) {
                (Some(api_key), Some(from)) => Ok(Arc::new(ResendMailer::new(
                    &config.resend_endpoint,
                    api_key,
                    from,
                ))),
                _ => Err(anyhow!(MISSING_RESEND_CONFIG)),
            }
        }
        MailProvider::Smtp => {
            let from = config
                .from_email
                .as_deref()
                .filter(|f| !f.is_empty())
                .ok_or_else(|| anyhow!("SMTP from address not configured"))?;
            Ok(Arc::new(SmtpMailer::new(&config.smtp, from)?))
        }
        MailProvider::Log => Ok(Arc::new(LogMailer)),
    }
}

#[derive(Serialize)]
struct ResendPayload<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html: &'a str,
    text: &'a str,
}

pub struct ResendMailer {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    from: String,
}

impl ResendMailer {
    pub fn new(endpoint: &str, api_key: &str, from: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
            from: from.to_string(),
        }
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<()> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&ResendPayload {
                from: &self.from,
                to: &email.to,
                subject: &email.subject,
                html: &email.html,
                text: &email.text,
            })
            .send()
            .await
            .context("Failed to reach the Resend API")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Resend error ({}): {}", status.as_u16(), body));
        }
        Ok(())
    }
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig, from: &str) -> Result<Self> {
        if config.host.is_empty() {
            return Err(anyhow!("SMTP host not configured"));
        }

        let builder = if config.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
                .map_err(|e| anyhow!("Failed to create SMTP transport: {}", e))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
        };

        let builder = if config.username.is_empty() {
            builder
        } else {
            builder.credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
        };

        Ok(Self {
            transport: builder.port(config.port).build(),
            from: from.to_string(),
        })
    }

    fn build_message(&self, email: &OutgoingEmail) -> Result<Message> {
        Message::builder()
            .from(self.from.parse().map_err(|e| anyhow!("Invalid from address: {}", e))?)
            .to(email.to.parse().map_err(|e| anyhow!("Invalid to address: {}", e))?)
            .subject(email.subject.clone())
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(email.text.clone()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(email.html.clone()),
                    ),
            )
            .map_err(|e| anyhow!("Failed to build email: {}", e))
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<()> {
        let message = self.build_message(email)?;
        self.transport
            .send(message)
            .await
            .map_err(|e| anyhow!("Failed to send email: {}", e))?;
        Ok(())
    }
}

/// Writes each message to the log instead of delivering it
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<()> {
        tracing::info!(to = %email.to, subject = %email.subject, "Newsletter email (log provider)");
        tracing::debug!("{}", email.text);
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use tokio::sync::Mutex;

    /// Records messages; fails for addresses listed in `fail_for`
    #[derive(Default)]
    pub struct RecordingMailer {
        pub sent: Mutex<Vec<OutgoingEmail>>,
        pub fail_for: Vec<String>,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, email: &OutgoingEmail) -> Result<()> {
            if self.fail_for.contains(&email.to) {
                return Err(anyhow!("Resend error (422): invalid recipient"));
            }
            self.sent.lock().await.push(email.clone());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resend_requires_key_and_sender() {
        let mut config = NewsletterConfig::default();
        let err = create_mailer(&config).err().unwrap();
        assert_eq!(err.to_string(), MISSING_RESEND_CONFIG);

        config.resend_api_key = Some("re_test".to_string());
        assert!(create_mailer(&config).is_err());

        config.from_email = Some("Comic <news@example.com>".to_string());
        assert!(create_mailer(&config).is_ok());
    }

    #[test]
    fn test_smtp_requires_host() {
        let config = NewsletterConfig {
            provider: MailProvider::Smtp,
            from_email: Some("news@example.com".to_string()),
            ..Default::default()
        };
        let err = create_mailer(&config).err().unwrap();
        assert!(err.to_string().contains("SMTP host"));
    }

    #[tokio::test]
    async fn test_smtp_message_is_multipart() {
        let smtp = SmtpConfig {
            host: "localhost".to_string(),
            use_tls: false,
            ..Default::default()
        };
        let mailer = SmtpMailer::new(&smtp, "news@example.com").unwrap();
        let message = mailer
            .build_message(&OutgoingEmail {
                to: "reader@example.com".to_string(),
                subject: "New episode".to_string(),
                html: "<p>Out now</p>".to_string(),
                text: "Out now".to_string(),
            })
            .unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("multipart/alternative"));
        assert!(raw.contains("Subject: New episode"));
    }

    #[tokio::test]
    async fn test_log_mailer_always_succeeds() {
        let config = NewsletterConfig {
            provider: MailProvider::Log,
            ..Default::default()
        };
        let mailer = create_mailer(&config).unwrap();
        let email = OutgoingEmail {
            to: "reader@example.com".to_string(),
            subject: "s".to_string(),
            html: String::new(),
            text: String::new(),
        };
        assert!(mailer.send(&email).await.is_ok());
    }
}
