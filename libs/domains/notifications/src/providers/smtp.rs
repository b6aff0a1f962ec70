//! SMTP email sender using lettre.
//!
//! Defaults target MailHog/Mailpit style development servers; production
//! servers get TLS and credentials via the config.

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::{debug, error};

use crate::error::{NotificationError, NotificationResult};
use crate::sender::EmailSender;

#[derive(Clone, Debug)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub from_email: String,
    pub from_name: String,
    pub username: Option<String>,
    pub password: Option<String>,
    /// False for local dev servers.
    pub use_tls: bool,
}

impl SmtpConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            from_email: "noreply@localhost".to_string(),
            from_name: "Tasks".to_string(),
            username: None,
            password: None,
            use_tls: false,
        }
    }

    /// Configuration from environment variables, defaulting to a local
    /// MailHog/Mailpit instance.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("SMTP_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(1025),
            from_email: std::env::var("SMTP_FROM_EMAIL")
                .unwrap_or_else(|_| "noreply@localhost".to_string()),
            from_name: std::env::var("SMTP_FROM_NAME").unwrap_or_else(|_| "Tasks".to_string()),
            username: std::env::var("SMTP_USERNAME").ok(),
            password: std::env::var("SMTP_PASSWORD").ok(),
            use_tls: std::env::var("SMTP_USE_TLS")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        }
    }

    pub fn with_sender(mut self, from_email: impl Into<String>, from_name: impl Into<String>) -> Self {
        self.from_email = from_email.into();
        self.from_name = from_name.into();
        self
    }

    pub fn with_credentials(mut self, username: String, password: String) -> Self {
        self.username = Some(username);
        self.password = Some(password);
        self
    }

    pub fn with_tls(mut self, use_tls: bool) -> Self {
        self.use_tls = use_tls;
        self
    }
}

/// [`EmailSender`] over an async SMTP transport.
pub struct SmtpSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    config: SmtpConfig,
}

impl SmtpSender {
    pub fn new(config: SmtpConfig) -> NotificationResult<Self> {
        let transport = Self::build_transport(&config)?;
        Ok(Self { transport, config })
    }

    fn build_transport(
        config: &SmtpConfig,
    ) -> NotificationResult<AsyncSmtpTransport<Tokio1Executor>> {
        let mut builder = if config.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
                .map_err(|e| {
                    NotificationError::Provider(format!("Failed to create SMTP relay: {e}"))
                })?
                .port(config.port)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host).port(config.port)
        };

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(builder.build())
    }

    fn build_message(
        &self,
        to_email: &str,
        to_name: &str,
        subject: &str,
        body: &str,
    ) -> NotificationResult<Message> {
        let from: Mailbox = format!("{} <{}>", self.config.from_name, self.config.from_email)
            .parse()
            .map_err(|e| NotificationError::Provider(format!("Invalid from address: {e}")))?;

        let to: Mailbox = if to_name.is_empty() {
            to_email.parse()
        } else {
            format!("{to_name} <{to_email}>").parse()
        }
        .map_err(|e| NotificationError::Provider(format!("Invalid to address: {e}")))?;

        Message::builder()
            .from(from)
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| NotificationError::Provider(format!("Failed to build message: {e}")))
    }
}

#[async_trait]
impl EmailSender for SmtpSender {
    async fn send_email(
        &self,
        to_email: &str,
        to_name: &str,
        subject: &str,
        body: &str,
    ) -> NotificationResult<()> {
        debug!(to = %to_email, subject, host = %self.config.host, "Sending email via SMTP");

        let message = self.build_message(to_email, to_name, subject, body)?;
        self.transport.send(message).await.map_err(|e| {
            error!(to = %to_email, error = %e, "SMTP send failed");
            NotificationError::Provider(format!("SMTP send failed: {e}"))
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_message_with_and_without_name() {
        let sender = SmtpSender::new(SmtpConfig::new("localhost", 1025)).unwrap();

        assert!(sender
            .build_message("ada@example.com", "Ada", "Subject", "Body")
            .is_ok());
        assert!(sender
            .build_message("ada@example.com", "", "Subject", "Body")
            .is_ok());
        assert!(sender
            .build_message("not-an-address", "", "Subject", "Body")
            .is_err());
    }

    #[tokio::test]
    #[ignore] // Requires a local SMTP server (MailHog/Mailpit)
    async fn test_send_email() {
        let sender = SmtpSender::new(SmtpConfig::from_env()).unwrap();
        sender
            .send_email("ada@example.com", "Ada", "Test", "Hello from the tests")
            .await
            .unwrap();
    }
}
