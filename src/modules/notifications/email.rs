use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;

use crate::core::config::SmtpConfig;

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("Email configuration error: {0}")]
    Config(String),

    #[error("Failed to build email: {0}")]
    Build(#[from] lettre::error::Error),

    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

/// Outgoing email message
#[derive(Debug, Clone)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

/// SMTP sender. In mock mode messages are logged instead of sent.
pub struct EmailSender {
    from: Mailbox,
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
}

impl EmailSender {
    pub fn new(config: &SmtpConfig) -> Result<Self, EmailError> {
        let from = format!("{} <{}>", config.from_name, config.from_email)
            .parse::<Mailbox>()
            .map_err(|e| EmailError::Config(format!("Invalid from address: {}", e)))?;

        if config.mock {
            tracing::info!("Email sender running in mock mode");
            return Ok(Self {
                from,
                transport: None,
            });
        }

        let creds = Credentials::new(config.username.clone(), config.password.clone());
        let transport = if config.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)?
                .credentials(creds)
                .port(config.port)
                .build()
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
                .credentials(creds)
                .port(config.port)
                .build()
        };

        Ok(Self {
            from,
            transport: Some(transport),
        })
    }

    /// Sender that only logs
    #[cfg(test)]
    pub fn mock(from: Mailbox) -> Self {
        Self {
            from,
            transport: None,
        }
    }

    pub fn is_mock(&self) -> bool {
        self.transport.is_none()
    }

    pub fn build_message(&self, email: &Email) -> Result<Message, EmailError> {
        let to = email
            .to
            .parse::<Mailbox>()
            .map_err(|e| EmailError::Config(format!("Invalid recipient address: {}", e)))?;

        Ok(Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(email.subject.clone())
            .multipart(MultiPart::alternative_plain_html(
                email.text.clone(),
                email.html.clone(),
            ))?)
    }

    pub async fn send(&self, email: &Email) -> Result<(), EmailError> {
        let message = self.build_message(email)?;

        match &self.transport {
            Some(transport) => {
                transport.send(message).await?;
                tracing::info!("Email sent to {}: {}", email.to, email.subject);
            }
            None => {
                tracing::info!(
                    "Mock email to {}: {}\n{}",
                    email.to,
                    email.subject,
                    email.text
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sender() -> EmailSender {
        EmailSender::mock("Bien Unido <noreply@bienunido.test>".parse().unwrap())
    }

    fn email(to: &str) -> Email {
        Email {
            to: to.to_string(),
            subject: "Verify Your Email Address".to_string(),
            text: "Your code is 123456".to_string(),
            html: "<p>Your code is 123456</p>".to_string(),
        }
    }

    #[test]
    fn test_build_message_rejects_bad_recipient() {
        assert!(matches!(
            sender().build_message(&email("not an address")),
            Err(EmailError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_mock_send_succeeds() {
        let sender = sender();
        assert!(sender.is_mock());
        assert!(sender.send(&email("maria@example.com")).await.is_ok());
    }
}
