use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

use crate::core::config::SmsConfig;
use crate::shared::validation::normalize_mobile;

#[derive(Debug, Error)]
pub enum SmsError {
    #[error("SMS service not configured")]
    NotConfigured,

    #[error("SMS request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("SMS gateway rejected message: {0} - {1}")]
    Rejected(u16, String),
}

#[derive(Debug, Deserialize)]
struct TwilioMessage {
    sid: String,
}

struct TwilioCredentials {
    account_sid: String,
    auth_token: String,
    from_number: String,
}

/// Twilio REST sender.
///
/// When credentials are missing every send fails with `NotConfigured`;
/// in mock mode the message is only logged.
pub struct SmsSender {
    http_client: Client,
    api_base_url: String,
    credentials: Option<TwilioCredentials>,
    mock: bool,
}

impl SmsSender {
    pub fn new(config: &SmsConfig) -> Self {
        let credentials = match (
            &config.account_sid,
            &config.auth_token,
            &config.from_number,
        ) {
            (Some(account_sid), Some(auth_token), Some(from_number)) => Some(TwilioCredentials {
                account_sid: account_sid.clone(),
                auth_token: auth_token.clone(),
                from_number: from_number.clone(),
            }),
            _ => None,
        };

        if !config.is_configured() && !config.mock {
            tracing::warn!("Twilio credentials not configured. SMS will not be sent.");
        }

        Self {
            http_client: Client::new(),
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            credentials,
            mock: config.mock,
        }
    }

    pub fn is_mock(&self) -> bool {
        self.mock
    }

    pub async fn send(&self, to: &str, body: &str) -> Result<(), SmsError> {
        let to = normalize_mobile(to);

        if self.mock {
            tracing::info!("Mock SMS to {}: {}", to, body);
            return Ok(());
        }

        let creds = self.credentials.as_ref().ok_or(SmsError::NotConfigured)?;
        let url = format!(
            "{}/Accounts/{}/Messages.json",
            self.api_base_url, creds.account_sid
        );

        let response = self
            .http_client
            .post(&url)
            .basic_auth(&creds.account_sid, Some(&creds.auth_token))
            .form(&[
                ("To", to.as_str()),
                ("From", creds.from_number.as_str()),
                ("Body", body),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(SmsError::Rejected(status.as_u16(), text));
        }

        let message: TwilioMessage = response.json().await?;
        tracing::info!("SMS sent to {} (sid: {})", to, message.sid);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(mock: bool) -> SmsConfig {
        SmsConfig {
            account_sid: None,
            auth_token: None,
            from_number: None,
            api_base_url: "http://127.0.0.1:1".to_string(),
            mock,
        }
    }

    #[tokio::test]
    async fn test_unconfigured_sender_fails_fast() {
        let sender = SmsSender::new(&config(false));
        assert!(matches!(
            sender.send("09171234567", "hello").await,
            Err(SmsError::NotConfigured)
        ));
    }

    #[tokio::test]
    async fn test_mock_sender_logs_only() {
        let sender = SmsSender::new(&config(true));
        assert!(sender.is_mock());
        assert!(sender.send("09171234567", "hello").await.is_ok());
    }
}
