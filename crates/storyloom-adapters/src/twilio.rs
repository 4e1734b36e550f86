//! SMS delivery through the Twilio Messages API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use storyloom_core::error::DomainError;
use storyloom_core::services::MessageSender;
use tracing::{debug, instrument};

use crate::error::{AdapterError, truncate_body};

/// Default API root.
pub const DEFAULT_API_BASE: &str = "https://api.twilio.com";

const SMS: &str = "sms";

/// Account settings for [`TwilioSender`].
#[derive(Debug, Clone)]
pub struct TwilioConfig {
    /// Account SID, also the basic-auth user.
    pub account_sid: String,
    /// Auth token, the basic-auth password.
    pub auth_token: String,
    /// Sending phone number.
    pub from_number: String,
    /// API root, without a trailing slash.
    pub api_base: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl TwilioConfig {
    /// Settings for the public Twilio endpoint.
    #[must_use]
    pub fn new(
        account_sid: impl Into<String>,
        auth_token: impl Into<String>,
        from_number: impl Into<String>,
    ) -> Self {
        Self {
            account_sid: account_sid.into(),
            auth_token: auth_token.into(),
            from_number: from_number.into(),
            api_base: DEFAULT_API_BASE.to_owned(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// `MessageSender` that sends one SMS per call.
#[derive(Debug, Clone)]
pub struct TwilioSender {
    http: Client,
    config: TwilioConfig,
}

impl TwilioSender {
    /// Builds the sender.
    ///
    /// # Errors
    ///
    /// Returns `AdapterError::ClientSetup` if the TLS backend cannot start.
    pub fn new(config: TwilioConfig) -> Result<Self, AdapterError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(AdapterError::ClientSetup)?;
        Ok(Self { http, config })
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.config.api_base.trim_end_matches('/'),
            self.config.account_sid
        )
    }
}

#[async_trait]
impl MessageSender for TwilioSender {
    #[instrument(skip(self, body), fields(chars = body.len()))]
    async fn send(&self, recipient: &str, body: &str) -> Result<(), DomainError> {
        let form = [
            ("To", recipient),
            ("From", self.config.from_number.as_str()),
            ("Body", body),
        ];
        let response = self
            .http
            .post(self.messages_url())
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&form)
            .send()
            .await
            .map_err(|e| AdapterError::transport(SMS, e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AdapterError::Status {
                service: SMS,
                status: status.as_u16(),
                body: truncate_body(text),
            }
            .into());
        }
        debug!("sms accepted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_url_targets_account() {
        let sender = TwilioSender::new(TwilioConfig::new("AC123", "token", "+15550000")).unwrap();

        assert_eq!(
            sender.messages_url(),
            "https://api.twilio.com/2010-04-01/Accounts/AC123/Messages.json"
        );
    }

    #[test]
    fn test_messages_url_trims_trailing_slash() {
        let mut config = TwilioConfig::new("AC123", "token", "+15550000");
        config.api_base = "http://localhost:4010/".to_owned();
        let sender = TwilioSender::new(config).unwrap();

        assert_eq!(
            sender.messages_url(),
            "http://localhost:4010/2010-04-01/Accounts/AC123/Messages.json"
        );
    }

    #[tokio::test]
    async fn test_unreachable_api_is_retryable_error() {
        // Arrange
        let mut config = TwilioConfig::new("AC123", "token", "+15550000");
        config.api_base = "http://127.0.0.1:9".to_owned();
        config.timeout = Duration::from_secs(2);
        let sender = TwilioSender::new(config).unwrap();

        // Act
        let result = sender.send("+15550001", "hello").await;

        // Assert
        assert!(result.unwrap_err().is_retryable());
    }
}
