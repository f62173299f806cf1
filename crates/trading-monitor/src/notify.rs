//! Notification sinks.
//!
//! Delivery is best effort: callers log a failed send and carry on.

use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info};
use trading_core::error::NotifyError;
use trading_core::traits::Notifier;

const TWILIO_API: &str = "https://api.twilio.com";

/// Writes notifications to the log. The default sink.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, message: &str) -> Result<(), NotifyError> {
        info!(target: "notification", "{}", message);
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}

/// Twilio credentials and phone numbers.
#[derive(Debug, Clone)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
    pub to_number: String,
}

impl TwilioConfig {
    /// Read every field from the named environment variables.
    pub fn from_env(
        sid_var: &str,
        token_var: &str,
        from_var: &str,
        to_var: &str,
    ) -> Result<Self, NotifyError> {
        let read = |var: &str| {
            std::env::var(var)
                .map_err(|_| NotifyError::Configuration(format!("{} not set", var)))
        };
        Ok(Self {
            account_sid: read(sid_var)?,
            auth_token: read(token_var)?,
            from_number: read(from_var)?,
            to_number: read(to_var)?,
        })
    }
}

/// Sends notifications as SMS through the Twilio REST API.
pub struct TwilioNotifier {
    client: reqwest::Client,
    config: TwilioConfig,
    base_url: String,
}

impl TwilioNotifier {
    pub fn new(config: TwilioConfig, timeout: Duration) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotifyError::Configuration(e.to_string()))?;
        Ok(Self {
            client,
            config,
            base_url: TWILIO_API.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.base_url, self.config.account_sid
        )
    }
}

#[async_trait]
impl Notifier for TwilioNotifier {
    async fn send(&self, message: &str) -> Result<(), NotifyError> {
        let params = [
            ("To", self.config.to_number.as_str()),
            ("From", self.config.from_number.as_str()),
            ("Body", message),
        ];

        let resp = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&params)
            .send()
            .await
            .map_err(|e| NotifyError::Delivery(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(NotifyError::Delivery(format!("{}: {}", status, text)));
        }

        debug!(to = %self.config.to_number, "SMS sent");
        Ok(())
    }

    fn name(&self) -> &str {
        "twilio"
    }
}
