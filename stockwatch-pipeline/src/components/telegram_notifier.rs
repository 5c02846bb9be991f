use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::config::BotCredentials;
use crate::error::{PipelineError, PipelineResult};
use crate::notifier::{Notifier, OutboundMessage};

/// Posts messages to a Telegram-compatible bot API:
/// `POST {api_base}/bot{token}/sendMessage` with
/// `{"chat_id", "text", "parse_mode": "Markdown"}`.
pub struct TelegramNotifier {
    client: reqwest::Client,
    endpoint: String,
    chat_id: String,
    timeout: Duration,
}

#[derive(Serialize)]
struct SendMessageBody<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
}

impl TelegramNotifier {
    pub fn new(
        api_base: &str,
        credentials: &BotCredentials,
        timeout: Duration,
    ) -> PipelineResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PipelineError::Delivery(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            endpoint: format!(
                "{}/bot{}/sendMessage",
                api_base.trim_end_matches('/'),
                credentials.token
            ),
            chat_id: credentials.chat_id.clone(),
            timeout,
        })
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, message: &OutboundMessage) -> PipelineResult<()> {
        let body = SendMessageBody {
            chat_id: &self.chat_id,
            text: &message.text,
            parse_mode: "Markdown",
        };
        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PipelineError::Timeout(self.timeout)
                } else {
                    // Strip the URL: it embeds the bot token.
                    PipelineError::Delivery(e.without_url().to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::Delivery(format!(
                "messaging endpoint returned {}",
                status
            )));
        }
        log::debug!("transaction_id={} alert delivered", message.transaction_id);
        Ok(())
    }
}
