use crate::config::Credentials;
use crate::models::{TelegramResponse, TelegramSendMessage};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

#[derive(Error, Debug)]
pub enum TelegramError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Telegram API error: {status} - {description}")]
    Api {
        status: StatusCode,
        description: String,
    },
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),
}

/// Where the digest goes.
#[async_trait]
pub trait Delivery: Send + Sync {
    async fn send_message(&self, chat_id: &str, text: &str) -> Result<(), TelegramError>;
}

pub struct TelegramClient {
    client: Client,
    send_message_url: Url,
}

// The URL embeds the bot token; keep it out of Debug output and error messages.
impl std::fmt::Debug for TelegramClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramClient").finish_non_exhaustive()
    }
}

impl TelegramClient {
    pub fn new(base_url: &str, credentials: &Credentials) -> Result<Self, TelegramError> {
        // Formatted rather than joined: "bot<id>:<secret>" would parse as a scheme.
        let send_message_url = Url::parse(&format!(
            "{}/bot{}/sendMessage",
            base_url.trim_end_matches('/'),
            credentials.bot_token
        ))?;
        Ok(Self {
            client: Client::new(),
            send_message_url,
        })
    }
}

#[async_trait]
impl Delivery for TelegramClient {
    #[instrument(skip(self, text), fields(len = text.chars().count()))]
    async fn send_message(&self, chat_id: &str, text: &str) -> Result<(), TelegramError> {
        let payload = TelegramSendMessage {
            chat_id: chat_id.to_string(),
            text: text.to_string(),
            disable_web_page_preview: true,
        };

        let response = self
            .client
            .post(self.send_message_url.clone())
            .json(&payload)
            .send()
            .await
            .map_err(|e| TelegramError::Request(e.without_url()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TelegramError::Request(e.without_url()))?;
        let parsed = serde_json::from_str::<TelegramResponse>(&body).ok();

        match parsed {
            Some(resp) if status.is_success() && resp.ok => {
                debug!(
                    "Telegram accepted message {:?}",
                    resp.result.map(|m| m.message_id)
                );
                Ok(())
            }
            other => {
                let description = other
                    .and_then(|r| r.description)
                    .unwrap_or(body);
                Err(TelegramError::Api {
                    status,
                    description,
                })
            }
        }
    }
}
