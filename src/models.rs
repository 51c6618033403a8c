use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A fetched post, normalized from the search response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Item {
    pub id: String,
    pub created_at: Option<DateTime<Utc>>,
    pub text: String,
}

impl Item {
    pub fn new(id: impl Into<String>, created_at: Option<DateTime<Utc>>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            created_at,
            text: text.into(),
        }
    }
}

// X API v2 recent search

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct XSearchResponse {
    pub data: Option<Vec<XTweet>>, // absent when nothing matched
    pub meta: Option<XSearchMeta>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct XSearchMeta {
    pub result_count: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct XTweet {
    pub id: String,
    #[serde(default)]
    pub text: Option<String>,
    pub created_at: Option<String>,
}

impl From<XTweet> for Item {
    fn from(tweet: XTweet) -> Self {
        let created_at = tweet.created_at.as_deref().and_then(|raw| {
            DateTime::parse_from_rfc3339(raw)
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
        });
        Item::new(tweet.id, created_at, tweet.text.unwrap_or_default())
    }
}

// X API v1.1 trends/place

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct XTrendsPlace {
    pub trends: Vec<XTrend>,
    pub as_of: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct XTrend {
    pub name: String,
}

// Telegram Bot API

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelegramSendMessage {
    pub chat_id: String,
    pub text: String,
    pub disable_web_page_preview: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelegramResponse {
    pub ok: bool,
    pub description: Option<String>,
    pub result: Option<TelegramMessage>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelegramMessage {
    pub message_id: i64,
}
