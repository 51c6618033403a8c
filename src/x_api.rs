use crate::config::Credentials;
use crate::models::{Item, XSearchResponse, XTrendsPlace};
use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use thiserror::Error;
use tracing::{debug, instrument, warn};
use url::Url;
use urlencoding::encode;

pub const SEARCH_RECENT_PATH: &str = "2/tweets/search/recent";
pub const TRENDS_PLACE_PATH: &str = "1.1/trends/place.json";

#[derive(Error, Debug)]
pub enum XApiError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("API error: {status} - {body}")]
    Api { status: StatusCode, body: String },
    #[error("Rate limited (reset at {reset:?})")]
    RateLimited { reset: Option<i64> },
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),
    #[error("Failed to deserialize response: {0}")]
    Deserialization(reqwest::Error),
}

/// Source of posts and trends.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Recent posts matching `query`, at most `limit` of them.
    async fn search_items(&self, query: &str, limit: u32) -> Result<Vec<Item>, XApiError>;

    /// Trend names for a region, in the API's rank order.
    async fn fetch_trends(&self, woeid: u64) -> Result<Vec<String>, XApiError>;
}

#[derive(Debug)]
pub struct XApiClient {
    client: Client,
    base_url: Url,
    bearer_token: String,
}

impl XApiClient {
    pub fn new(base_url: &str, credentials: &Credentials) -> Result<Self, XApiError> {
        // Keep a trailing slash so joins append instead of replacing the last segment.
        let base_url = if base_url.ends_with('/') {
            Url::parse(base_url)?
        } else {
            Url::parse(&format!("{base_url}/"))?
        };
        Ok(Self {
            client: Client::new(),
            base_url,
            bearer_token: credentials.bearer_token.clone(),
        })
    }

    async fn get(&self, url: Url) -> Result<reqwest::Response, XApiError> {
        debug!("GET {}", url.path());
        let response = self
            .client
            .get(url)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.bearer_token))
            .send()
            .await
            .map_err(XApiError::Request)?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let reset = response
                .headers()
                .get("x-rate-limit-reset")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            warn!("X API rate limit hit, reset at {:?}", reset);
            return Err(XApiError::RateLimited { reset });
        }
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|e| format!("Failed to read error body: {}", e));
            return Err(XApiError::Api { status, body });
        }
        Ok(response)
    }
}

#[async_trait]
impl Fetcher for XApiClient {
    #[instrument(skip(self))]
    async fn search_items(&self, query: &str, limit: u32) -> Result<Vec<Item>, XApiError> {
        let mut url = self.base_url.join(SEARCH_RECENT_PATH)?;
        url.set_query(Some(&format!(
            "query={}&max_results={}&tweet.fields={}",
            encode(query),
            limit.clamp(10, 100),
            encode("created_at,text")
        )));

        let parsed = self
            .get(url)
            .await?
            .json::<XSearchResponse>()
            .await
            .map_err(XApiError::Deserialization)?;

        debug!(
            "Search reported result_count={:?}",
            parsed.meta.as_ref().and_then(|m| m.result_count)
        );
        let items: Vec<Item> = parsed
            .data
            .unwrap_or_default()
            .into_iter()
            .map(Item::from)
            .collect();
        Ok(items)
    }

    #[instrument(skip(self))]
    async fn fetch_trends(&self, woeid: u64) -> Result<Vec<String>, XApiError> {
        let mut url = self.base_url.join(TRENDS_PLACE_PATH)?;
        url.set_query(Some(&format!("id={woeid}")));

        let places = self
            .get(url)
            .await?
            .json::<Vec<XTrendsPlace>>()
            .await
            .map_err(XApiError::Deserialization)?;

        let Some(place) = places.into_iter().next() else {
            return Ok(Vec::new());
        };
        let names: Vec<String> = place.trends.into_iter().map(|t| t.name).collect();
        debug!(
            "Trends endpoint returned {} names as of {:?}",
            names.len(),
            place.as_of
        );
        Ok(names)
    }
}
