use clap::{Parser, ValueEnum};
use std::fmt::Debug;
use std::path::PathBuf;
use thiserror::Error;

/// Upper bound Telegram accepts for a single message.
pub const TELEGRAM_HARD_LIMIT: usize = 4096;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingCredential(&'static str),
    #[error("No search query configured: set X_QUERY, or X_HANDLE / X_TERMS")]
    MissingQuery,
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Which data sources a run pulls from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Variant {
    /// Mention search only
    #[default]
    Mentions,
    /// Trending topics only
    Trends,
    /// Trending topics plus mention search
    Combined,
}

impl Variant {
    pub fn includes_mentions(self) -> bool {
        matches!(self, Variant::Mentions | Variant::Combined)
    }

    pub fn includes_trends(self) -> bool {
        matches!(self, Variant::Trends | Variant::Combined)
    }

    /// How many seen ids the state keeps when no explicit capacity is set.
    pub fn default_seen_capacity(self) -> usize {
        match self {
            Variant::Mentions => 400,
            Variant::Trends | Variant::Combined => 200,
        }
    }
}

#[derive(Debug, Clone, Parser, Default)]
#[command(
    author,
    version,
    about = "Polls X mentions and trends and sends a Telegram digest of what is new"
)]
pub struct AppSettings {
    /// Data sources to query on this run
    #[arg(long, env = "XMONITOR_VARIANT", value_enum, default_value_t = Variant::Mentions)]
    pub variant: Variant,

    /// X API bearer token
    #[arg(long, env = "TWITTER_BEARER_TOKEN", hide_env_values = true)]
    pub twitter_bearer_token: Option<String>,

    /// Telegram bot token
    #[arg(long, env = "TELEGRAM_BOT_TOKEN", hide_env_values = true)]
    pub telegram_bot_token: Option<String>,

    /// Telegram chat that receives the digest
    #[arg(long, env = "TELEGRAM_CHAT_ID")]
    pub telegram_chat_id: Option<String>,

    /// Full search query; overrides X_HANDLE / X_TERMS
    #[arg(long, env = "X_QUERY")]
    pub query: Option<String>,

    /// Account handle to watch (without @)
    #[arg(long, env = "X_HANDLE")]
    pub handle: Option<String>,

    /// Comma-separated extra search terms (names, nicknames)
    #[arg(long, env = "X_TERMS", value_delimiter = ',')]
    pub terms: Vec<String>,

    /// Keep retweets in search results
    #[arg(long, env = "X_INCLUDE_RETWEETS")]
    pub include_retweets: bool,

    /// Maximum number of posts requested per search (API accepts 10-100)
    #[arg(long, env = "MAX_TWEETS", default_value_t = 20)]
    pub max_results: u32,

    /// Maximum characters of post text shown per item
    #[arg(long, env = "TEXT_TRIM", default_value_t = 220)]
    pub text_trim: usize,

    /// Maximum characters per delivered message
    #[arg(long, env = "MAX_MESSAGE_LEN", default_value_t = 3900)]
    pub max_message_len: usize,

    /// Number of seen ids kept in the state file (defaults per variant)
    #[arg(long, env = "SEEN_CAPACITY")]
    pub seen_capacity: Option<usize>,

    /// Location of the persisted state document
    #[arg(long, env = "STATE_PATH", default_value = ".cache/xmonitor_state.json")]
    pub state_path: PathBuf,

    /// Yahoo WOEID of the trends region
    #[arg(long, env = "TRENDS_WOEID", default_value_t = 23424768)]
    pub trends_woeid: u64,

    /// Comma-separated keywords a trend must contain to be reported (empty keeps all)
    #[arg(long, env = "TREND_KEYWORDS", value_delimiter = ',')]
    pub trend_keywords: Vec<String>,

    /// Maximum number of trends listed
    #[arg(long, env = "MAX_TRENDS", default_value_t = 20)]
    pub max_trends: usize,

    /// Permalink template; `{id}` is replaced with the post id
    #[arg(
        long,
        env = "PERMALINK_TEMPLATE",
        default_value = "https://x.com/i/web/status/{id}"
    )]
    pub permalink_template: String,

    /// X API base URL
    #[arg(long, env = "X_API_URL", default_value = "https://api.x.com")]
    pub x_api_url: String,

    /// Telegram Bot API base URL
    #[arg(long, env = "TELEGRAM_API_URL", default_value = "https://api.telegram.org")]
    pub telegram_api_url: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "XMONITOR_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Render and print the digest without sending it or updating the state file
    #[arg(long, env = "XMONITOR_DRY_RUN")]
    pub dry_run: bool,
}

/// Credentials checked before any network call.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub bearer_token: String,
    pub bot_token: String,
    pub chat_id: String,
}

impl AppSettings {
    pub fn seen_capacity(&self) -> usize {
        self.seen_capacity
            .unwrap_or_else(|| self.variant.default_seen_capacity())
    }

    /// Returns the three credentials, failing on the first absent or empty one.
    pub fn require_credentials(&self) -> Result<Credentials, ConfigError> {
        Ok(Credentials {
            bearer_token: require("TWITTER_BEARER_TOKEN", &self.twitter_bearer_token)?,
            bot_token: require("TELEGRAM_BOT_TOKEN", &self.telegram_bot_token)?,
            chat_id: require("TELEGRAM_CHAT_ID", &self.telegram_chat_id)?,
        })
    }

    /// The mention search query, built from handle and terms unless given verbatim.
    pub fn search_query(&self) -> Result<String, ConfigError> {
        if let Some(query) = self.query.as_deref().map(str::trim) {
            if !query.is_empty() {
                return Ok(query.to_string());
            }
        }
        build_query(
            self.handle.as_deref(),
            &self.terms,
            self.include_retweets,
        )
        .ok_or(ConfigError::MissingQuery)
    }
}

fn require(name: &'static str, value: &Option<String>) -> Result<String, ConfigError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(ConfigError::MissingCredential(name)),
    }
}

/// Builds `("term" OR @handle OR "handle") -is:retweet`.
pub fn build_query(handle: Option<&str>, terms: &[String], include_retweets: bool) -> Option<String> {
    let mut clauses: Vec<String> = terms
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .map(|t| {
            if t.contains(' ') {
                format!("\"{t}\"")
            } else {
                t.to_string()
            }
        })
        .collect();

    if let Some(handle) = handle.map(|h| h.trim().trim_start_matches('@')) {
        if !handle.is_empty() {
            clauses.push(format!("@{handle}"));
            clauses.push(format!("\"{handle}\""));
        }
    }

    if clauses.is_empty() {
        return None;
    }

    let mut query = format!("({})", clauses.join(" OR "));
    if !include_retweets {
        query.push_str(" -is:retweet");
    }
    Some(query)
}

fn validate_max_results(value: u32) -> u32 {
    const MIN_RESULTS: u32 = 10;
    const MAX_RESULTS: u32 = 100;
    value.clamp(MIN_RESULTS, MAX_RESULTS)
}

fn validate_text_trim(value: usize) -> Result<usize, String> {
    const MAX_TRIM: usize = 1000;

    if value == 0 {
        Err("text_trim must be at least 1".to_string())
    } else if value > MAX_TRIM {
        Err(format!("text_trim must be at most {MAX_TRIM}, got {value}"))
    } else {
        Ok(value)
    }
}

fn validate_max_message_len(value: usize) -> Result<usize, String> {
    const MIN_LEN: usize = 200;

    if value < MIN_LEN {
        Err(format!("max_message_len must be at least {MIN_LEN}, got {value}"))
    } else if value > TELEGRAM_HARD_LIMIT {
        Err(format!(
            "max_message_len must be at most {TELEGRAM_HARD_LIMIT}, got {value}"
        ))
    } else {
        Ok(value)
    }
}

fn validate_permalink_template(value: &str) -> Result<(), String> {
    if value.contains("{id}") {
        Ok(())
    } else {
        Err(format!(
            "permalink_template must contain an {{id}} placeholder, got '{value}'"
        ))
    }
}

/// Checks ranges and normalizes values on already-parsed settings.
pub fn validate(mut app_settings: AppSettings) -> Result<AppSettings, ConfigError> {
    app_settings.max_results = validate_max_results(app_settings.max_results);
    app_settings.text_trim =
        validate_text_trim(app_settings.text_trim).map_err(ConfigError::Invalid)?;
    app_settings.max_message_len =
        validate_max_message_len(app_settings.max_message_len).map_err(ConfigError::Invalid)?;
    validate_permalink_template(&app_settings.permalink_template)
        .map_err(ConfigError::Invalid)?;

    if app_settings.seen_capacity == Some(0) {
        return Err(ConfigError::Invalid(
            "seen_capacity must be at least 1".to_string(),
        ));
    }

    app_settings.trend_keywords = app_settings
        .trend_keywords
        .into_iter()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .collect();

    if app_settings.variant.includes_mentions() {
        app_settings.search_query()?;
    }

    Ok(app_settings)
}
