use crate::config::{AppSettings, ConfigError};
use crate::dedup::{DedupOutcome, Deduplicator};
use crate::formatter::{Digest, DigestFormatter, MentionsSection};
use crate::state::{SeenState, StateError, StateStore};
use crate::telegram::{Delivery, TelegramError};
use crate::trends::{detect_change, filter_trends, TrendsStatus};
use crate::x_api::Fetcher;
use chrono::Local;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum MonitorError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Failed to persist state: {0}")]
    State(#[from] StateError),
    #[error("Failed to deliver digest: {0}")]
    Delivery(#[from] TelegramError),
}

/// What a single run ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Nothing new; no message was sent.
    Quiet,
    /// The digest was rendered but only logged.
    DryRun(Digest),
    /// The digest was delivered.
    Delivered(Digest),
}

/// Mention search result for one run.
enum MentionsResult {
    Disabled,
    Fetched(DedupOutcome),
    Unavailable(String),
}

pub struct MonitorService {
    fetcher: Arc<dyn Fetcher>,
    delivery: Arc<dyn Delivery>,
    store: StateStore,
    config: Arc<AppSettings>,
}

impl MonitorService {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        delivery: Arc<dyn Delivery>,
        config: Arc<AppSettings>,
    ) -> Self {
        let store = StateStore::new(config.state_path.clone());
        Self {
            fetcher,
            delivery,
            store,
            config,
        }
    }

    /// Load state, fetch, compute novelty, persist, then deliver.
    ///
    /// A dry run renders the digest without persisting it, so the same items
    /// are still new on the next real run.
    ///
    /// State is saved before delivery: a failed send loses that digest rather
    /// than repeating it on the next run.
    pub async fn run_once(&self) -> Result<RunOutcome, MonitorError> {
        let credentials = self.config.require_credentials()?;
        let state = self.store.load().await;
        info!(
            "Running {:?} variant with {} seen ids on record",
            self.config.variant,
            state.seen_ids.len()
        );

        let trends = self.check_trends(&state).await;
        let mentions = self.check_mentions(&state).await;

        let has_new_mentions = matches!(&mentions, MentionsResult::Fetched(outcome) if outcome.has_new());
        let trends_changed = trends.as_ref().is_some_and(TrendsStatus::is_changed);

        if !has_new_mentions && !trends_changed {
            info!("Nothing new: not sending a message (anti-flood)");
            return Ok(RunOutcome::Quiet);
        }

        let seen_ids = match &mentions {
            MentionsResult::Fetched(outcome) => outcome.seen_ids.clone(),
            // Still cap: the file may come from a variant with a larger window.
            _ => Deduplicator::new(self.config.seen_capacity())
                .remember(&state.seen_ids, std::iter::empty()),
        };
        let next_state = SeenState {
            seen_ids,
            last_trends_hash: trends
                .as_ref()
                .and_then(TrendsStatus::new_hash)
                .map(str::to_string)
                .or(state.last_trends_hash),
        };

        let section = match &mentions {
            MentionsResult::Disabled => MentionsSection::Disabled,
            MentionsResult::Fetched(outcome) => MentionsSection::Found(&outcome.new_items),
            MentionsResult::Unavailable(reason) => MentionsSection::Unavailable(reason),
        };
        let digest = DigestFormatter::from_settings(&self.config).render(
            &Local::now(),
            section,
            trends.as_ref(),
        );
        if digest.truncated {
            warn!(
                "Digest hit the {} character ceiling, {} items left out",
                self.config.max_message_len, digest.omitted_items
            );
        }

        if self.config.dry_run {
            info!("Dry run: digest rendered, state left unchanged and nothing sent");
            return Ok(RunOutcome::DryRun(digest));
        }

        self.store.save(&next_state).await?;

        self.delivery
            .send_message(&credentials.chat_id, &digest.text)
            .await?;
        info!(
            "Sent digest to Telegram: {} new mentions, trends changed: {}",
            digest.rendered_items + digest.omitted_items,
            trends_changed
        );
        Ok(RunOutcome::Delivered(digest))
    }

    async fn check_trends(&self, state: &SeenState) -> Option<TrendsStatus> {
        if !self.config.variant.includes_trends() {
            return None;
        }

        let status = match self.fetcher.fetch_trends(self.config.trends_woeid).await {
            Ok(names) => {
                let filtered =
                    filter_trends(&names, &self.config.trend_keywords, self.config.max_trends);
                debug!("{} of {} trends kept after filtering", filtered.len(), names.len());
                detect_change(filtered, state.last_trends_hash.as_deref())
            }
            Err(e) => {
                warn!("Failed to fetch trends from X: {}", e);
                TrendsStatus::Unavailable {
                    reason: e.to_string(),
                }
            }
        };
        Some(status)
    }

    async fn check_mentions(&self, state: &SeenState) -> MentionsResult {
        if !self.config.variant.includes_mentions() {
            return MentionsResult::Disabled;
        }

        let query = match self.config.search_query() {
            Ok(query) => query,
            Err(e) => return MentionsResult::Unavailable(e.to_string()),
        };

        match self
            .fetcher
            .search_items(&query, self.config.max_results)
            .await
        {
            Ok(items) => {
                let dedup = Deduplicator::new(self.config.seen_capacity());
                let outcome = dedup.dedupe(&items, &state.seen_ids);
                info!(
                    "Fetched {} mentions, {} new",
                    items.len(),
                    outcome.new_items.len()
                );
                MentionsResult::Fetched(outcome)
            }
            Err(e) => {
                warn!("Failed to search mentions on X: {}", e);
                MentionsResult::Unavailable(e.to_string())
            }
        }
    }
}
