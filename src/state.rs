use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum StateError {
    #[error("State I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("State serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// What previous runs already reported.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "StoredState")]
pub struct SeenState {
    /// Identifiers already notified about, oldest first.
    pub seen_ids: Vec<String>,
    /// Digest of the last reported trend list.
    pub last_trends_hash: Option<String>,
}

/// On-disk shape, accepting the field names older tools wrote. Several id
/// lists in one document are merged rather than rejected.
#[derive(Deserialize)]
struct StoredState {
    #[serde(default)]
    seen_ids: Vec<String>,
    #[serde(default, rename = "seenIds")]
    seen_ids_camel: Vec<String>,
    #[serde(default)]
    sent_tweet_ids: Vec<String>,
    #[serde(default, rename = "lastTweetIds")]
    last_tweet_ids: Vec<String>,
    #[serde(default)]
    last_trends_hash: Option<String>,
    #[serde(default, rename = "lastTrendsHash")]
    last_trends_hash_camel: Option<String>,
}

impl From<StoredState> for SeenState {
    fn from(stored: StoredState) -> Self {
        let mut seen_ids = stored.sent_tweet_ids;
        seen_ids.extend(stored.last_tweet_ids);
        seen_ids.extend(stored.seen_ids_camel);
        seen_ids.extend(stored.seen_ids);
        SeenState {
            seen_ids,
            last_trends_hash: stored.last_trends_hash.or(stored.last_trends_hash_camel),
        }
    }
}

impl SeenState {
    /// Drops repeated ids, keeping the first occurrence.
    fn normalized(mut self) -> Self {
        let mut seen = HashSet::with_capacity(self.seen_ids.len());
        self.seen_ids.retain(|id| seen.insert(id.clone()));
        self
    }
}

/// JSON file holding the [`SeenState`] between runs.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Loads the state, substituting an empty one when the file is missing
    /// or cannot be parsed.
    pub async fn load(&self) -> SeenState {
        match self.try_load().await {
            Ok(Some(state)) => {
                debug!(
                    "Loaded state from {} with {} seen ids",
                    self.path.display(),
                    state.seen_ids.len()
                );
                state.normalized()
            }
            Ok(None) => {
                debug!("No state file at {}, starting fresh", self.path.display());
                SeenState::default()
            }
            Err(e) => {
                warn!("Failed to read state, recreating it: {}", e);
                SeenState::default()
            }
        }
    }

    async fn try_load(&self) -> Result<Option<SeenState>, StateError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StateError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    /// Writes the state atomically: temp file in the same directory, then rename.
    pub async fn save(&self, state: &SeenState) -> Result<(), StateError> {
        let bytes = serde_json::to_vec_pretty(state)?;
        let io_err = |source| StateError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }

        let tmp = self.path.with_extension("json.tmp");
        if let Err(source) = write_and_replace(&tmp, &self.path, &bytes).await {
            if let Err(e) = tokio::fs::remove_file(&tmp).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!("Failed to remove {}: {}", tmp.display(), e);
                }
            }
            return Err(io_err(source));
        }
        debug!(
            "Saved state to {} with {} seen ids",
            self.path.display(),
            state.seen_ids.len()
        );
        Ok(())
    }
}

async fn write_and_replace(tmp: &Path, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::File::create(tmp).await?;
    file.write_all(bytes).await?;
    file.flush().await?;
    file.sync_all().await?;
    drop(file);
    tokio::fs::rename(tmp, path).await
}
