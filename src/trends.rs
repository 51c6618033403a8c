//! Trend filtering and change detection.

use sha2::{Digest, Sha256};
use std::collections::HashSet;

/// Hex characters kept from the SHA-256 digest.
pub const HASH_PREFIX_LEN: usize = 16;

/// How the trend section of a run turned out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrendsStatus {
    /// The filtered list differs from the one last reported.
    Changed { trends: Vec<String>, hash: String },
    /// Same list as last time.
    Unchanged,
    /// The trends endpoint failed; the stored hash stays as it was.
    Unavailable { reason: String },
}

impl TrendsStatus {
    pub fn is_changed(&self) -> bool {
        matches!(self, TrendsStatus::Changed { .. })
    }

    /// Hash to persist, if this run produced a new one.
    pub fn new_hash(&self) -> Option<&str> {
        match self {
            TrendsStatus::Changed { hash, .. } => Some(hash),
            _ => None,
        }
    }
}

/// Keeps trends in API order, drops blanks and repeats, applies keyword
/// matching (case-insensitive substring) and caps the list at `max`.
pub fn filter_trends(names: &[String], keywords: &[String], max: usize) -> Vec<String> {
    let keywords: Vec<String> = keywords.iter().map(|k| k.to_lowercase()).collect();
    let mut seen = HashSet::new();

    names
        .iter()
        .map(|name| name.trim())
        .filter(|name| !name.is_empty())
        .filter(|name| {
            keywords.is_empty() || {
                let lowered = name.to_lowercase();
                keywords.iter().any(|k| lowered.contains(k.as_str()))
            }
        })
        .filter(|name| seen.insert(name.to_string()))
        .take(max)
        .map(str::to_string)
        .collect()
}

/// Order-sensitive digest of a list of strings. Each entry is framed by its
/// byte length so `["ab"]` and `["a", "b"]` hash differently.
pub fn content_hash(entries: &[String]) -> String {
    let mut hasher = Sha256::new();
    hasher.update((entries.len() as u64).to_le_bytes());
    for entry in entries {
        hasher.update((entry.len() as u64).to_le_bytes());
        hasher.update(entry.as_bytes());
    }
    let mut digest = hex::encode(hasher.finalize());
    digest.truncate(HASH_PREFIX_LEN);
    digest
}

/// Compares the current list against the previously stored hash.
pub fn detect_change(current: Vec<String>, previous_hash: Option<&str>) -> TrendsStatus {
    let hash = content_hash(&current);
    if previous_hash == Some(hash.as_str()) {
        TrendsStatus::Unchanged
    } else {
        TrendsStatus::Changed {
            trends: current,
            hash,
        }
    }
}
