//! Renders the digest message under a hard length ceiling.
//!
//! Lengths are counted in `char`s. The ceiling holds for every input: before a
//! block is appended, room is kept for the omission marker that would follow
//! it, so the marker always fits when the next block does not.

use chrono::{DateTime, TimeZone};
use std::fmt::Display;

use crate::config::AppSettings;
use crate::models::Item;
use crate::trends::TrendsStatus;

const ELLIPSIS: char = '…';
const MAX_REASON_LEN: usize = 200;

/// Mention part of a digest.
#[derive(Debug, Clone, Copy)]
pub enum MentionsSection<'a> {
    /// The variant does not search mentions.
    Disabled,
    /// New items found this run (may be empty).
    Found(&'a [Item]),
    /// The search failed.
    Unavailable(&'a str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digest {
    pub text: String,
    pub rendered_items: usize,
    pub omitted_items: usize,
    pub truncated: bool,
}

#[derive(Debug, Clone)]
pub struct DigestFormatter {
    max_len: usize,
    text_trim: usize,
    permalink_template: String,
}

struct Block {
    text: String,
    is_item: bool,
}

impl DigestFormatter {
    pub fn new(max_len: usize, text_trim: usize, permalink_template: impl Into<String>) -> Self {
        Self {
            max_len,
            text_trim,
            permalink_template: permalink_template.into(),
        }
    }

    pub fn from_settings(settings: &AppSettings) -> Self {
        Self::new(
            settings.max_message_len,
            settings.text_trim,
            settings.permalink_template.clone(),
        )
    }

    pub fn permalink(&self, id: &str) -> String {
        self.permalink_template
            .replace("{id}", &urlencoding::encode(id))
    }

    /// Collapses line breaks, trims, and cuts at `text_trim` characters with
    /// an ellipsis. The cut is by character count, not at a word boundary.
    pub fn clean_text(&self, text: &str) -> String {
        clip(&collapse_lines(text), self.text_trim)
    }

    pub fn render<Tz>(
        &self,
        now: &DateTime<Tz>,
        mentions: MentionsSection<'_>,
        trends: Option<&TrendsStatus>,
    ) -> Digest
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        let mut header = format!("📡 X Monitor — {}\n", now.format("%d/%m/%Y %H:%M"));
        if let MentionsSection::Found(items) = mentions {
            header.push_str(&format!("🗣️ New mentions: {}\n", items.len()));
        }
        header.push('\n');

        let mut blocks = Vec::new();
        if let Some(status) = trends {
            self.trend_blocks(status, &mut blocks);
        }
        match mentions {
            MentionsSection::Disabled => {}
            MentionsSection::Unavailable(reason) => blocks.push(Block {
                text: format!("⚠️ Mentions unavailable: {}\n\n", clip(reason, MAX_REASON_LEN)),
                is_item: false,
            }),
            MentionsSection::Found(items) => {
                let tz = now.timezone();
                let mut sorted: Vec<&Item> = items.iter().collect();
                // Stable sort: newest first, undated last, fetch order on ties.
                sorted.sort_by(|a, b| b.created_at.cmp(&a.created_at));
                for item in sorted {
                    blocks.push(Block {
                        text: self.item_line(item, &tz),
                        is_item: true,
                    });
                }
            }
        }

        let total_items = blocks.iter().filter(|b| b.is_item).count();
        // items_from[i] = item blocks at index i and after
        let mut items_from = vec![0usize; blocks.len() + 1];
        for i in (0..blocks.len()).rev() {
            items_from[i] = items_from[i + 1] + usize::from(blocks[i].is_item);
        }

        let mut buf = String::new();
        let mut used = 0usize;
        let mut rendered_items = 0usize;
        let mut truncated = false;

        let header_reserve = if blocks.is_empty() {
            0
        } else {
            char_len(&omission_marker(total_items))
        };
        if char_len(&header) + header_reserve <= self.max_len {
            used += char_len(&header);
            buf.push_str(&header);
        } else {
            // Only reachable with a ceiling below the header size.
            truncated = true;
        }

        if !truncated {
            for (i, block) in blocks.iter().enumerate() {
                let is_last = i + 1 == blocks.len();
                let reserve = if is_last {
                    0
                } else {
                    char_len(&omission_marker(items_from[i + 1]))
                };
                let len = char_len(&block.text);

                if used + len + reserve > self.max_len {
                    buf.push_str(&omission_marker(items_from[i]));
                    truncated = true;
                    break;
                }

                used += len;
                buf.push_str(&block.text);
                if block.is_item {
                    rendered_items += 1;
                }
            }
        }

        let mut text = buf.trim().to_string();
        if char_len(&text) > self.max_len || (truncated && text.is_empty()) {
            text = String::new();
            if self.max_len > 0 {
                let cut: String = header.chars().take(self.max_len - 1).collect();
                text.push_str(cut.trim_end());
                text.push(ELLIPSIS);
            }
        }

        Digest {
            text,
            rendered_items,
            omitted_items: total_items - rendered_items,
            truncated,
        }
    }

    fn trend_blocks(&self, status: &TrendsStatus, blocks: &mut Vec<Block>) {
        let mut push = |text: String| blocks.push(Block { text, is_item: false });
        match status {
            TrendsStatus::Changed { trends, .. } if trends.is_empty() => {
                push("🔥 Trends changed: none match right now\n\n".to_string());
            }
            TrendsStatus::Changed { trends, .. } => {
                push("🔥 Trends (changed):\n".to_string());
                let last = trends.len() - 1;
                for (i, name) in trends.iter().enumerate() {
                    let tail = if i == last { "\n\n" } else { "\n" };
                    push(format!("{}. {}{}", i + 1, collapse_lines(name), tail));
                }
            }
            TrendsStatus::Unchanged => {
                push("🔥 Trends: no change since last run\n\n".to_string());
            }
            TrendsStatus::Unavailable { reason } => {
                push(format!(
                    "⚠️ Trends unavailable: {}\n\n",
                    clip(reason, MAX_REASON_LEN)
                ));
            }
        }
    }

    fn item_line<Tz>(&self, item: &Item, tz: &Tz) -> String
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        let text = self.clean_text(&item.text);
        let url = self.permalink(&item.id);
        match item.created_at {
            Some(created_at) => format!(
                "• {} — {}\n  🔗 {}\n\n",
                created_at.with_timezone(tz).format("%d/%m %H:%M"),
                text,
                url
            ),
            None => format!("• {}\n  🔗 {}\n\n", text, url),
        }
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn collapse_lines(text: &str) -> String {
    text.replace("\r\n", " ")
        .replace(['\n', '\r'], " ")
        .trim()
        .to_string()
}

/// Keeps the first `limit` chars and appends an ellipsis when anything was cut.
fn clip(text: &str, limit: usize) -> String {
    if char_len(text) <= limit {
        return text.to_string();
    }
    let mut clipped: String = text.chars().take(limit).collect();
    clipped.push(ELLIPSIS);
    clipped
}

fn omission_marker(omitted_items: usize) -> String {
    if omitted_items == 0 {
        format!("{ELLIPSIS}\n")
    } else {
        format!("{ELLIPSIS} +{omitted_items} more not shown\n")
    }
}
