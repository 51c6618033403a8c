//! Novelty detection against the persisted seen set.

use std::collections::HashSet;

use crate::models::Item;

/// Result of comparing a fetch against the seen set.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DedupOutcome {
    /// Items not seen before, in fetch order.
    pub new_items: Vec<Item>,
    /// The seen set to persist: previous ids plus the new ones, capped.
    pub seen_ids: Vec<String>,
}

impl DedupOutcome {
    pub fn has_new(&self) -> bool {
        !self.new_items.is_empty()
    }
}

/// Compares fetched items with the seen ids, keeping a bounded window.
#[derive(Debug, Clone, Copy)]
pub struct Deduplicator {
    capacity: usize,
}

impl Deduplicator {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
        }
    }

    /// Only the item id is compared; two posts with the same text are distinct.
    /// A repeated id inside one fetch counts once.
    pub fn dedupe(&self, fetched: &[Item], seen_ids: &[String]) -> DedupOutcome {
        let mut known: HashSet<&str> = seen_ids.iter().map(String::as_str).collect();

        let mut new_items = Vec::new();
        for item in fetched {
            if known.insert(item.id.as_str()) {
                new_items.push(item.clone());
            }
        }

        let new_ids = new_items.iter().map(|item| item.id.clone());
        let seen_ids = self.remember(seen_ids, new_ids);

        DedupOutcome {
            new_items,
            seen_ids,
        }
    }

    /// Appends `new_ids` and evicts from the front until the window fits.
    pub fn remember(
        &self,
        seen_ids: &[String],
        new_ids: impl IntoIterator<Item = String>,
    ) -> Vec<String> {
        let mut ids: Vec<String> = seen_ids.to_vec();
        ids.extend(new_ids);
        if ids.len() > self.capacity {
            let overflow = ids.len() - self.capacity;
            ids.drain(..overflow);
        }
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, text: &str) -> Item {
        Item::new(id, None, text)
    }

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_new_items_are_set_difference_in_fetch_order() {
        let dedup = Deduplicator::new(400);
        let fetched = vec![item("2", "old"), item("3", "hello\nworld")];

        let outcome = dedup.dedupe(&fetched, &ids(&["1", "2"]));

        assert_eq!(outcome.new_items, vec![item("3", "hello\nworld")]);
        assert_eq!(outcome.seen_ids, ids(&["1", "2", "3"]));
    }

    #[test]
    fn test_second_pass_yields_nothing_new() {
        let dedup = Deduplicator::new(400);
        let fetched = vec![item("10", "a"), item("11", "b")];

        let first = dedup.dedupe(&fetched, &[]);
        assert_eq!(first.new_items.len(), 2);

        let second = dedup.dedupe(&fetched, &first.seen_ids);
        assert!(!second.has_new());
        assert_eq!(second.seen_ids, first.seen_ids);
    }

    #[test]
    fn test_window_evicts_oldest_insertions() {
        let dedup = Deduplicator::new(400);
        let existing: Vec<String> = (0..400).map(|i| format!("old-{i}")).collect();
        let fetched: Vec<Item> = (0..5).map(|i| item(&format!("new-{i}"), "x")).collect();

        let outcome = dedup.dedupe(&fetched, &existing);

        assert_eq!(outcome.new_items.len(), 5);
        assert_eq!(outcome.seen_ids.len(), 400);
        assert_eq!(outcome.seen_ids[0], "old-5");
        assert_eq!(outcome.seen_ids[399], "new-4");
        assert!(!outcome.seen_ids.contains(&"old-4".to_string()));
    }

    #[test]
    fn test_duplicate_ids_within_fetch_count_once() {
        let dedup = Deduplicator::new(10);
        let fetched = vec![item("5", "first"), item("5", "again"), item("6", "other")];

        let outcome = dedup.dedupe(&fetched, &[]);

        assert_eq!(outcome.new_items, vec![item("5", "first"), item("6", "other")]);
        assert_eq!(outcome.seen_ids, ids(&["5", "6"]));
    }

    #[test]
    fn test_oversized_previous_state_is_trimmed() {
        let dedup = Deduplicator::new(3);
        let outcome = dedup.dedupe(&[], &ids(&["a", "b", "c", "d", "e"]));
        assert_eq!(outcome.seen_ids, ids(&["c", "d", "e"]));
    }

    #[test]
    fn test_more_new_items_than_capacity() {
        let dedup = Deduplicator::new(2);
        let fetched = vec![item("1", ""), item("2", ""), item("3", "")];

        let outcome = dedup.dedupe(&fetched, &ids(&["0"]));

        assert_eq!(outcome.new_items.len(), 3);
        assert_eq!(outcome.seen_ids, ids(&["2", "3"]));
    }
}
