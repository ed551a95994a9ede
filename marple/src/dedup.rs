//! Cross-engine de-duplication of collected records.

use std::collections::HashMap;

use crate::search::urls::normalize_key;
use crate::search::ResultRecord;

/// Collapses records pointing at the same target.
///
/// The first record seen for a normalized URL is canonical. Later duplicates
/// are dropped after their engines are merged into the canonical record's
/// provenance. Output order is first-occurrence order.
#[derive(Debug, Clone, Copy, Default)]
pub struct Deduplicator;

impl Deduplicator {
    /// Creates a new deduplicator.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Returns the unique records of `records`.
    #[must_use]
    pub fn dedupe(&self, records: &[ResultRecord]) -> Vec<ResultRecord> {
        let mut positions: HashMap<String, usize> = HashMap::with_capacity(records.len());
        let mut unique: Vec<ResultRecord> = Vec::new();

        for record in records {
            let key = normalize_key(&record.url);
            if let Some(&index) = positions.get(&key) {
                unique[index].merge_provenance(record);
            } else {
                let mut canonical = record.clone();
                if canonical.sources.is_empty() {
                    canonical.sources.push(canonical.source.clone());
                }
                positions.insert(key, unique.len());
                unique.push(canonical);
            }
        }

        unique
    }

    /// The key two records must share to be considered duplicates.
    #[must_use]
    pub fn key(&self, record: &ResultRecord) -> String {
        normalize_key(&record.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record(source: &str, url: &str, title: &str) -> ResultRecord {
        ResultRecord::new(source, url, title)
    }

    #[test]
    fn test_dedupe_merges_provenance() {
        let records = vec![
            record("duckduckgo", "https://example.com/alice", "Alice - Example"),
            record("bing", "https://example.com/alice", "alice on Example"),
        ];

        let unique = Deduplicator::new().dedupe(&records);
        assert_eq!(unique.len(), 1);
        assert_eq!(unique[0].title, "Alice - Example");
        assert_eq!(unique[0].source, "duckduckgo");
        assert_eq!(
            unique[0].sources,
            vec!["duckduckgo".to_string(), "bing".to_string()]
        );
    }

    #[test]
    fn test_dedupe_normalizes_scheme_and_trailing_slash() {
        let records = vec![
            record("bing", "http://example.com/alice/", "A"),
            record("bing", "https://EXAMPLE.com/alice", "B"),
            record("bing", "https://example.com/alice?ref=search", "C"),
        ];
        let unique = Deduplicator::new().dedupe(&records);
        assert_eq!(unique.len(), 1);
        assert_eq!(unique[0].sources, vec!["bing".to_string()]);
    }

    #[test]
    fn test_dedupe_keeps_distinct_query_targets() {
        let records = vec![
            record("bing", "https://forum.example.com/member.php?u=1", "A"),
            record("bing", "https://forum.example.com/member.php?u=2", "B"),
        ];
        assert_eq!(Deduplicator::new().dedupe(&records).len(), 2);
    }

    #[test]
    fn test_dedupe_preserves_first_occurrence_order() {
        let records = vec![
            record("a", "https://one.com/x", ""),
            record("b", "https://two.com/x", ""),
            record("c", "https://one.com/x/", ""),
            record("d", "https://three.com/x", ""),
        ];
        let urls: Vec<_> = Deduplicator::new()
            .dedupe(&records)
            .into_iter()
            .map(|r| r.url)
            .collect();
        assert_eq!(
            urls,
            vec!["https://one.com/x", "https://two.com/x", "https://three.com/x"]
        );
    }

    #[test]
    fn test_dedupe_is_idempotent() {
        let records = vec![
            record("a", "https://one.com/x", "1"),
            record("b", "https://one.com/x/", "2"),
            record("b", "https://two.com/profile.php?id=3", "3"),
            record("a", "https://two.com/profile.php?id=4", "4"),
            record("c", "http://two.com/profile.php?id=3", "5"),
        ];
        let dedup = Deduplicator::new();
        let once = dedup.dedupe(&records);
        let twice = dedup.dedupe(&once);
        assert_eq!(once, twice);
        assert!(once.len() <= records.len());
    }

    #[test]
    fn test_dedupe_empty() {
        assert!(Deduplicator::new().dedupe(&[]).is_empty());
    }
}
