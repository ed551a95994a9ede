//! Decides whether a scored record is likely a real profile.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::search::urls::{domain_matches, extract_domain, path_contains};
use crate::search::{ResultRecord, SearchQuery};

/// Default junk score threshold.
pub const DEFAULT_THRESHOLD: i64 = 300;

/// Why a record was kept out of the profile results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionReason {
    /// URL filtering is on and the URL lacks the target token.
    UrlFilter,
    /// The junk score is above the threshold.
    Score,
    /// The record was explicitly blocked.
    Blocked,
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::UrlFilter => "url_filter",
            Self::Score => "score",
            Self::Blocked => "blocked",
        };
        f.write_str(s)
    }
}

/// Classifies records with plain inputs and no hidden state.
#[derive(Debug, Clone)]
pub struct ProfileClassifier {
    url_token: String,
    url_filter: bool,
    threshold: i64,
    blocklist: Vec<String>,
}

impl ProfileClassifier {
    /// Creates a classifier for the query's target and URL-filter setting.
    #[must_use]
    pub fn new(query: &SearchQuery, threshold: i64) -> Self {
        Self {
            url_token: query.url_token(),
            url_filter: query.url_filter,
            threshold,
            blocklist: Vec::new(),
        }
    }

    /// Sets the explicitly blocked domains.
    #[must_use]
    pub fn with_blocklist(mut self, blocklist: Vec<String>) -> Self {
        self.blocklist = blocklist;
        self
    }

    /// Returns the configured threshold.
    #[must_use]
    pub fn threshold(&self) -> i64 {
        self.threshold
    }

    /// Whether the record passes the URL-filter gate.
    #[must_use]
    pub fn passes_url_filter(&self, record: &ResultRecord) -> bool {
        !self.url_filter || path_contains(&record.url, &self.url_token)
    }

    /// Whether the record's domain is on the blocklist.
    #[must_use]
    pub fn is_blocked(&self, record: &ResultRecord) -> bool {
        let Some(domain) = extract_domain(&record.url) else {
            return false;
        };
        self.blocklist.iter().any(|listed| domain_matches(&domain, listed))
    }

    /// Marks blocked records as filtered. Returns how many were marked.
    pub fn apply_blocklist(&self, records: &mut [ResultRecord]) -> usize {
        let mut marked = 0;
        for record in records.iter_mut() {
            if self.is_blocked(record) {
                record.filtered = true;
                marked += 1;
            }
        }
        marked
    }

    /// The first gate that excludes the record, if any.
    #[must_use]
    pub fn exclusion_reason(&self, record: &ResultRecord) -> Option<ExclusionReason> {
        if record.filtered {
            Some(ExclusionReason::Blocked)
        } else if !self.passes_url_filter(record) {
            Some(ExclusionReason::UrlFilter)
        } else if record.junk_score > self.threshold {
            Some(ExclusionReason::Score)
        } else {
            None
        }
    }

    /// Whether the record is likely a genuine profile.
    #[must_use]
    pub fn classify(&self, record: &ResultRecord) -> bool {
        self.passes_url_filter(record) && record.junk_score <= self.threshold && !record.filtered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(url: &str, score: i64) -> ResultRecord {
        let mut record = ResultRecord::new("bing", url, "title");
        record.junk_score = score;
        record
    }

    #[test]
    fn test_classify_passes_all_gates() {
        let classifier = ProfileClassifier::new(&SearchQuery::new("alice"), DEFAULT_THRESHOLD);
        assert!(classifier.classify(&scored("https://github.com/alice", 0)));
        assert!(classifier.classify(&scored("https://github.com/alice", 300)));
        assert!(!classifier.classify(&scored("https://github.com/alice", 301)));
    }

    #[test]
    fn test_url_filter_excludes_when_enabled() {
        let classifier = ProfileClassifier::new(&SearchQuery::new("alice"), DEFAULT_THRESHOLD);
        let record = scored("https://example.com/bob", 10);
        assert!(!classifier.classify(&record));
        assert_eq!(classifier.exclusion_reason(&record), Some(ExclusionReason::UrlFilter));
    }

    #[test]
    fn test_url_filter_matches_non_ascii_username() {
        let classifier = ProfileClassifier::new(&SearchQuery::new("алиса"), DEFAULT_THRESHOLD);
        let record = scored("https://vk.com/алиса", 0);
        assert!(classifier.passes_url_filter(&record));
        assert_eq!(classifier.exclusion_reason(&record), None);
    }

    #[test]
    fn test_url_filter_disabled_keeps_low_score() {
        let query = SearchQuery::new("alice").with_url_filter(false);
        let classifier = ProfileClassifier::new(&query, DEFAULT_THRESHOLD);
        assert!(classifier.classify(&scored("https://example.com/bob", 200)));
        assert!(!classifier.classify(&scored("https://example.com/bob", 500)));
    }

    #[test]
    fn test_filtered_flag_excludes_regardless_of_score() {
        let classifier = ProfileClassifier::new(&SearchQuery::new("alice"), DEFAULT_THRESHOLD);
        let mut record = scored("https://github.com/alice", 0);
        record.filtered = true;
        assert!(!classifier.classify(&record));
        assert_eq!(classifier.exclusion_reason(&record), Some(ExclusionReason::Blocked));
    }

    #[test]
    fn test_apply_blocklist() {
        let classifier = ProfileClassifier::new(&SearchQuery::new("alice"), DEFAULT_THRESHOLD)
            .with_blocklist(vec!["spam.example".to_string()]);
        let mut records = vec![
            scored("https://mirror.spam.example/alice", 0),
            scored("https://github.com/alice", 0),
        ];
        assert_eq!(classifier.apply_blocklist(&mut records), 1);
        assert!(records[0].filtered);
        assert!(!records[1].filtered);
        assert_eq!(classifier.exclusion_reason(&records[1]), None);
    }

    #[test]
    fn test_classify_deterministic() {
        let classifier = ProfileClassifier::new(&SearchQuery::new("alice"), 100);
        let record = scored("https://github.com/alice", 100);
        let first = classifier.classify(&record);
        for _ in 0..10 {
            assert_eq!(classifier.classify(&record), first);
        }
    }

    #[test]
    fn test_score_reason() {
        let classifier = ProfileClassifier::new(&SearchQuery::new("alice"), 50);
        let record = scored("https://github.com/alice", 51);
        assert_eq!(classifier.exclusion_reason(&record), Some(ExclusionReason::Score));
        assert_eq!(ExclusionReason::Score.to_string(), "score");
    }
}
