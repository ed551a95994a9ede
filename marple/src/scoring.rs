//! Heuristic junk scoring of collected records.
//!
//! The score is a weighted sum of non-negative penalties, so adding a signal
//! can never lower it. Lower scores mean more likely genuine profiles.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::ConfigurationError;
use crate::search::urls::{domain_matches, extract_domain, path_contains, path_depth};
use crate::search::{ResultRecord, ScoringConfig, ScoringWeights, SearchQuery};

/// The junk signals detected on one record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JunkSignals {
    /// The target token is not in the URL.
    pub url_missing_target: bool,
    /// The title is empty.
    pub empty_title: bool,
    /// The title matches a boilerplate pattern.
    pub generic_title: bool,
    /// The domain is on the low-value list.
    pub low_value_domain: bool,
    /// The snippet mentions no target token.
    pub snippet_missing_target: bool,
    /// Path segments beyond the tolerated depth.
    pub extra_path_segments: usize,
}

impl JunkSignals {
    /// Sums the penalties of the present signals.
    #[must_use]
    pub fn penalty(&self, weights: &ScoringWeights) -> i64 {
        let flag = |present: bool, weight: u32| if present { i64::from(weight) } else { 0 };
        let depth = i64::try_from(self.extra_path_segments).unwrap_or(i64::MAX);

        flag(self.url_missing_target, weights.url_missing_target)
            + flag(self.empty_title, weights.empty_title)
            + flag(self.generic_title, weights.generic_title)
            + flag(self.low_value_domain, weights.low_value_domain)
            + flag(self.snippet_missing_target, weights.snippet_missing_target)
            + depth.saturating_mul(i64::from(weights.deep_path))
    }
}

/// Computes junk scores from lexical and structural signals.
#[derive(Debug, Clone)]
pub struct JunkScorer {
    config: ScoringConfig,
    title_patterns: Vec<Regex>,
}

impl JunkScorer {
    /// Creates a scorer, compiling the configured title patterns.
    pub fn new(config: ScoringConfig) -> Result<Self, ConfigurationError> {
        let title_patterns = config.compiled_title_patterns()?;
        Ok(Self {
            config,
            title_patterns,
        })
    }

    /// Returns the scoring configuration.
    #[must_use]
    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Detects the junk signals of a record.
    #[must_use]
    pub fn signals(&self, record: &ResultRecord, query: &SearchQuery) -> JunkSignals {
        let tokens = query.target_tokens();
        let title = record.title.trim();
        let snippet = record.snippet_text().to_lowercase();
        let domain = extract_domain(&record.url).unwrap_or_default();

        JunkSignals {
            url_missing_target: !path_contains(&record.url, &query.url_token()),
            empty_title: title.is_empty(),
            generic_title: !title.is_empty()
                && self.title_patterns.iter().any(|p| p.is_match(title)),
            low_value_domain: self
                .config
                .low_value_domains
                .iter()
                .any(|listed| domain_matches(&domain, listed)),
            snippet_missing_target: !tokens.iter().any(|t| snippet.contains(t.as_str())),
            extra_path_segments: path_depth(&record.url).saturating_sub(self.config.max_path_depth),
        }
    }

    /// Scores a record against the query.
    #[must_use]
    pub fn score(&self, record: &ResultRecord, query: &SearchQuery) -> i64 {
        self.signals(record, query).penalty(&self.config.weights)
    }

    /// Assigns scores to every record in place.
    pub fn score_all(&self, records: &mut [ResultRecord], query: &SearchQuery) {
        for record in records.iter_mut() {
            record.junk_score = self.score(record, query);
        }
    }
}
