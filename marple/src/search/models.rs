//! Data models for search queries and collected hits.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::errors::ConfigurationError;

/// Default per-engine result cap.
pub const DEFAULT_RESULTS_COUNT: usize = 1000;

/// A single hit produced by one engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResultRecord {
    /// Name of the engine that produced the record.
    pub source: String,
    /// Absolute URL of the hit.
    pub url: String,
    /// Listing title, possibly empty.
    #[serde(default)]
    pub title: String,
    /// Descriptive text shown by the engine.
    #[serde(default)]
    pub snippet: Option<String>,
    /// Junk score, lower is more likely genuine.
    #[serde(default)]
    pub junk_score: i64,
    /// Explicitly excluded regardless of score.
    #[serde(default)]
    pub filtered: bool,
    /// Every engine that surfaced this URL, in arrival order.
    #[serde(default)]
    pub sources: Vec<String>,
}

impl ResultRecord {
    /// Creates a new record from an engine hit.
    #[must_use]
    pub fn new(source: impl Into<String>, url: impl Into<String>, title: impl Into<String>) -> Self {
        let source = source.into();
        Self {
            sources: vec![source.clone()],
            source,
            url: url.into(),
            title: title.into(),
            ..Default::default()
        }
    }

    /// Sets the snippet.
    #[must_use]
    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        let snippet = snippet.into();
        self.snippet = if snippet.trim().is_empty() {
            None
        } else {
            Some(snippet)
        };
        self
    }

    /// Adds an engine to the provenance list, ignoring repeats.
    pub fn add_source(&mut self, source: &str) {
        if !self.sources.iter().any(|s| s == source) {
            self.sources.push(source.to_string());
        }
    }

    /// Merges the provenance of a duplicate into this record.
    pub fn merge_provenance(&mut self, other: &Self) {
        if other.sources.is_empty() {
            self.add_source(&other.source);
        }
        for source in &other.sources {
            self.add_source(source);
        }
    }

    /// Returns the snippet or an empty string.
    #[must_use]
    pub fn snippet_text(&self) -> &str {
        self.snippet.as_deref().unwrap_or("")
    }
}

/// The identity being searched for.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchQuery {
    /// Target username or free-form name.
    pub username: String,
    /// First name.
    #[serde(default)]
    pub firstname: Option<String>,
    /// Last name.
    #[serde(default)]
    pub lastname: Option<String>,
    /// Middle name or patronymic.
    #[serde(default)]
    pub middlename: Option<String>,
    /// Date of birth in any format.
    #[serde(default)]
    pub birthdate: Option<String>,
    /// Country in any format.
    #[serde(default)]
    pub country: Option<String>,
    /// Maximum number of records taken from each engine.
    #[serde(default = "default_results_count")]
    pub results_count: usize,
    /// Whether records must carry the username in their URL.
    #[serde(default = "default_url_filter")]
    pub url_filter: bool,
}

fn default_results_count() -> usize {
    DEFAULT_RESULTS_COUNT
}

fn default_url_filter() -> bool {
    true
}

impl SearchQuery {
    /// Creates a query for a username with default limits.
    #[must_use]
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            firstname: None,
            lastname: None,
            middlename: None,
            birthdate: None,
            country: None,
            results_count: DEFAULT_RESULTS_COUNT,
            url_filter: true,
        }
    }

    /// Sets the per-engine result cap.
    #[must_use]
    pub fn with_results_count(mut self, count: usize) -> Self {
        self.results_count = count;
        self
    }

    /// Enables or disables URL-based username filtering.
    #[must_use]
    pub fn with_url_filter(mut self, enabled: bool) -> Self {
        self.url_filter = enabled;
        self
    }

    /// Sets first and last name.
    #[must_use]
    pub fn with_name(mut self, firstname: impl Into<String>, lastname: impl Into<String>) -> Self {
        self.firstname = Some(firstname.into());
        self.lastname = Some(lastname.into());
        self
    }

    /// Sets the middle name.
    #[must_use]
    pub fn with_middlename(mut self, middlename: impl Into<String>) -> Self {
        self.middlename = Some(middlename.into());
        self
    }

    /// Sets the birth date hint.
    #[must_use]
    pub fn with_birthdate(mut self, birthdate: impl Into<String>) -> Self {
        self.birthdate = Some(birthdate.into());
        self
    }

    /// Sets the country hint.
    #[must_use]
    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    /// Checks the query before dispatch.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.username.trim().is_empty() {
            return Err(ConfigurationError::invalid_value(
                "username",
                "must not be empty",
            ));
        }
        if self.results_count == 0 {
            return Err(ConfigurationError::invalid_value(
                "results_count",
                "must be at least 1",
            ));
        }
        Ok(())
    }

    /// Lowercased tokens that identify the target in URLs and text.
    ///
    /// The username is split on whitespace so that "john smith" yields two
    /// tokens; name parts are added when present.
    #[must_use]
    pub fn target_tokens(&self) -> Vec<String> {
        let mut tokens: Vec<String> = Vec::new();
        let parts = std::iter::once(self.username.as_str())
            .chain(self.firstname.as_deref())
            .chain(self.middlename.as_deref())
            .chain(self.lastname.as_deref());
        for part in parts {
            for token in part.split_whitespace() {
                let token = token.to_lowercase();
                if !token.is_empty() && !tokens.contains(&token) {
                    tokens.push(token);
                }
            }
        }
        tokens
    }

    /// The token that must appear in a URL for the URL filter to pass.
    #[must_use]
    pub fn url_token(&self) -> String {
        self.username
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("")
            .to_lowercase()
    }

    /// Query strings sent to engines.
    ///
    /// Always contains the quoted username. Name phrases are added when a
    /// first and last name are known, with country and birth date hints
    /// appended.
    #[must_use]
    pub fn search_terms(&self) -> Vec<String> {
        let mut terms = vec![format!("\"{}\"", self.username.trim())];

        if let (Some(first), Some(last)) = (self.firstname.as_deref(), self.lastname.as_deref()) {
            let mut phrases = vec![format!("\"{first} {last}\"")];
            if let Some(middle) = self.middlename.as_deref() {
                phrases.push(format!("\"{first} {middle} {last}\""));
            }
            let hints: Vec<&str> = self
                .country
                .as_deref()
                .into_iter()
                .chain(self.birthdate.as_deref())
                .collect();
            for phrase in phrases {
                if hints.is_empty() {
                    terms.push(phrase);
                } else {
                    terms.push(format!("{phrase} {}", hints.join(" ")));
                }
            }
        }

        terms.dedup();
        terms
    }
}

/// All records collected for one query.
///
/// Filled by the dispatcher in arrival order and frozen once every adapter
/// has finished or been cancelled.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AggregateResult {
    all_links: Vec<ResultRecord>,
    unique_links: Vec<ResultRecord>,
}

impl AggregateResult {
    /// Creates an aggregate from collected and deduplicated records.
    #[must_use]
    pub fn new(all_links: Vec<ResultRecord>, unique_links: Vec<ResultRecord>) -> Self {
        Self {
            all_links,
            unique_links,
        }
    }

    /// Every accepted record in arrival order.
    #[must_use]
    pub fn all_links(&self) -> &[ResultRecord] {
        &self.all_links
    }

    /// Deduplicated records in first-occurrence order.
    #[must_use]
    pub fn unique_links(&self) -> &[ResultRecord] {
        &self.unique_links
    }

    /// Mutable access for scoring and classification passes.
    pub fn unique_links_mut(&mut self) -> &mut [ResultRecord] {
        &mut self.unique_links
    }

    /// Number of records per engine in `all_links`.
    #[must_use]
    pub fn counts_by_source(&self) -> HashMap<String, usize> {
        let mut counts = HashMap::new();
        for record in &self.all_links {
            *counts.entry(record.source.clone()).or_insert(0) += 1;
        }
        counts
    }

    /// Whether nothing was collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.all_links.is_empty()
    }
}
