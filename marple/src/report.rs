//! Assembly of the final report document.

use serde::{Deserialize, Serialize};

use crate::classify::ProfileClassifier;
use crate::search::urls::is_pdf_url;
use crate::search::{AggregateResult, ResultRecord};

/// One record as it appears in the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportEntry {
    /// Engine that produced the canonical record.
    pub source: String,
    /// Record URL.
    pub url: String,
    /// Record title.
    pub title: String,
    /// Junk score.
    pub junk_score: i64,
}

impl From<&ResultRecord> for ReportEntry {
    fn from(record: &ResultRecord) -> Self {
        Self {
            source: record.source.clone(),
            url: record.url.clone(),
            title: record.title.clone(),
            junk_score: record.junk_score,
        }
    }
}

/// Summary counters of a report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportStatus {
    /// Records collected from all engines.
    pub total_collected_count: usize,
    /// Records left after de-duplication.
    pub unique_count: usize,
    /// Records in `results`.
    pub displayed_count: usize,
    /// Records in `pdf_results`.
    pub pdf_count: usize,
}

/// The JSON document printed or written at the end of a search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportDocument {
    /// The searched identity as given on the command line.
    pub username: String,
    /// Likely profiles.
    pub results: Vec<ReportEntry>,
    /// Links that look like PDF files.
    pub pdf_results: Vec<ReportEntry>,
    /// Counters.
    pub status: ReportStatus,
}

impl ReportDocument {
    /// Creates an empty document for a username.
    #[must_use]
    pub fn empty(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            results: Vec::new(),
            pdf_results: Vec::new(),
            status: ReportStatus::default(),
        }
    }
}

/// Partitions unique records into the report buckets.
pub struct ReportAssembler<'a> {
    classifier: &'a ProfileClassifier,
    pdf_predicate: Box<dyn Fn(&str) -> bool + Send + Sync + 'a>,
}

impl<'a> ReportAssembler<'a> {
    /// Creates an assembler using the default PDF predicate.
    #[must_use]
    pub fn new(classifier: &'a ProfileClassifier) -> Self {
        Self {
            classifier,
            pdf_predicate: Box::new(is_pdf_url),
        }
    }

    /// Replaces the PDF predicate.
    #[must_use]
    pub fn with_pdf_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'a,
    {
        self.pdf_predicate = Box::new(predicate);
        self
    }

    /// Builds the document. The two buckets are independent filters, so a
    /// record may appear in both.
    #[must_use]
    pub fn assemble(&self, username: &str, aggregate: &AggregateResult) -> ReportDocument {
        let unique = aggregate.unique_links();

        let results: Vec<ReportEntry> = unique
            .iter()
            .filter(|r| self.classifier.classify(r))
            .map(ReportEntry::from)
            .collect();

        let pdf_results: Vec<ReportEntry> = unique
            .iter()
            .filter(|r| (self.pdf_predicate)(&r.url))
            .map(ReportEntry::from)
            .collect();

        let status = ReportStatus {
            total_collected_count: aggregate.all_links().len(),
            unique_count: unique.len(),
            displayed_count: results.len(),
            pdf_count: pdf_results.len(),
        };

        ReportDocument {
            username: username.to_string(),
            results,
            pdf_results,
            status,
        }
    }
}

impl std::fmt::Debug for ReportAssembler<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportAssembler")
            .field("classifier", &self.classifier)
            .finish_non_exhaustive()
    }
}
