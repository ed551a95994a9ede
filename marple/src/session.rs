//! End-to-end search: dispatch, scoring, classification and report assembly.

use std::sync::Arc;
use tracing::{debug, info};

use crate::classify::ProfileClassifier;
use crate::dispatcher::{DispatchOutcome, Dispatcher};
use crate::errors::MarpleError;
use crate::observability::{emit_run_summary, RunSummary};
use crate::report::{ReportAssembler, ReportDocument};
use crate::scoring::JunkScorer;
use crate::search::{EngineAdapter, MarpleConfig, SearchQuery};

/// A finished search.
#[derive(Debug)]
pub struct SearchOutcome {
    /// The document to print or write.
    pub report: ReportDocument,
    /// Raw dispatch results with scores applied to `unique_links`.
    pub dispatch: DispatchOutcome,
    /// Summary that was logged for the run.
    pub summary: RunSummary,
}

/// Runs searches against a fixed set of adapters.
pub struct SearchSession {
    adapters: Vec<Arc<dyn EngineAdapter>>,
    dispatcher: Dispatcher,
    scorer: JunkScorer,
    threshold: i64,
}

impl SearchSession {
    /// Creates a session. The configuration is validated here.
    pub fn new(
        adapters: Vec<Arc<dyn EngineAdapter>>,
        config: &MarpleConfig,
        threshold: i64,
    ) -> Result<Self, MarpleError> {
        config.validate()?;
        Ok(Self {
            adapters,
            dispatcher: Dispatcher::new(config.dispatch.clone()),
            scorer: JunkScorer::new(config.scoring.clone())?,
            threshold,
        })
    }

    /// Engine names in dispatch order.
    #[must_use]
    pub fn engines(&self) -> Vec<&str> {
        self.adapters.iter().map(|a| a.name()).collect()
    }

    /// Junk score threshold used for classification.
    #[must_use]
    pub fn threshold(&self) -> i64 {
        self.threshold
    }

    /// Searches for `query` and builds the report.
    ///
    /// `display_name` becomes the document's `username` field while the
    /// query's own username drives filtering and scoring.
    pub async fn run(&self, display_name: &str, query: SearchQuery) -> Result<SearchOutcome, MarpleError> {
        let query = Arc::new(query);
        let mut dispatch = self.dispatcher.run(query.clone(), &self.adapters).await?;

        let unique = dispatch.result.unique_links_mut();
        self.scorer.score_all(unique, &query);

        let classifier = ProfileClassifier::new(&query, self.threshold)
            .with_blocklist(self.scorer.config().blocklist.clone());
        let blocked = classifier.apply_blocklist(unique);
        if blocked > 0 {
            debug!(blocked, "records excluded by blocklist");
        }

        for record in dispatch.result.unique_links() {
            let reason = classifier.exclusion_reason(record);
            info!(
                url = %record.url,
                sources = ?record.sources,
                junk_score = record.junk_score,
                excluded = reason.map(|r| r.to_string()),
                "record scored"
            );
        }

        let report = ReportAssembler::new(&classifier).assemble(display_name, &dispatch.result);
        let summary = RunSummary::new(&dispatch, report.status);
        emit_run_summary(&summary);

        Ok(SearchOutcome {
            report,
            dispatch,
            summary,
        })
    }
}

impl std::fmt::Debug for SearchSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchSession")
            .field("engines", &self.engines())
            .field("dispatcher", &self.dispatcher)
            .field("threshold", &self.threshold)
            .finish_non_exhaustive()
    }
}
