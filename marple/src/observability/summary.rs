//! One wide log event per search run.

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;
use uuid::Uuid;

use crate::dispatcher::{AdapterOutcome, AdapterReport, DispatchOutcome};
use crate::report::ReportStatus;

/// Overall state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Every engine completed.
    Completed,
    /// Some engines failed or were cut short.
    Partial,
    /// No engine completed.
    Failed,
}

/// Everything worth knowing about a run in one payload.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Run identifier.
    pub run_id: Uuid,
    /// Overall state.
    pub status: RunStatus,
    /// Whether the global deadline fired.
    pub deadline_hit: bool,
    /// Number of engines per outcome.
    pub outcome_counts: BTreeMap<&'static str, usize>,
    /// Per-engine diagnostics.
    pub engines: Vec<AdapterReport>,
    /// Report counters.
    pub report: ReportStatus,
}

fn outcome_label(outcome: &AdapterOutcome) -> &'static str {
    match outcome {
        AdapterOutcome::Completed => "completed",
        AdapterOutcome::Failed { .. } => "failed",
        AdapterOutcome::Cancelled => "cancelled",
    }
}

impl RunSummary {
    /// Builds the summary of a finished run.
    #[must_use]
    pub fn new(outcome: &DispatchOutcome, report: ReportStatus) -> Self {
        let mut outcome_counts = BTreeMap::new();
        for diag in &outcome.diagnostics {
            *outcome_counts.entry(outcome_label(&diag.outcome)).or_insert(0) += 1;
        }

        let failed = outcome.diagnostics.iter().filter(|d| d.is_failure()).count();
        let status = if !outcome.diagnostics.is_empty() && failed == outcome.diagnostics.len() {
            RunStatus::Failed
        } else if failed > 0 || outcome.deadline_hit || outcome_counts.contains_key("cancelled") {
            RunStatus::Partial
        } else {
            RunStatus::Completed
        };

        Self {
            run_id: outcome.run_id,
            status,
            deadline_hit: outcome.deadline_hit,
            outcome_counts,
            engines: outcome.diagnostics.clone(),
            report,
        }
    }

    /// Serializes the summary as a JSON value.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Logs the summary at info level.
pub fn emit_run_summary(summary: &RunSummary) {
    info!(
        run_id = %summary.run_id,
        status = ?summary.status,
        deadline_hit = summary.deadline_hit,
        displayed = summary.report.displayed_count,
        unique = summary.report.unique_count,
        summary = %summary.to_json(),
        "search run finished"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AdapterError;
    use crate::search::AggregateResult;

    fn report(engine: &str, outcome: AdapterOutcome, records: usize) -> AdapterReport {
        AdapterReport {
            engine: engine.to_string(),
            outcome,
            records,
            started_at: None,
            duration_ms: 1.0,
        }
    }

    fn dispatch(diagnostics: Vec<AdapterReport>, deadline_hit: bool) -> DispatchOutcome {
        DispatchOutcome {
            run_id: Uuid::new_v4(),
            result: AggregateResult::default(),
            diagnostics,
            deadline_hit,
        }
    }

    #[test]
    fn test_completed_run() {
        let outcome = dispatch(vec![report("bing", AdapterOutcome::Completed, 3)], false);
        let summary = RunSummary::new(&outcome, ReportStatus::default());
        assert_eq!(summary.status, RunStatus::Completed);
        assert_eq!(summary.outcome_counts.get("completed"), Some(&1));
    }

    #[test]
    fn test_partial_run() {
        let failed = AdapterOutcome::Failed {
            error: AdapterError::timeout("duckduckgo", "slow"),
        };
        let outcome = dispatch(
            vec![
                report("bing", AdapterOutcome::Completed, 3),
                report("duckduckgo", failed, 0),
            ],
            false,
        );
        let summary = RunSummary::new(&outcome, ReportStatus::default());
        assert_eq!(summary.status, RunStatus::Partial);

        let json = summary.to_json();
        assert_eq!(json["status"], "partial");
        assert_eq!(json["engines"][1]["outcome"]["status"], "failed");
        assert_eq!(json["engines"][1]["outcome"]["error"]["kind"], "timeout");
    }

    #[test]
    fn test_deadline_is_partial() {
        let outcome = dispatch(vec![report("bing", AdapterOutcome::Cancelled, 2)], true);
        assert_eq!(RunSummary::new(&outcome, ReportStatus::default()).status, RunStatus::Partial);
    }
}
