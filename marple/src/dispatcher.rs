//! Concurrent fan-out of a query to every selected engine.
//!
//! Each adapter runs in its own tokio task and streams records through a
//! shared channel, so `all_links` keeps each adapter's own order while the
//! interleaving across adapters depends on network timing and is not
//! deterministic between runs.
//!
//! A global deadline bounds the run. When it passes, the shared token is
//! cancelled, adapters get a short grace period to return, and whatever is
//! still running is aborted. Records queued before that point are kept.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::cancellation::{CancellationToken, ReleaseGuard};
use crate::dedup::Deduplicator;
use crate::errors::{AdapterError, ConfigurationError, MarpleError};
use crate::search::{AggregateResult, DispatchConfig, EngineAdapter, RecordSink, ResultRecord, SearchQuery};

/// How one adapter's run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AdapterOutcome {
    /// The adapter returned normally.
    Completed,
    /// The adapter failed; anything it pushed first is still kept.
    Failed {
        /// The failure.
        error: AdapterError,
    },
    /// The run deadline stopped the adapter after it produced records.
    Cancelled,
}

/// Diagnostics for one adapter of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterReport {
    /// Engine name.
    pub engine: String,
    /// How the adapter ended.
    pub outcome: AdapterOutcome,
    /// Records the adapter contributed to `all_links`.
    pub records: usize,
    /// When the adapter started, if it got a concurrency slot.
    pub started_at: Option<DateTime<Utc>>,
    /// Time spent running in milliseconds.
    pub duration_ms: f64,
}

impl AdapterReport {
    /// Returns the error if the adapter failed.
    #[must_use]
    pub fn error(&self) -> Option<&AdapterError> {
        match self.outcome {
            AdapterOutcome::Failed { ref error } => Some(error),
            _ => None,
        }
    }

    /// Whether the adapter failed.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.error().is_some()
    }
}

/// Everything a dispatch run produced.
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    /// Identifier of the run, also attached to its log span.
    pub run_id: Uuid,
    /// Collected and deduplicated records.
    pub result: AggregateResult,
    /// One report per adapter, in the order the adapters were given.
    pub diagnostics: Vec<AdapterReport>,
    /// Whether the global deadline cut the run short.
    pub deadline_hit: bool,
}

impl DispatchOutcome {
    /// Errors of the adapters that failed.
    #[must_use]
    pub fn failures(&self) -> Vec<&AdapterError> {
        self.diagnostics.iter().filter_map(AdapterReport::error).collect()
    }
}

/// What a finished adapter task hands back to the dispatcher.
#[derive(Debug)]
struct TaskDone {
    index: usize,
    result: Result<(), AdapterError>,
    started_at: DateTime<Utc>,
    duration_ms: f64,
    accepted: usize,
    cancelled: bool,
}

/// Runs engine adapters concurrently under shared limits.
#[derive(Debug, Clone, Default)]
pub struct Dispatcher {
    config: DispatchConfig,
    deduplicator: Deduplicator,
}

impl Dispatcher {
    /// Creates a dispatcher with the given limits.
    #[must_use]
    pub fn new(config: DispatchConfig) -> Self {
        Self {
            config,
            deduplicator: Deduplicator::new(),
        }
    }

    /// Returns the dispatch configuration.
    #[must_use]
    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Runs every adapter against the query and collects their records.
    ///
    /// Adapter failures are isolated and reported in the diagnostics. The
    /// run itself fails only when nothing was collected and no adapter
    /// completed successfully.
    pub async fn run(
        &self,
        query: Arc<SearchQuery>,
        adapters: &[Arc<dyn EngineAdapter>],
    ) -> Result<DispatchOutcome, MarpleError> {
        query.validate()?;
        if adapters.is_empty() {
            return Err(ConfigurationError::NoEngines.into());
        }
        self.config.validate()?;

        let run_id = Uuid::new_v4();
        let span = info_span!(
            "dispatch",
            %run_id,
            username = %query.username,
            engines = adapters.len()
        );

        self.run_inner(run_id, query, adapters).instrument(span).await
    }

    async fn run_inner(
        &self,
        run_id: Uuid,
        query: Arc<SearchQuery>,
        adapters: &[Arc<dyn EngineAdapter>],
    ) -> Result<DispatchOutcome, MarpleError> {
        let cancel = Arc::new(CancellationToken::new());
        let counters: Arc<DashMap<String, usize>> = Arc::new(DashMap::new());
        let started: Arc<DashMap<usize, (DateTime<Utc>, Instant)>> = Arc::new(DashMap::new());
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency));
        let (tx, mut rx) = mpsc::unbounded_channel::<ResultRecord>();
        let mut tasks: JoinSet<TaskDone> = JoinSet::new();

        info!("dispatching query");

        for (index, adapter) in adapters.iter().enumerate() {
            let adapter = Arc::clone(adapter);
            let query = Arc::clone(&query);
            let cancel = Arc::clone(&cancel);
            let semaphore = Arc::clone(&semaphore);
            let started = Arc::clone(&started);
            let sink = RecordSink::new(
                adapter.name(),
                tx.clone(),
                query.results_count,
                Arc::clone(&cancel),
            )
            .with_counters(Arc::clone(&counters));
            let adapter_timeout = self.config.adapter_timeout();

            tasks.spawn(async move {
                let engine = adapter.name().to_string();
                let _permit = semaphore.acquire_owned().await.ok();

                let started_at = Utc::now();
                let clock = Instant::now();
                if cancel.is_cancelled() {
                    return TaskDone {
                        index,
                        result: Ok(()),
                        started_at,
                        duration_ms: 0.0,
                        accepted: 0,
                        cancelled: true,
                    };
                }
                started.insert(index, (started_at, clock));
                debug!(engine = %engine, "adapter started");

                let guard_engine = engine.clone();
                let mut guard = ReleaseGuard::new(move |completed| {
                    if !completed {
                        debug!(engine = %guard_engine, "adapter aborted, resources released");
                    }
                });

                let run = AssertUnwindSafe(adapter.query(&query, &sink)).catch_unwind();
                let result = match tokio::time::timeout(adapter_timeout, run).await {
                    Ok(Ok(result)) => result,
                    Ok(Err(_panic)) => Err(AdapterError::unavailable(&engine, "adapter panicked")),
                    Err(_) => Err(AdapterError::timeout(
                        &engine,
                        format!("no result after {:.1}s", adapter_timeout.as_secs_f64()),
                    )),
                };
                guard.complete();

                TaskDone {
                    index,
                    result,
                    started_at,
                    duration_ms: clock.elapsed().as_secs_f64() * 1000.0,
                    accepted: sink.accepted(),
                    cancelled: sink.is_cancelled(),
                }
            });
        }
        drop(tx);

        let mut all_links: Vec<ResultRecord> = Vec::new();
        let mut finished: Vec<Option<TaskDone>> = adapters.iter().map(|_| None).collect();
        let mut deadline_hit = false;

        let deadline = tokio::time::sleep(self.config.global_timeout());
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                biased;
                Some(record) = rx.recv() => all_links.push(record),
                joined = tasks.join_next() => match joined {
                    Some(Ok(done)) => {
                        let index = done.index;
                        finished[index] = Some(done);
                    }
                    Some(Err(e)) => warn!(error = %e, "adapter task ended abnormally"),
                    None => break,
                },
                () = &mut deadline => {
                    deadline_hit = true;
                    break;
                }
            }
        }

        if deadline_hit {
            warn!(
                timeout_s = self.config.global_timeout_seconds,
                pending = tasks.len(),
                "global deadline elapsed, cancelling remaining engines"
            );
            cancel.cancel("global deadline elapsed");

            let grace = tokio::time::sleep(self.config.cancel_grace());
            tokio::pin!(grace);
            loop {
                tokio::select! {
                    biased;
                    Some(record) = rx.recv() => all_links.push(record),
                    joined = tasks.join_next() => match joined {
                        Some(Ok(done)) => {
                            let index = done.index;
                            finished[index] = Some(done);
                        }
                        Some(Err(e)) => warn!(error = %e, "adapter task ended abnormally"),
                        None => break,
                    },
                    () = &mut grace => break,
                }
            }

            tasks.abort_all();
            while let Some(joined) = tasks.join_next().await {
                if let Ok(done) = joined {
                    let index = done.index;
                    finished[index] = Some(done);
                }
            }
        }

        // Every sender is gone now; pick up whatever was still queued.
        while let Ok(record) = rx.try_recv() {
            all_links.push(record);
        }

        let diagnostics = build_reports(adapters, finished, &counters, &started);
        log_reports(&diagnostics);

        if all_links.is_empty()
            && diagnostics.iter().all(AdapterReport::is_failure)
        {
            let failures = diagnostics
                .iter()
                .filter_map(|r| r.error().cloned())
                .collect();
            return Err(MarpleError::AllAdaptersFailed { failures });
        }

        let unique_links = self.deduplicator.dedupe(&all_links);
        info!(
            total = all_links.len(),
            unique = unique_links.len(),
            deadline_hit,
            "dispatch finished"
        );

        Ok(DispatchOutcome {
            run_id,
            result: AggregateResult::new(all_links, unique_links),
            diagnostics,
            deadline_hit,
        })
    }
}

/// Turns finished tasks and leftovers into one report per adapter.
///
/// A cancelled adapter that produced nothing is reported as a timeout
/// failure; one that produced records is a partial success.
fn build_reports(
    adapters: &[Arc<dyn EngineAdapter>],
    finished: Vec<Option<TaskDone>>,
    counters: &DashMap<String, usize>,
    started: &DashMap<usize, (DateTime<Utc>, Instant)>,
) -> Vec<AdapterReport> {
    adapters
        .iter()
        .zip(finished)
        .enumerate()
        .map(|(index, (adapter, done))| {
            let engine = adapter.name().to_string();
            let (outcome, records, started_at, duration_ms) = match done {
                Some(done) => {
                    let outcome = match done.result {
                        Err(error) => AdapterOutcome::Failed { error },
                        Ok(()) if done.cancelled => AdapterOutcome::Cancelled,
                        Ok(()) => AdapterOutcome::Completed,
                    };
                    let started_at = started.get(&index).map(|_| done.started_at);
                    (outcome, done.accepted, started_at, done.duration_ms)
                }
                None => {
                    let records = counters.get(&engine).map_or(0, |c| *c);
                    let (started_at, duration_ms) = started.get(&index).map_or(
                        (None, 0.0),
                        |entry| {
                            let (at, clock) = *entry;
                            (Some(at), clock.elapsed().as_secs_f64() * 1000.0)
                        },
                    );
                    (AdapterOutcome::Cancelled, records, started_at, duration_ms)
                }
            };

            let outcome = if outcome == AdapterOutcome::Cancelled && records == 0 {
                AdapterOutcome::Failed {
                    error: AdapterError::timeout(&engine, "cancelled at the run deadline before producing records"),
                }
            } else {
                outcome
            };

            AdapterReport {
                engine,
                outcome,
                records,
                started_at,
                duration_ms,
            }
        })
        .collect()
}

fn log_reports(reports: &[AdapterReport]) {
    for report in reports {
        match report.outcome {
            AdapterOutcome::Completed => info!(
                engine = %report.engine,
                records = report.records,
                duration_ms = report.duration_ms,
                "engine completed"
            ),
            AdapterOutcome::Cancelled => info!(
                engine = %report.engine,
                records = report.records,
                duration_ms = report.duration_ms,
                "engine cancelled with partial results"
            ),
            AdapterOutcome::Failed { ref error } => warn!(
                engine = %report.engine,
                kind = %error.kind,
                records = report.records,
                error = %error.message,
                "engine failed"
            ),
        }
    }
}
