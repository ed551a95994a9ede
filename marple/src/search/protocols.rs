//! Protocol traits for search engines.
//!
//! An [`EngineAdapter`] queries one search surface and streams what it finds
//! into a [`RecordSink`]. The sink owns the per-engine cap, URL validation and
//! cancellation, so adapters only deal with their engine.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::models::{ResultRecord, SearchQuery};
use super::urls::parse_hit_url;
use crate::cancellation::CancellationToken;
use crate::errors::AdapterError;

/// Protocol for a single search engine.
#[async_trait]
pub trait EngineAdapter: Send + Sync {
    /// Registry name of the engine.
    fn name(&self) -> &str;

    /// Runs the query, pushing hits into `sink` as they are parsed.
    ///
    /// Implementations should stop as soon as [`RecordSink::push`] returns
    /// `false`. Recoverable failures are returned as [`AdapterError`]; records
    /// already pushed are kept by the dispatcher.
    async fn query(&self, query: &SearchQuery, sink: &RecordSink) -> Result<(), AdapterError>;
}

/// Destination for the records of one adapter.
pub struct RecordSink {
    engine: String,
    tx: mpsc::UnboundedSender<ResultRecord>,
    cap: usize,
    accepted: AtomicUsize,
    rejected: AtomicUsize,
    cancel: Arc<CancellationToken>,
    counters: Option<Arc<DashMap<String, usize>>>,
}

impl RecordSink {
    /// Creates a sink feeding `tx`.
    #[must_use]
    pub fn new(
        engine: impl Into<String>,
        tx: mpsc::UnboundedSender<ResultRecord>,
        cap: usize,
        cancel: Arc<CancellationToken>,
    ) -> Self {
        Self {
            engine: engine.into(),
            tx,
            cap,
            accepted: AtomicUsize::new(0),
            rejected: AtomicUsize::new(0),
            cancel,
            counters: None,
        }
    }

    /// Creates a standalone sink and the receiver collecting its records.
    #[must_use]
    pub fn collector(
        engine: impl Into<String>,
        cap: usize,
    ) -> (Self, mpsc::UnboundedReceiver<ResultRecord>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self::new(engine, tx, cap, Arc::new(CancellationToken::new())),
            rx,
        )
    }

    /// Also counts accepted records per engine in `counters`.
    #[must_use]
    pub fn with_counters(mut self, counters: Arc<DashMap<String, usize>>) -> Self {
        self.counters = Some(counters);
        self
    }

    /// Offers a record. Returns whether the adapter should keep producing.
    ///
    /// The record is stamped with this sink's engine. Records with a missing
    /// or malformed URL are dropped with a warning and do not count against
    /// the cap.
    pub fn push(&self, mut record: ResultRecord) -> bool {
        if self.cancel.is_cancelled() || self.is_full() {
            return false;
        }

        if parse_hit_url(&record.url).is_none() {
            self.rejected.fetch_add(1, Ordering::SeqCst);
            warn!(engine = %self.engine, url = %record.url, "dropping record with invalid url");
            return true;
        }

        record.url = record.url.trim().to_string();
        record.source.clone_from(&self.engine);
        record.sources = vec![self.engine.clone()];

        debug!(engine = %self.engine, url = %record.url, title = %record.title, "record collected");

        if self.tx.send(record).is_err() {
            return false;
        }
        if let Some(ref counters) = self.counters {
            *counters.entry(self.engine.clone()).or_insert(0) += 1;
        }
        let accepted = self.accepted.fetch_add(1, Ordering::SeqCst) + 1;
        accepted < self.cap
    }

    /// Name of the engine feeding this sink.
    #[must_use]
    pub fn engine(&self) -> &str {
        &self.engine
    }

    /// Number of records accepted so far.
    #[must_use]
    pub fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }

    /// Number of records dropped for invalid URLs.
    #[must_use]
    pub fn rejected(&self) -> usize {
        self.rejected.load(Ordering::SeqCst)
    }

    /// Records still allowed before the cap.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.cap.saturating_sub(self.accepted())
    }

    /// Whether the cap has been reached.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.accepted() >= self.cap
    }

    /// Whether the run has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Completes once the run is cancelled.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await;
    }
}

impl std::fmt::Debug for RecordSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordSink")
            .field("engine", &self.engine)
            .field("cap", &self.cap)
            .field("accepted", &self.accepted())
            .field("rejected", &self.rejected())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_stamps_engine() {
        let (sink, mut rx) = RecordSink::collector("bing", 10);
        assert!(sink.push(ResultRecord::new("other", " https://example.com/a ", "A")));

        let record = rx.try_recv().unwrap();
        assert_eq!(record.source, "bing");
        assert_eq!(record.sources, vec!["bing".to_string()]);
        assert_eq!(record.url, "https://example.com/a");
    }

    #[test]
    fn test_push_drops_invalid_urls() {
        let (sink, mut rx) = RecordSink::collector("bing", 10);
        assert!(sink.push(ResultRecord::new("bing", "", "empty")));
        assert!(sink.push(ResultRecord::new("bing", "/relative", "relative")));

        assert!(rx.try_recv().is_err());
        assert_eq!(sink.rejected(), 2);
        assert_eq!(sink.accepted(), 0);
    }

    #[test]
    fn test_push_respects_cap() {
        let (sink, mut rx) = RecordSink::collector("bing", 2);
        assert!(sink.push(ResultRecord::new("bing", "https://a.com", "")));
        assert!(!sink.push(ResultRecord::new("bing", "https://b.com", "")));
        assert!(!sink.push(ResultRecord::new("bing", "https://c.com", "")));

        assert!(sink.is_full());
        assert_eq!(sink.remaining(), 0);
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_push_after_cancel_rejected() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let token = Arc::new(CancellationToken::new());
        let sink = RecordSink::new("bing", tx, 10, token.clone());

        assert!(sink.push(ResultRecord::new("bing", "https://a.com", "")));
        token.cancel("deadline");
        assert!(!sink.push(ResultRecord::new("bing", "https://b.com", "")));

        assert!(sink.is_cancelled());
        assert_eq!(rx.try_recv().unwrap().url, "https://a.com");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_counters_updated() {
        let counters = Arc::new(DashMap::new());
        let (sink, _rx) = RecordSink::collector("duckduckgo", 10);
        let sink = sink.with_counters(counters.clone());
        sink.push(ResultRecord::new("x", "https://a.com", ""));
        sink.push(ResultRecord::new("x", "https://b.com", ""));
        assert_eq!(counters.get("duckduckgo").map(|c| *c), Some(2));
    }
}
