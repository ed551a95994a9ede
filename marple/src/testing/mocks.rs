//! Mock engine adapters for testing.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::time::Duration;

use crate::errors::{AdapterError, AdapterErrorKind};
use crate::search::{EngineAdapter, RecordSink, ResultRecord, SearchQuery};

/// Builds a record for use in adapter doubles.
#[must_use]
pub fn hit(url: &str, title: &str) -> ResultRecord {
    ResultRecord::new("", url, title)
}

/// An adapter that returns a fixed list of records.
#[derive(Debug)]
pub struct StaticAdapter {
    name: String,
    records: Vec<ResultRecord>,
    call_count: Mutex<usize>,
}

impl StaticAdapter {
    /// Creates a new static adapter.
    #[must_use]
    pub fn new(name: impl Into<String>, records: Vec<ResultRecord>) -> Self {
        Self {
            name: name.into(),
            records,
            call_count: Mutex::new(0),
        }
    }

    /// Creates an adapter that finds nothing.
    #[must_use]
    pub fn empty(name: impl Into<String>) -> Self {
        Self::new(name, Vec::new())
    }

    /// Returns the number of times the adapter was queried.
    #[must_use]
    pub fn call_count(&self) -> usize {
        *self.call_count.lock()
    }
}

#[async_trait]
impl EngineAdapter for StaticAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn query(&self, _query: &SearchQuery, sink: &RecordSink) -> Result<(), AdapterError> {
        *self.call_count.lock() += 1;
        for record in &self.records {
            if !sink.push(record.clone()) {
                break;
            }
        }
        Ok(())
    }
}

/// An adapter that always fails, optionally after producing some records.
#[derive(Debug)]
pub struct FailingAdapter {
    name: String,
    kind: AdapterErrorKind,
    message: String,
    records: Vec<ResultRecord>,
}

impl FailingAdapter {
    /// Creates a new failing adapter.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: AdapterErrorKind, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            message: message.into(),
            records: Vec::new(),
        }
    }

    /// Creates an adapter that times out.
    #[must_use]
    pub fn timeout(name: impl Into<String>) -> Self {
        Self::new(name, AdapterErrorKind::Timeout, "request timed out")
    }

    /// Pushes these records before failing.
    #[must_use]
    pub fn with_records(mut self, records: Vec<ResultRecord>) -> Self {
        self.records = records;
        self
    }
}

#[async_trait]
impl EngineAdapter for FailingAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn query(&self, _query: &SearchQuery, sink: &RecordSink) -> Result<(), AdapterError> {
        for record in &self.records {
            sink.push(record.clone());
        }
        Err(AdapterError::new(&self.name, self.kind, &self.message))
    }
}

/// An adapter that waits between records.
///
/// A cooperative adapter stops at the first cancellation. A stalling one
/// ignores cancellation and has to be aborted by the dispatcher.
#[derive(Debug)]
pub struct SlowAdapter {
    name: String,
    records: Vec<ResultRecord>,
    delay: Duration,
    cooperative: bool,
}

impl SlowAdapter {
    /// Creates a cooperative slow adapter.
    #[must_use]
    pub fn new(name: impl Into<String>, records: Vec<ResultRecord>, delay: Duration) -> Self {
        Self {
            name: name.into(),
            records,
            delay,
            cooperative: true,
        }
    }

    /// Creates a slow adapter with delay in milliseconds.
    #[must_use]
    pub fn with_delay_ms(name: impl Into<String>, records: Vec<ResultRecord>, ms: u64) -> Self {
        Self::new(name, records, Duration::from_millis(ms))
    }

    /// Ignores cancellation while sleeping.
    #[must_use]
    pub fn stalling(mut self) -> Self {
        self.cooperative = false;
        self
    }
}

#[async_trait]
impl EngineAdapter for SlowAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn query(&self, _query: &SearchQuery, sink: &RecordSink) -> Result<(), AdapterError> {
        for record in &self.records {
            if !sink.push(record.clone()) {
                return Ok(());
            }
            if self.cooperative {
                tokio::select! {
                    () = tokio::time::sleep(self.delay) => {}
                    () = sink.cancelled() => return Ok(()),
                }
            } else {
                tokio::time::sleep(self.delay).await;
            }
        }
        Ok(())
    }
}

/// An adapter that records every query it receives.
#[derive(Debug)]
pub struct RecordingAdapter {
    name: String,
    queries: Mutex<Vec<SearchQuery>>,
}

impl RecordingAdapter {
    /// Creates a new recording adapter.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Returns all recorded queries.
    #[must_use]
    pub fn queries(&self) -> Vec<SearchQuery> {
        self.queries.lock().clone()
    }
}

#[async_trait]
impl EngineAdapter for RecordingAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn query(&self, query: &SearchQuery, _sink: &RecordSink) -> Result<(), AdapterError> {
        self.queries.lock().push(query.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(rx: &mut tokio::sync::mpsc::UnboundedReceiver<ResultRecord>) -> Vec<ResultRecord> {
        let mut out = Vec::new();
        while let Ok(record) = rx.try_recv() {
            out.push(record);
        }
        out
    }

    #[tokio::test]
    async fn test_static_adapter() {
        let adapter = StaticAdapter::new(
            "static",
            vec![hit("https://a.com/alice", "A"), hit("https://b.com/alice", "B")],
        );
        let (sink, mut rx) = RecordSink::collector("static", 10);

        adapter.query(&SearchQuery::new("alice"), &sink).await.unwrap();

        let records = drain(&mut rx);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].source, "static");
        assert_eq!(adapter.call_count(), 1);
    }

    #[tokio::test]
    async fn test_failing_adapter_with_records() {
        let adapter = FailingAdapter::timeout("flaky").with_records(vec![hit("https://a.com", "A")]);
        let (sink, mut rx) = RecordSink::collector("flaky", 10);

        let err = adapter.query(&SearchQuery::new("alice"), &sink).await.unwrap_err();
        assert_eq!(err.kind, AdapterErrorKind::Timeout);
        assert_eq!(drain(&mut rx).len(), 1);
    }

    #[tokio::test]
    async fn test_slow_adapter_waits() {
        let adapter = SlowAdapter::with_delay_ms("slow", vec![hit("https://a.com", "A")], 10);
        let (sink, _rx) = RecordSink::collector("slow", 10);

        let start = std::time::Instant::now();
        adapter.query(&SearchQuery::new("alice"), &sink).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(10));
    }

    #[tokio::test]
    async fn test_recording_adapter() {
        let adapter = RecordingAdapter::new("rec");
        let (sink, _rx) = RecordSink::collector("rec", 10);

        adapter.query(&SearchQuery::new("alice"), &sink).await.unwrap();
        adapter.query(&SearchQuery::new("bob"), &sink).await.unwrap();

        let queries = adapter.queries();
        assert_eq!(queries.len(), 2);
        assert_eq!(queries[1].username, "bob");
    }
}
