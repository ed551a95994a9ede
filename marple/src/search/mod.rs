//! Search data model, configuration and the engine protocol.
//!
//! This module provides:
//! - Records, queries and the aggregate collected for a query
//! - Configuration for fetching, dispatch and scoring
//! - The `EngineAdapter` trait and the `RecordSink` adapters stream into
//! - URL helpers for validation, normalization and PDF detection

mod config;
mod models;
mod protocols;
pub mod urls;

pub use config::{
    DispatchConfig, FetchConfig, MarpleConfig, RetryConfig, ScoringConfig, ScoringWeights,
};
pub use models::{AggregateResult, ResultRecord, SearchQuery, DEFAULT_RESULTS_COUNT};
pub use protocols::{EngineAdapter, RecordSink};
