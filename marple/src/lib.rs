//! # Marple
//!
//! Multi-engine identity search: a username (or name) is sent to several
//! public search engines at once, the hits are merged and de-duplicated,
//! each unique link gets a junk score, and the survivors are split into
//! likely profiles and PDF documents.
//!
//! - **Concurrent dispatch**: one tokio task per engine, bounded by a
//!   semaphore and a global deadline that keeps partial results
//! - **Failure isolation**: an engine that errors never sinks the others
//! - **Heuristic scoring**: configurable weights over URL, title, domain and
//!   snippet signals
//! - **Stable output**: a JSON document with two buckets and counters
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use marple::prelude::*;
//!
//! let config = MarpleConfig::default();
//! let ctx = EngineContext::from_config(config.fetch.clone())?;
//! let adapters = EngineRegistry::builtin().build(&[], &ctx)?;
//!
//! let session = SearchSession::new(adapters, &config, DEFAULT_THRESHOLD)?;
//! let outcome = session.run("soxoj", SearchQuery::new("soxoj")).await?;
//! println!("{}", to_pretty_json(&outcome.report)?);
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod classify;
pub mod dedup;
pub mod dispatcher;
pub mod errors;
pub mod observability;
pub mod output;
pub mod report;
pub mod scoring;
pub mod search;
pub mod session;
pub mod testing;

#[cfg(feature = "engines")]
pub mod engines;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::CancellationToken;
    pub use crate::classify::{ExclusionReason, ProfileClassifier, DEFAULT_THRESHOLD};
    pub use crate::dedup::Deduplicator;
    pub use crate::dispatcher::{AdapterOutcome, AdapterReport, DispatchOutcome, Dispatcher};
    pub use crate::errors::{AdapterError, AdapterErrorKind, ConfigurationError, MarpleError};
    pub use crate::observability::{init_logging, LogFormat, Verbosity};
    pub use crate::output::{to_pretty_json, write_csv_file, write_json, write_json_file};
    pub use crate::report::{ReportAssembler, ReportDocument, ReportEntry, ReportStatus};
    pub use crate::scoring::JunkScorer;
    pub use crate::search::{
        AggregateResult, DispatchConfig, EngineAdapter, FetchConfig, MarpleConfig,
        RecordSink, ResultRecord, ScoringConfig, SearchQuery,
    };
    pub use crate::session::{SearchOutcome, SearchSession};

    #[cfg(feature = "engines")]
    pub use crate::engines::{EngineContext, EngineRegistry};
}
