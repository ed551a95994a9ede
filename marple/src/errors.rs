//! Error types for marple searches.
//!
//! Three layers exist: [`AdapterError`] is recoverable and never leaves the
//! dispatcher, [`ConfigurationError`] is fatal and raised before dispatch, and
//! [`MarpleError`] is what callers of the library see.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for marple operations.
#[derive(Debug, Error)]
pub enum MarpleError {
    /// Invalid query parameters, engine selection or settings.
    #[error("{0}")]
    Configuration(#[from] ConfigurationError),

    /// Every adapter errored and nothing was collected.
    #[error("All search engines failed: {}", summarize_failures(.failures))]
    AllAdaptersFailed {
        /// The individual adapter failures.
        failures: Vec<AdapterError>,
    },

    /// The report could not be written to its destination.
    #[error("Failed to write output to {}: {source}", .path.display())]
    Output {
        /// The target path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MarpleError {
    /// Creates an output error for the given path.
    #[must_use]
    pub fn output(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Output {
            path: path.into(),
            source,
        }
    }

    /// Whether the error was raised before any network activity.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

fn summarize_failures(failures: &[AdapterError]) -> String {
    if failures.is_empty() {
        return "no engines ran".to_string();
    }
    failures
        .iter()
        .map(|f| format!("{} ({})", f.engine, f.kind))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Classification of a recoverable adapter failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterErrorKind {
    /// The request or the adapter as a whole ran out of time.
    Timeout,
    /// The engine refused further requests.
    RateLimited,
    /// The engine answered with something we could not parse.
    ParseFailure,
    /// The engine could not be reached or answered with an error.
    Unavailable,
}

impl fmt::Display for AdapterErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Timeout => "timeout",
            Self::RateLimited => "rate_limited",
            Self::ParseFailure => "parse_failure",
            Self::Unavailable => "unavailable",
        };
        f.write_str(s)
    }
}

/// A recoverable failure of a single engine adapter.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{engine}: {kind}: {message}")]
pub struct AdapterError {
    /// The engine that failed.
    pub engine: String,
    /// Failure classification.
    pub kind: AdapterErrorKind,
    /// Human readable detail.
    pub message: String,
}

impl AdapterError {
    /// Creates a new adapter error.
    #[must_use]
    pub fn new(
        engine: impl Into<String>,
        kind: AdapterErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            engine: engine.into(),
            kind,
            message: message.into(),
        }
    }

    /// Creates a timeout error.
    #[must_use]
    pub fn timeout(engine: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(engine, AdapterErrorKind::Timeout, message)
    }

    /// Creates a rate-limited error.
    #[must_use]
    pub fn rate_limited(engine: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(engine, AdapterErrorKind::RateLimited, message)
    }

    /// Creates a parse failure error.
    #[must_use]
    pub fn parse_failure(engine: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(engine, AdapterErrorKind::ParseFailure, message)
    }

    /// Creates an unavailable error.
    #[must_use]
    pub fn unavailable(engine: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(engine, AdapterErrorKind::Unavailable, message)
    }

    /// Returns a copy attributed to another engine.
    ///
    /// Shared HTTP plumbing reports errors without knowing which adapter
    /// called it.
    #[must_use]
    pub fn for_engine(mut self, engine: impl Into<String>) -> Self {
        self.engine = engine.into();
        self
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("engine".to_string(), serde_json::json!(self.engine));
        map.insert("kind".to_string(), serde_json::json!(self.kind.to_string()));
        map.insert("message".to_string(), serde_json::json!(self.message));
        map
    }
}

/// Errors raised while validating a search before dispatch.
#[derive(Debug, Clone, Error)]
pub enum ConfigurationError {
    /// An engine name is not in the registry.
    #[error("Unknown engine: {name} (available: {})", available.join(", "))]
    UnknownEngine {
        /// The requested name.
        name: String,
        /// Names known to the registry.
        available: Vec<String>,
    },

    /// The dispatcher was handed no adapters.
    #[error("No search engines selected")]
    NoEngines,

    /// A query or config field has an unusable value.
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue {
        /// The offending field.
        field: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The proxy URL could not be used.
    #[error("Invalid proxy '{proxy}': {reason}")]
    InvalidProxy {
        /// The proxy string as given.
        proxy: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A configuration file could not be loaded.
    #[error("Failed to load config {path}: {reason}")]
    ConfigFile {
        /// The file path.
        path: String,
        /// Why loading failed.
        reason: String,
    },
}

impl ConfigurationError {
    /// Creates an unknown engine error.
    #[must_use]
    pub fn unknown_engine(name: impl Into<String>, available: Vec<String>) -> Self {
        Self::UnknownEngine {
            name: name.into(),
            available,
        }
    }

    /// Creates an invalid value error.
    #[must_use]
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Creates an invalid proxy error.
    #[must_use]
    pub fn invalid_proxy(proxy: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidProxy {
            proxy: proxy.into(),
            reason: reason.into(),
        }
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();

        match self {
            Self::UnknownEngine { name, available } => {
                map.insert("type".to_string(), serde_json::json!("UnknownEngine"));
                map.insert("name".to_string(), serde_json::json!(name));
                map.insert("available".to_string(), serde_json::json!(available));
            }
            Self::NoEngines => {
                map.insert("type".to_string(), serde_json::json!("NoEngines"));
            }
            Self::InvalidValue { field, reason } => {
                map.insert("type".to_string(), serde_json::json!("InvalidValue"));
                map.insert("field".to_string(), serde_json::json!(field));
                map.insert("reason".to_string(), serde_json::json!(reason));
            }
            Self::InvalidProxy { proxy, reason } => {
                map.insert("type".to_string(), serde_json::json!("InvalidProxy"));
                map.insert("proxy".to_string(), serde_json::json!(proxy));
                map.insert("reason".to_string(), serde_json::json!(reason));
            }
            Self::ConfigFile { path, reason } => {
                map.insert("type".to_string(), serde_json::json!("ConfigFile"));
                map.insert("path".to_string(), serde_json::json!(path));
                map.insert("reason".to_string(), serde_json::json!(reason));
            }
        }

        map.insert("message".to_string(), serde_json::json!(self.to_string()));
        map
    }
}
