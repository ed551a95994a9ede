//! Configuration types for fetching, dispatch and scoring.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use crate::errors::ConfigurationError;

/// Top-level configuration, loadable from a JSON file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarpleConfig {
    /// HTTP settings shared by all engines.
    #[serde(default)]
    pub fetch: FetchConfig,
    /// Concurrency and deadlines.
    #[serde(default)]
    pub dispatch: DispatchConfig,
    /// Junk scoring policy.
    #[serde(default)]
    pub scoring: ScoringConfig,
}

impl MarpleConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a configuration from a JSON file. Missing fields take defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigurationError::ConfigFile {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let config: Self =
            serde_json::from_str(&raw).map_err(|e| ConfigurationError::ConfigFile {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.fetch.validate()?;
        self.dispatch.validate()?;
        self.scoring.compiled_title_patterns()?;
        Ok(())
    }
}

/// Upper bound for any configured timeout or delay.
pub const MAX_TIMEOUT_SECONDS: f64 = 86_400.0;

/// Converts a configured number of seconds, rejecting values that are not
/// positive, not finite or beyond [`MAX_TIMEOUT_SECONDS`].
pub fn checked_seconds(field: &str, seconds: f64) -> Result<Duration, ConfigurationError> {
    if !seconds.is_finite() || seconds <= 0.0 {
        return Err(ConfigurationError::invalid_value(field, "must be a positive number of seconds"));
    }
    if seconds > MAX_TIMEOUT_SECONDS {
        return Err(ConfigurationError::invalid_value(
            field,
            format!("must not exceed {MAX_TIMEOUT_SECONDS} seconds"),
        ));
    }
    Duration::try_from_secs_f64(seconds).map_err(|e| ConfigurationError::invalid_value(field, e.to_string()))
}

/// Lenient conversion for accessors: negative or NaN becomes zero, overflow saturates.
fn saturating_seconds(seconds: f64) -> Duration {
    Duration::try_from_secs_f64(seconds.max(0.0)).unwrap_or(Duration::MAX)
}

/// Configuration for HTTP fetching.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: f64,
    /// User agent string.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Proxy URL applied to every request, e.g. `socks5://127.0.0.1:9050`.
    #[serde(default)]
    pub proxy: Option<String>,
    /// Results requested per engine page.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Retry configuration.
    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_timeout() -> f64 {
    20.0
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0".to_string()
}

fn default_page_size() -> usize {
    50
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout(),
            user_agent: default_user_agent(),
            proxy: None,
            page_size: default_page_size(),
            retry: RetryConfig::default(),
        }
    }
}

impl FetchConfig {
    /// Creates a new fetch configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the timeout.
    #[must_use]
    pub fn with_timeout(mut self, seconds: f64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Sets the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Sets the proxy. An empty string clears it.
    #[must_use]
    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        let proxy = proxy.into();
        self.proxy = if proxy.trim().is_empty() { None } else { Some(proxy) };
        self
    }

    /// Gets timeout as Duration.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        saturating_seconds(self.timeout_seconds)
    }

    /// Checks the timeout, proxy and retry settings.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        checked_seconds("fetch.timeout_seconds", self.timeout_seconds)?;
        if let Some(ref proxy) = self.proxy {
            url::Url::parse(proxy)
                .map_err(|e| ConfigurationError::invalid_proxy(proxy, e.to_string()))?;
        }
        self.retry.validate()
    }
}

/// Retry configuration for failed requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts.
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
    /// Initial delay between retries in seconds.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_seconds: f64,
    /// Backoff multiplier.
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
    /// Maximum delay between retries.
    #[serde(default = "default_max_delay")]
    pub max_delay_seconds: f64,
    /// Whether to randomize each delay between half and the full value.
    #[serde(default = "default_jitter")]
    pub jitter: bool,
    /// Status codes that should trigger a retry.
    #[serde(default = "default_retry_status_codes")]
    pub retry_status_codes: HashSet<u16>,
}

fn default_max_retries() -> usize {
    2
}

fn default_retry_delay() -> f64 {
    1.0
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_max_delay() -> f64 {
    10.0
}

fn default_jitter() -> bool {
    true
}

fn default_retry_status_codes() -> HashSet<u16> {
    [429, 500, 502, 503, 504].into_iter().collect()
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_delay_seconds: default_retry_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            max_delay_seconds: default_max_delay(),
            jitter: default_jitter(),
            retry_status_codes: default_retry_status_codes(),
        }
    }
}

impl RetryConfig {
    /// A configuration that never retries.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Calculates the delay for a given attempt.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: usize) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let delay = self.retry_delay_seconds * self.backoff_multiplier.powi(exponent);
        let capped = delay.min(self.max_delay_seconds).max(0.0);
        let capped = if self.jitter && capped > 0.0 {
            rand::thread_rng().gen_range(capped / 2.0..=capped)
        } else {
            capped
        };
        saturating_seconds(capped)
    }

    /// Checks the delay settings.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        checked_seconds("fetch.retry.retry_delay_seconds", self.retry_delay_seconds)?;
        checked_seconds("fetch.retry.max_delay_seconds", self.max_delay_seconds)?;
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(ConfigurationError::invalid_value(
                "fetch.retry.backoff_multiplier",
                "must be a finite number of at least 1",
            ));
        }
        Ok(())
    }

    /// Whether a status code should trigger a retry.
    #[must_use]
    pub fn should_retry_status(&self, status: u16) -> bool {
        self.retry_status_codes.contains(&status)
    }
}

/// Concurrency limits and deadlines for a dispatch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Maximum adapters running at once.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    /// Time budget for a single adapter.
    #[serde(default = "default_adapter_timeout")]
    pub adapter_timeout_seconds: f64,
    /// Wall-clock budget for the whole run.
    #[serde(default = "default_global_timeout")]
    pub global_timeout_seconds: f64,
    /// How long cancelled adapters get to return before being aborted.
    #[serde(default = "default_cancel_grace")]
    pub cancel_grace_ms: u64,
}

fn default_max_concurrency() -> usize {
    8
}

fn default_adapter_timeout() -> f64 {
    60.0
}

fn default_global_timeout() -> f64 {
    120.0
}

fn default_cancel_grace() -> u64 {
    250
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            adapter_timeout_seconds: default_adapter_timeout(),
            global_timeout_seconds: default_global_timeout(),
            cancel_grace_ms: default_cancel_grace(),
        }
    }
}

impl DispatchConfig {
    /// Creates a dispatch configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the concurrency limit.
    #[must_use]
    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max;
        self
    }

    /// Sets the per-adapter timeout.
    #[must_use]
    pub fn with_adapter_timeout(mut self, timeout: Duration) -> Self {
        self.adapter_timeout_seconds = timeout.as_secs_f64();
        self
    }

    /// Sets the global deadline.
    #[must_use]
    pub fn with_global_timeout(mut self, timeout: Duration) -> Self {
        self.global_timeout_seconds = timeout.as_secs_f64();
        self
    }

    /// Sets the cancellation grace period.
    #[must_use]
    pub fn with_cancel_grace(mut self, grace: Duration) -> Self {
        self.cancel_grace_ms = u64::try_from(grace.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Per-adapter timeout as Duration.
    #[must_use]
    pub fn adapter_timeout(&self) -> Duration {
        saturating_seconds(self.adapter_timeout_seconds)
    }

    /// Global deadline as Duration.
    #[must_use]
    pub fn global_timeout(&self) -> Duration {
        saturating_seconds(self.global_timeout_seconds)
    }

    /// Checks the concurrency limit and both timeouts.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.max_concurrency == 0 {
            return Err(ConfigurationError::invalid_value(
                "dispatch.max_concurrency",
                "must be at least 1",
            ));
        }
        checked_seconds("dispatch.adapter_timeout_seconds", self.adapter_timeout_seconds)?;
        checked_seconds("dispatch.global_timeout_seconds", self.global_timeout_seconds)?;
        Ok(())
    }

    /// Cancellation grace as Duration.
    #[must_use]
    pub fn cancel_grace(&self) -> Duration {
        Duration::from_millis(self.cancel_grace_ms)
    }
}

/// Penalty weights for the junk scorer. All weights are non-negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringWeights {
    /// Target token missing from the URL.
    #[serde(default = "default_url_missing_target")]
    pub url_missing_target: u32,
    /// Empty title.
    #[serde(default = "default_empty_title")]
    pub empty_title: u32,
    /// Boilerplate title.
    #[serde(default = "default_generic_title")]
    pub generic_title: u32,
    /// Domain on the low-value list.
    #[serde(default = "default_low_value_domain")]
    pub low_value_domain: u32,
    /// Snippet without any target token.
    #[serde(default = "default_snippet_missing_target")]
    pub snippet_missing_target: u32,
    /// Per path segment beyond [`ScoringConfig::max_path_depth`].
    #[serde(default = "default_deep_path")]
    pub deep_path: u32,
}

fn default_url_missing_target() -> u32 {
    200
}

fn default_empty_title() -> u32 {
    100
}

fn default_generic_title() -> u32 {
    75
}

fn default_low_value_domain() -> u32 {
    300
}

fn default_snippet_missing_target() -> u32 {
    25
}

fn default_deep_path() -> u32 {
    10
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            url_missing_target: default_url_missing_target(),
            empty_title: default_empty_title(),
            generic_title: default_generic_title(),
            low_value_domain: default_low_value_domain(),
            snippet_missing_target: default_snippet_missing_target(),
            deep_path: default_deep_path(),
        }
    }
}

/// Junk scoring and blocking policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Penalty weights.
    #[serde(default)]
    pub weights: ScoringWeights,
    /// Path depth tolerated before the deep path penalty applies.
    #[serde(default = "default_max_path_depth")]
    pub max_path_depth: usize,
    /// Link aggregators, mirrors and other low-value domains.
    #[serde(default = "default_low_value_domains")]
    pub low_value_domains: Vec<String>,
    /// Domains whose records are always excluded.
    #[serde(default)]
    pub blocklist: Vec<String>,
    /// Case-insensitive regexes matching boilerplate titles.
    #[serde(default = "default_generic_title_patterns")]
    pub generic_title_patterns: Vec<String>,
}

fn default_max_path_depth() -> usize {
    3
}

fn default_low_value_domains() -> Vec<String> {
    [
        "pinterest.com",
        "linktr.ee",
        "allmylinks.com",
        "peekyou.com",
        "spokeo.com",
        "whitepages.com",
        "radaris.com",
        "namecheckr.com",
        "namechk.com",
        "instantusername.com",
        "knowem.com",
        "translate.google.com",
        "webcache.googleusercontent.com",
        "archive.org",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_generic_title_patterns() -> Vec<String> {
    [
        r"^\s*(home|index|untitled|page not found|404.*|access denied|just a moment\.*)\s*$",
        r"^\s*(log\s*in|sign\s*in|sign\s*up|register)\b",
        r"\busername (search|lookup|checker)\b",
        r"\bpeople search\b",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
            max_path_depth: default_max_path_depth(),
            low_value_domains: default_low_value_domains(),
            blocklist: Vec::new(),
            generic_title_patterns: default_generic_title_patterns(),
        }
    }
}

impl ScoringConfig {
    /// Creates a scoring configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the weights.
    #[must_use]
    pub fn with_weights(mut self, weights: ScoringWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Adds a blocked domain.
    #[must_use]
    pub fn with_blocked_domain(mut self, domain: impl Into<String>) -> Self {
        self.blocklist.push(domain.into());
        self
    }

    /// Adds a low-value domain.
    #[must_use]
    pub fn with_low_value_domain(mut self, domain: impl Into<String>) -> Self {
        self.low_value_domains.push(domain.into());
        self
    }

    /// Compiles the generic title patterns.
    pub fn compiled_title_patterns(&self) -> Result<Vec<regex::Regex>, ConfigurationError> {
        self.generic_title_patterns
            .iter()
            .map(|p| {
                regex::RegexBuilder::new(p)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| {
                        ConfigurationError::invalid_value("scoring.generic_title_patterns", e.to_string())
                    })
            })
            .collect()
    }
}
