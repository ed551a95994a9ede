//! Static name to adapter mapping.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::bing::{self, BingAdapter};
use super::duckduckgo::{self, DuckDuckGoAdapter};
use super::http::{HttpFetcher, ReqwestFetcher};
use crate::errors::ConfigurationError;
use crate::search::{EngineAdapter, FetchConfig};

/// Shared inputs handed to every adapter factory.
#[derive(Clone)]
pub struct EngineContext {
    /// HTTP client used by scraping adapters.
    pub fetcher: Arc<dyn HttpFetcher>,
    /// Fetch settings, including page size.
    pub fetch: FetchConfig,
}

impl EngineContext {
    /// Builds a context backed by a reqwest client.
    pub fn from_config(fetch: FetchConfig) -> Result<Self, ConfigurationError> {
        let fetcher = ReqwestFetcher::new(fetch.clone())?;
        Ok(Self {
            fetcher: Arc::new(fetcher),
            fetch,
        })
    }

    /// Builds a context around an existing fetcher.
    #[must_use]
    pub fn with_fetcher(fetcher: Arc<dyn HttpFetcher>, fetch: FetchConfig) -> Self {
        Self { fetcher, fetch }
    }
}

impl std::fmt::Debug for EngineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineContext")
            .field("fetch", &self.fetch)
            .finish_non_exhaustive()
    }
}

/// Constructs an adapter from the shared context.
pub type AdapterFactory = fn(&EngineContext) -> Arc<dyn EngineAdapter>;

/// Registry of available engines.
///
/// Names can be listed without constructing any adapter, which lets the CLI
/// validate `--engines` before any network setup.
#[derive(Clone, Default)]
pub struct EngineRegistry {
    factories: BTreeMap<&'static str, AdapterFactory>,
}

impl std::fmt::Debug for EngineRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineRegistry")
            .field("engines", &self.names())
            .finish()
    }
}

fn build_bing(ctx: &EngineContext) -> Arc<dyn EngineAdapter> {
    Arc::new(BingAdapter::new(ctx.fetcher.clone()).with_page_size(ctx.fetch.page_size))
}

fn build_duckduckgo(ctx: &EngineContext) -> Arc<dyn EngineAdapter> {
    Arc::new(DuckDuckGoAdapter::new(ctx.fetcher.clone()))
}

impl EngineRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in engines.
    #[must_use]
    pub fn builtin() -> Self {
        Self::new()
            .register(bing::NAME, build_bing)
            .register(duckduckgo::NAME, build_duckduckgo)
    }

    /// Adds or replaces an engine.
    #[must_use]
    pub fn register(mut self, name: &'static str, factory: AdapterFactory) -> Self {
        self.factories.insert(name, factory);
        self
    }

    /// Registered names in sorted order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.factories.keys().copied().collect()
    }

    /// Whether `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Checks a selection without building anything.
    pub fn validate(&self, selection: &[String]) -> Result<(), ConfigurationError> {
        if let Some(unknown) = selection.iter().find(|name| !self.contains(name)) {
            return Err(ConfigurationError::unknown_engine(
                unknown.clone(),
                self.names().into_iter().map(String::from).collect(),
            ));
        }
        Ok(())
    }

    /// Builds adapters for `selection`, or for every engine when it is empty.
    ///
    /// Repeated names are built once, keeping the first position.
    pub fn build(
        &self,
        selection: &[String],
        ctx: &EngineContext,
    ) -> Result<Vec<Arc<dyn EngineAdapter>>, ConfigurationError> {
        self.validate(selection)?;

        let names: Vec<&str> = if selection.is_empty() {
            self.names()
        } else {
            let mut names: Vec<&str> = Vec::new();
            for name in selection {
                if !names.contains(&name.as_str()) {
                    names.push(name.as_str());
                }
            }
            names
        };

        if names.is_empty() {
            return Err(ConfigurationError::NoEngines);
        }

        Ok(names
            .into_iter()
            .filter_map(|name| self.factories.get(name))
            .map(|factory| factory(ctx))
            .collect())
    }
}
