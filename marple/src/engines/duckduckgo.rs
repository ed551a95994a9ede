//! DuckDuckGo HTML endpoint adapter.

use async_trait::async_trait;
use scraper::Html;
use std::sync::Arc;
use tracing::debug;
use url::Url;

use super::html::{element_text, first_text, selector};
use super::http::HttpFetcher;
use crate::errors::AdapterError;
use crate::search::{EngineAdapter, RecordSink, ResultRecord, SearchQuery};

/// Registry name.
pub const NAME: &str = "duckduckgo";

const ENDPOINT: &str = "https://html.duckduckgo.com/html/";
const REDIRECT_BASE: &str = "https://duckduckgo.com/";

/// Scrapes the JavaScript-free DuckDuckGo result page.
pub struct DuckDuckGoAdapter {
    fetcher: Arc<dyn HttpFetcher>,
}

impl DuckDuckGoAdapter {
    /// Creates an adapter using `fetcher` for requests.
    #[must_use]
    pub fn new(fetcher: Arc<dyn HttpFetcher>) -> Self {
        Self { fetcher }
    }

    fn search_url(term: &str) -> Result<Url, AdapterError> {
        Url::parse_with_params(ENDPOINT, &[("q", term)])
            .map_err(|e| AdapterError::parse_failure(NAME, e.to_string()))
    }
}

impl std::fmt::Debug for DuckDuckGoAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuckDuckGoAdapter").finish_non_exhaustive()
    }
}

#[async_trait]
impl EngineAdapter for DuckDuckGoAdapter {
    fn name(&self) -> &str {
        NAME
    }

    async fn query(&self, query: &SearchQuery, sink: &RecordSink) -> Result<(), AdapterError> {
        for term in query.search_terms() {
            if sink.is_full() || sink.is_cancelled() {
                break;
            }

            let url = Self::search_url(&term)?;
            let page = tokio::select! {
                biased;
                () = sink.cancelled() => return Ok(()),
                page = self.fetcher.get(url.as_str()) => page.map_err(|e| e.for_engine(NAME))?,
            };

            let records = parse_results(&page.text)?;
            debug!(engine = NAME, term = %term, hits = records.len(), "result page parsed");

            for record in records {
                if !sink.push(record) {
                    return Ok(());
                }
            }
        }
        Ok(())
    }
}

/// Extracts organic hits from a result page.
///
/// A bot-check page is reported as rate limiting. A page with neither a
/// result list nor a "no results" marker is a parse failure.
pub(crate) fn parse_results(body: &str) -> Result<Vec<ResultRecord>, AdapterError> {
    let document = Html::parse_document(body);

    let challenge = selector(NAME, "form#challenge-form, div.anomaly-modal__modal")?;
    if document.select(&challenge).next().is_some() {
        return Err(AdapterError::rate_limited(NAME, "blocked by bot check"));
    }

    let container = selector(NAME, "div#links, div.results, div.serp__results")?;
    let no_results = selector(NAME, "div.no-results")?;
    let result = selector(NAME, "div.result")?;
    let link = selector(NAME, "a.result__a")?;
    let snippet = selector(NAME, ".result__snippet")?;

    if document.select(&container).next().is_none() && document.select(&no_results).next().is_none() {
        return Err(AdapterError::parse_failure(NAME, "unexpected result page layout"));
    }

    let mut records = Vec::new();
    for element in document.select(&result) {
        if element.value().classes().any(|c| c == "result--ad") {
            continue;
        }
        let Some(anchor) = element.select(&link).next() else {
            continue;
        };
        let Some(url) = anchor.value().attr("href").and_then(decode_link) else {
            continue;
        };

        records.push(
            ResultRecord::new(NAME, url, element_text(anchor)).with_snippet(first_text(element, &snippet)),
        );
    }
    Ok(records)
}

/// Resolves DuckDuckGo's `/l/?uddg=` redirect links to their target.
///
/// Empty hrefs and links back into DuckDuckGo itself yield `None`.
fn decode_link(href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    let base = Url::parse(REDIRECT_BASE).ok()?;
    let parsed = base.join(href).ok()?;

    if parsed.path().starts_with("/l/") {
        return parsed
            .query_pairs()
            .find(|(key, _)| key == "uddg")
            .map(|(_, value)| value.into_owned())
            .filter(|target| !target.is_empty());
    }
    if is_duckduckgo_host(&parsed) {
        return None;
    }
    Some(parsed.to_string())
}

fn is_duckduckgo_host(url: &Url) -> bool {
    url.host_str()
        .is_some_and(|host| host == "duckduckgo.com" || host.ends_with(".duckduckgo.com"))
}
