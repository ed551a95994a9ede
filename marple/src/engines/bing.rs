//! Bing web search adapter.

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use scraper::Html;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;
use url::Url;

use super::html::{element_text, first_text, selector};
use super::http::HttpFetcher;
use crate::errors::AdapterError;
use crate::search::{EngineAdapter, RecordSink, ResultRecord, SearchQuery};

/// Registry name.
pub const NAME: &str = "bing";

const ENDPOINT: &str = "https://www.bing.com/search";

/// Bing ignores `count` above this.
const MAX_PAGE_SIZE: usize = 50;
const MAX_PAGES: usize = 20;

/// Scrapes paginated Bing result pages.
pub struct BingAdapter {
    fetcher: Arc<dyn HttpFetcher>,
    page_size: usize,
}

impl BingAdapter {
    /// Creates an adapter using `fetcher` for requests.
    #[must_use]
    pub fn new(fetcher: Arc<dyn HttpFetcher>) -> Self {
        Self {
            fetcher,
            page_size: MAX_PAGE_SIZE,
        }
    }

    /// Sets the number of hits requested per page.
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        self
    }

    fn search_url(&self, term: &str, first: usize) -> Result<Url, AdapterError> {
        let count = self.page_size.to_string();
        let first = first.to_string();
        Url::parse_with_params(
            ENDPOINT,
            &[("q", term), ("count", count.as_str()), ("first", first.as_str())],
        )
        .map_err(|e| AdapterError::parse_failure(NAME, e.to_string()))
    }

    fn max_pages(&self, results_count: usize) -> usize {
        results_count.div_ceil(self.page_size).clamp(1, MAX_PAGES)
    }
}

impl std::fmt::Debug for BingAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BingAdapter")
            .field("page_size", &self.page_size)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl EngineAdapter for BingAdapter {
    fn name(&self) -> &str {
        NAME
    }

    async fn query(&self, query: &SearchQuery, sink: &RecordSink) -> Result<(), AdapterError> {
        let max_pages = self.max_pages(query.results_count);

        for term in query.search_terms() {
            let mut seen = HashSet::new();

            for page_index in 0..max_pages {
                if sink.is_full() || sink.is_cancelled() {
                    return Ok(());
                }

                let url = self.search_url(&term, page_index * self.page_size + 1)?;
                let page = tokio::select! {
                    biased;
                    () = sink.cancelled() => return Ok(()),
                    page = self.fetcher.get(url.as_str()) => page.map_err(|e| e.for_engine(NAME))?,
                };

                let records = parse_results(&page.text)?;
                let fresh: Vec<ResultRecord> = records
                    .into_iter()
                    .filter(|r| seen.insert(r.url.clone()))
                    .collect();
                debug!(engine = NAME, term = %term, page = page_index, hits = fresh.len(), "result page parsed");

                // Past the last page Bing repeats earlier hits.
                if fresh.is_empty() {
                    break;
                }
                for record in fresh {
                    if !sink.push(record) {
                        return Ok(());
                    }
                }
            }
        }
        Ok(())
    }
}

/// Extracts organic hits from a result page.
pub(crate) fn parse_results(body: &str) -> Result<Vec<ResultRecord>, AdapterError> {
    let document = Html::parse_document(body);

    let captcha = selector(NAME, "#b_captcha, form#captcha, div.captcha")?;
    if document.select(&captcha).next().is_some() {
        return Err(AdapterError::rate_limited(NAME, "captcha page served"));
    }

    let container = selector(NAME, "#b_results")?;
    if document.select(&container).next().is_none() {
        return Err(AdapterError::parse_failure(NAME, "result list not found"));
    }

    let item = selector(NAME, "li.b_algo")?;
    let link = selector(NAME, "h2 a")?;
    let snippet = selector(NAME, "div.b_caption p, p.b_lineclamp2, p.b_lineclamp3, p.b_lineclamp4")?;

    let mut records = Vec::new();
    for element in document.select(&item) {
        let Some(anchor) = element.select(&link).next() else {
            continue;
        };
        let Some(href) = anchor.value().attr("href").map(str::trim).filter(|h| !h.is_empty()) else {
            continue;
        };
        let url = decode_link(href).unwrap_or_else(|| href.to_string());

        records.push(
            ResultRecord::new(NAME, url, element_text(anchor)).with_snippet(first_text(element, &snippet)),
        );
    }
    Ok(records)
}

/// Unwraps `bing.com/ck/a?...&u=a1<base64url>` click-tracking links.
fn decode_link(href: &str) -> Option<String> {
    let parsed = Url::parse(href.trim()).ok()?;
    let is_tracking = parsed
        .host_str()
        .is_some_and(|host| host.ends_with("bing.com"))
        && parsed.path().starts_with("/ck/");
    if !is_tracking {
        return Some(parsed.to_string());
    }

    let encoded = parsed
        .query_pairs()
        .find(|(key, _)| key == "u")
        .map(|(_, value)| value.into_owned())?;
    let payload = encoded.strip_prefix("a1")?.trim_end_matches('=');
    let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
    String::from_utf8(bytes).ok()
}
