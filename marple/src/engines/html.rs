//! Small helpers over `scraper` shared by the result page parsers.

use scraper::{ElementRef, Selector};

use crate::errors::AdapterError;

/// Parses a CSS selector, attributing failures to `engine`.
pub(crate) fn selector(engine: &str, css: &str) -> Result<Selector, AdapterError> {
    Selector::parse(css).map_err(|e| AdapterError::parse_failure(engine, format!("selector {css:?}: {e}")))
}

/// Visible text of an element with whitespace collapsed.
pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text of the first descendant matching `selector`, or an empty string.
pub(crate) fn first_text(element: ElementRef<'_>, selector: &Selector) -> String {
    element.select(selector).next().map(element_text).unwrap_or_default()
}
