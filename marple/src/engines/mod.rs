//! Built-in search engine adapters.
//!
//! Each adapter scrapes one public result page over a shared [`HttpFetcher`].
//! The [`EngineRegistry`] maps engine names to adapter factories.

mod bing;
mod duckduckgo;
mod html;
mod http;
mod registry;

pub use bing::BingAdapter;
pub use duckduckgo::DuckDuckGoAdapter;
pub use http::{FetchResult, HttpFetcher, ReqwestFetcher};
pub use registry::{AdapterFactory, EngineContext, EngineRegistry};
