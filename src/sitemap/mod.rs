//! Sitemap module: fetching, parsing and recursive expansion
//!
//! - `document`: XML → [`SitemapNode`]
//! - `fetcher`: the [`DocumentFetcher`] seam and its HTTP implementation
//! - `resolver`: depth-first expansion of sitemap indexes

mod document;
mod fetcher;
mod resolver;

pub use document::{parse_sitemap, SitemapNode};
pub use fetcher::{build_http_client, DocumentFetcher, FetchError, HttpFetcher};
pub use resolver::SitemapResolver;
