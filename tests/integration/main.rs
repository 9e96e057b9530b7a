//! Integration tests for Sitemap-Walker
//!
//! These tests serve sitemaps from wiremock servers and drive the crawl
//! end-to-end against an in-memory browser.

mod crawl_tests;
mod resolver_tests;
mod support;
