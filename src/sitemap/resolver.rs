//! Recursive sitemap resolution
//!
//! Expands a sitemap location into the flat, ordered list of page URLs it
//! describes. Sitemap indexes are walked depth-first in document order using
//! an explicit work list, with a randomized pause before every nested fetch.

use crate::config::SitemapConfig;
use crate::jitter::Jitter;
use crate::sitemap::document::{parse_sitemap, SitemapNode};
use crate::sitemap::fetcher::DocumentFetcher;
use crate::{ResolveError, ResolveResult};
use std::collections::HashSet;
use std::sync::Arc;

/// A sitemap location waiting to be fetched
#[derive(Debug)]
struct PendingSitemap {
    location: String,
    depth: u32,
}

/// Resolves sitemap trees into page URL lists
pub struct SitemapResolver {
    fetcher: Arc<dyn DocumentFetcher>,
    jitter: Arc<Jitter>,
    config: SitemapConfig,
}

impl SitemapResolver {
    /// Creates a new resolver
    ///
    /// # Arguments
    ///
    /// * `fetcher` - Source of raw sitemap documents
    /// * `jitter` - Random source for the pause before nested fetches
    /// * `config` - Pacing bounds and depth limit
    pub fn new(fetcher: Arc<dyn DocumentFetcher>, jitter: Arc<Jitter>, config: SitemapConfig) -> Self {
        Self {
            fetcher,
            jitter,
            config,
        }
    }

    /// Resolves `location` into page URLs
    ///
    /// # Ordering
    ///
    /// A `<urlset>` contributes its pages in document order. A
    /// `<sitemapindex>` contributes the full expansion of its first child,
    /// then of its second child, and so on.
    ///
    /// # Loops and depth
    ///
    /// A sitemap location that was already expanded during this call is
    /// skipped, which makes self-referencing indexes terminate. An index
    /// nested more than `max_depth` levels below `location` fails the whole
    /// resolution.
    ///
    /// # Errors
    ///
    /// The first fetch, parse, shape or depth failure anywhere in the tree is
    /// returned and no partial list is produced.
    pub async fn resolve(&self, location: &str) -> ResolveResult<Vec<String>> {
        let mut pending = vec![PendingSitemap {
            location: location.to_string(),
            depth: 0,
        }];
        let mut expanded: HashSet<String> = HashSet::new();
        let mut pages = Vec::new();
        let mut documents = 0usize;

        while let Some(sitemap) = pending.pop() {
            if !expanded.insert(sitemap.location.clone()) {
                tracing::warn!(
                    "Sitemap {} was already expanded, skipping repeated reference",
                    sitemap.location
                );
                continue;
            }

            if sitemap.depth > 0 {
                let pause = self
                    .jitter
                    .delay_between(self.config.delay_min, self.config.delay_max);
                tracing::trace!("Pausing {:?} before fetching {}", pause, sitemap.location);
                tokio::time::sleep(pause).await;
            }

            let node = self.fetch_node(&sitemap.location).await?;
            documents += 1;

            match node {
                SitemapNode::UrlSet(urls) => {
                    tracing::debug!("Sitemap {} lists {} pages", sitemap.location, urls.len());
                    pages.extend(urls);
                }
                SitemapNode::Index(children) => {
                    tracing::debug!(
                        "Sitemap index {} lists {} sitemaps",
                        sitemap.location,
                        children.len()
                    );

                    if !children.is_empty() && sitemap.depth >= self.config.max_depth {
                        return Err(ResolveError::DepthExceeded {
                            location: sitemap.location,
                            max_depth: self.config.max_depth,
                        });
                    }

                    // Reversed so the first child is popped first.
                    let depth = sitemap.depth + 1;
                    pending.extend(
                        children
                            .into_iter()
                            .rev()
                            .map(|location| PendingSitemap { location, depth }),
                    );
                }
            }
        }

        tracing::info!(
            "Resolved {} page URLs from {} sitemap documents",
            pages.len(),
            documents
        );

        Ok(pages)
    }

    /// Fetches and parses a single sitemap document
    async fn fetch_node(&self, location: &str) -> ResolveResult<SitemapNode> {
        let body = self
            .fetcher
            .fetch(location)
            .await
            .map_err(|source| ResolveError::Fetch {
                location: location.to_string(),
                source,
            })?;

        parse_sitemap(location, &body)
    }
}
