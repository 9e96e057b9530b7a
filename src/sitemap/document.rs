//! Sitemap document parsing
//!
//! Turns the raw XML of a sitemap into a [`SitemapNode`]. The shape is decided
//! by the root element: `<sitemapindex>` lists further sitemaps, `<urlset>`
//! lists pages. Elements are matched by local name so namespace prefixes
//! (`<sm:urlset>`) are accepted.

use crate::{ResolveError, ResolveResult};
use quick_xml::events::Event;
use quick_xml::Reader;
use url::Url;

/// Root element of a sitemap index
const INDEX_ROOT: &str = "sitemapindex";

/// Root element of a page list
const URLSET_ROOT: &str = "urlset";

/// A parsed sitemap document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SitemapNode {
    /// Locations of child sitemaps, in document order
    Index(Vec<String>),

    /// Locations of pages, in document order
    UrlSet(Vec<String>),
}

impl SitemapNode {
    /// Returns the locations carried by this node
    pub fn locations(&self) -> &[String] {
        match self {
            Self::Index(locs) | Self::UrlSet(locs) => locs,
        }
    }

    /// Returns true if this node points at further sitemaps
    pub fn is_index(&self) -> bool {
        matches!(self, Self::Index(_))
    }
}

/// Which entry element the root expects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Index,
    UrlSet,
    Unknown,
}

impl Shape {
    fn from_root(root: &str) -> Self {
        match root {
            INDEX_ROOT => Self::Index,
            URLSET_ROOT => Self::UrlSet,
            _ => Self::Unknown,
        }
    }

    fn entry_tag(self) -> Option<&'static str> {
        match self {
            Self::Index => Some("sitemap"),
            Self::UrlSet => Some("url"),
            Self::Unknown => None,
        }
    }
}

/// Parses a sitemap document fetched from `location`
///
/// Every entry contributes the text of each of its `loc` children, trimmed
/// and in document order. Relative locations are resolved against
/// `location`; entries without a `loc` are skipped. A single entry yields a
/// one-element list, and a root with no entries yields an empty one.
///
/// # Errors
///
/// * `ResolveError::Xml` - The document is not well-formed XML
/// * `ResolveError::UnrecognizedShape` - The root is neither `<urlset>` nor `<sitemapindex>`
///
/// # Example
///
/// ```
/// use sitemap_walker::sitemap::{parse_sitemap, SitemapNode};
///
/// let xml = r#"<urlset><url><loc>https://example.com/a</loc></url></urlset>"#;
/// let node = parse_sitemap("https://example.com/sitemap.xml", xml).unwrap();
/// assert_eq!(node, SitemapNode::UrlSet(vec!["https://example.com/a".to_string()]));
/// ```
pub fn parse_sitemap(location: &str, xml: &str) -> ResolveResult<SitemapNode> {
    let xml_error = |message: String| ResolveError::Xml {
        location: location.to_string(),
        message,
    };

    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let base = Url::parse(location).ok();
    let mut depth = 0usize;
    let mut root: Option<String> = None;
    let mut shape = Shape::Unknown;
    let mut in_entry = false;
    let mut in_loc = false;
    let mut loc_text = String::new();
    let mut entry_locs: Vec<String> = Vec::new();
    let mut locations = Vec::new();

    loop {
        let event = reader.read_event().map_err(|e| {
            xml_error(format!(
                "{} (at byte {})",
                e,
                reader.buffer_position()
            ))
        })?;

        match event {
            Event::Start(e) => {
                depth += 1;
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();

                if depth == 1 {
                    shape = Shape::from_root(&name);
                    root = Some(name);
                } else if depth == 2 && shape.entry_tag() == Some(name.as_str()) {
                    in_entry = true;
                    entry_locs.clear();
                } else if depth == 3 && in_entry && name == "loc" {
                    in_loc = true;
                    loc_text.clear();
                }
            }
            Event::Empty(e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();

                if depth == 0 {
                    shape = Shape::from_root(&name);
                    root = Some(name);
                } else if depth == 1 && shape.entry_tag() == Some(name.as_str()) {
                    tracing::warn!("Skipping empty <{}> entry in {}", name, location);
                }
            }
            Event::Text(t) => {
                if in_loc {
                    let text = t.unescape().map_err(|e| xml_error(e.to_string()))?;
                    loc_text.push_str(&text);
                }
            }
            Event::CData(c) => {
                if in_loc {
                    loc_text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Event::End(_) => {
                if depth == 3 && in_loc {
                    in_loc = false;
                    entry_locs.push(loc_text.trim().to_string());
                } else if depth == 2 && in_entry {
                    in_entry = false;
                    let before = locations.len();
                    locations.extend(
                        entry_locs
                            .drain(..)
                            .filter_map(|raw| resolve_location(base.as_ref(), &raw)),
                    );
                    if locations.len() == before {
                        tracing::warn!("Skipping entry without <loc> in {}", location);
                    }
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => {
                if depth != 0 {
                    return Err(xml_error(format!(
                        "unexpected end of document inside <{}>",
                        root.as_deref().unwrap_or("?")
                    )));
                }
                break;
            }
            _ => {}
        }
    }

    match shape {
        Shape::Index => Ok(SitemapNode::Index(locations)),
        Shape::UrlSet => Ok(SitemapNode::UrlSet(locations)),
        Shape::Unknown => Err(ResolveError::UnrecognizedShape {
            location: location.to_string(),
            root,
        }),
    }
}

/// Turns raw `loc` text into an absolute location
///
/// Returns `None` for blank text. Relative references are joined onto the
/// document location; anything else unparseable is passed through untouched
/// so the visit reports it.
fn resolve_location(base: Option<&Url>, raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    match Url::parse(raw) {
        Ok(_) => Some(raw.to_string()),
        Err(url::ParseError::RelativeUrlWithoutBase) => match base {
            Some(base) => match base.join(raw) {
                Ok(joined) => Some(joined.to_string()),
                Err(e) => {
                    tracing::debug!("Failed to join {} onto {}: {}", raw, base, e);
                    Some(raw.to_string())
                }
            },
            None => Some(raw.to_string()),
        },
        Err(e) => {
            tracing::debug!("Keeping unparseable location {}: {}", raw, e);
            Some(raw.to_string())
        }
    }
}
