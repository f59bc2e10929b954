//! The extraction seam and the models that cross it.
//!
//! Extraction itself is template-bound data mapping and lives outside this
//! workspace; the crawl core only cares about the record, the outbound
//! links, and the pagination widget numbers.

use mirror_url::PageKind;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::Result;

/// A link found in a page body, already classified by the extractor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundLink {
    pub url: String,
    pub kind: PageKind,
}

/// The structured record extracted from one page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRecord {
    pub kind: PageKind,
    /// The board's numeric id, when the page has one.
    pub id: Option<i64>,
    pub title: Option<String>,
    /// Canonical URL the record was extracted from.
    pub url: String,
    /// Template-specific fields, opaque to the crawl core.
    pub content: serde_json::Value,
}

/// Everything extraction produces from one body.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// `None` when the body carried nothing worth keeping (deleted user,
    /// permission wall). Such pages still contribute links.
    pub record: Option<PageRecord>,
    pub links: Vec<OutboundLink>,
    /// Current page as reported by the pagination widget; 0 when the widget
    /// is absent.
    pub widget_page: u32,
    /// Total pages as reported by the widget; 0 when absent.
    pub widget_pages: u32,
}

/// Extraction collaborator. Pure data mapping over the body; a shape the
/// templates don't cover is an [`ErrorKind::Extract`](crate::error::ErrorKind::Extract).
pub trait Extractor: Send + Sync {
    fn extract(&self, kind: PageKind, url: &Url, body: &str) -> Result<Extraction>;
}

impl<T: Extractor + ?Sized> Extractor for std::sync::Arc<T> {
    fn extract(&self, kind: PageKind, url: &Url, body: &str) -> Result<Extraction> {
        (**self).extract(kind, url, body)
    }
}
