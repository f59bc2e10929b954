use serde::{Deserialize, Serialize};
use url::Url;

use crate::kind::PageKind;
use crate::route;

/// Identity of a cacheable resource: what it is, which one it is, and which
/// page of it. There is at most one live cache row per key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceKey {
    pub kind: PageKind,
    pub id: i64,
    /// 1-based display page.
    pub page: u32,
}

impl ResourceKey {
    pub fn new(kind: PageKind, id: i64, page: u32) -> Self {
        Self {
            kind,
            id,
            page: page.max(1),
        }
    }

    /// Derives the key from a URL's canonical form. `None` for kinds that
    /// are never cached, and for cacheable kinds whose id parameter is
    /// absent (a slug-only forum reference carries no numeric identity).
    pub fn from_url(url: &Url) -> Option<Self> {
        let canonical = route::rewrite(url);
        let kind = route::classify(&canonical);
        let id = match kind {
            PageKind::Root => 0,
            PageKind::Forum => route::numeric_param(&canonical, "f")?,
            PageKind::Topic => route::numeric_param(&canonical, "t")?,
            PageKind::Group => route::numeric_param(&canonical, "g")?,
            PageKind::User => route::numeric_param(&canonical, "u")?,
            _ => return None,
        };
        let start = route::numeric_param(&canonical, "start").unwrap_or(0) as u32;
        let page = start / kind.elements_per_page() + 1;
        Some(Self::new(kind, id, page))
    }

    /// The same resource at another display page.
    pub fn at_page(self, page: u32) -> Self {
        Self::new(self.kind, self.id, page)
    }
}
