//! URL routing for the board mirror.
//!
//! The mirrored board exposes two address spaces for the same resources:
//! human-friendly "pretty" paths (`/general-discussion-f12/page100.html`)
//! and the underlying canonical query-parameter form
//! (`/viewforum.php?f=12&start=100`). Classification, cache keys and
//! pagination all work on the canonical form, because slugs get renamed and
//! numeric ids do not.
//!
//! # Architecture
//! - [`route`]: the ordered rewrite-rule table (pretty → canonical) and
//!   rewrite-stable classification into a [`PageKind`].
//! - [`ResourceKey`]: `(kind, id, page)` identity of a cacheable resource,
//!   derived from the canonical form only.
//! - [`Navi`]: first/prev/next/last navigation computed from the pagination
//!   widget numbers reported by an extracted page.

pub mod kind;
pub mod navi;
pub mod route;

mod key;

pub use crate::key::ResourceKey;
pub use crate::kind::PageKind;
pub use crate::navi::Navi;
pub use crate::route::{classify, parse_link, post_id, rewrite, rules};
