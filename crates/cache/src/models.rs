//! Row and model types for the page cache.

use exn::ResultExt;
use mirror_url::{PageKind, ResourceKey};
use time::UtcDateTime;

use crate::error::{Error, ErrorKind};

/// A cached, already-extracted page as handed back to callers.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub key: ResourceKey,
    /// Canonical URL the content was scraped from.
    pub url: String,
    /// Opaque extracted record, exactly as the extractor produced it.
    pub content: serde_json::Value,
    pub scraped_at: UtcDateTime,
    pub is_last_page: bool,
    pub invalidation_counter: u32,
    /// Set by the load path: the entry should be refetched. Invalid entries
    /// are still returned so callers can fall back to stale content when a
    /// refetch fails.
    pub invalid: bool,
}

#[derive(sqlx::FromRow)]
pub(crate) struct CacheRow {
    pub(crate) kind: String,
    pub(crate) phpbb_id: i64,
    pub(crate) page: i64,
    pub(crate) url: String,
    pub(crate) content: String,
    pub(crate) is_last_page: i64,
    pub(crate) invalidation_counter: i64,
    pub(crate) scraped_at: i64,
}

impl TryFrom<CacheRow> for CacheEntry {
    type Error = Error;
    fn try_from(row: CacheRow) -> Result<Self, Self::Error> {
        let kind = PageKind::from_tag(&row.kind)
            .ok_or_else(|| exn::Exn::from(ErrorKind::InvalidData("kind tag")))?;
        let page = u32::try_from(row.page).or_raise(|| ErrorKind::InvalidData("page"))?;
        Ok(Self {
            key: ResourceKey::new(kind, row.phpbb_id, page),
            url: row.url,
            content: serde_json::from_str(&row.content)
                .or_raise(|| ErrorKind::InvalidData("content"))?,
            scraped_at: UtcDateTime::from_unix_timestamp(row.scraped_at)
                .or_raise(|| ErrorKind::InvalidData("scrape date"))?,
            is_last_page: row.is_last_page != 0,
            invalidation_counter: u32::try_from(row.invalidation_counter)
                .or_raise(|| ErrorKind::InvalidData("invalidation counter"))?,
            // Staleness is the repository's call, made against its TTLs.
            invalid: false,
        })
    }
}
