//! Repository for cached pages with the staleness rules baked in.
//!
//! Two TTLs apply: last pages of a resource change often (new replies, new
//! topics) and get the short TTL; earlier pages are effectively historical
//! and get the long one. Demotion handles the case TTLs cannot: when page
//! N+1 appears, the entry for page N used to be "the last page" and is now
//! both mislabelled and stale, so its flag is cleared and its invalidation
//! counter bumped in the same transaction as the save that supersedes it.

use exn::ResultExt;
use mirror_url::{Navi, ResourceKey};
use sqlx::SqlitePool;
use std::time::Duration;
use time::UtcDateTime;
use tracing::debug;

use crate::Database;
use crate::error::{ErrorKind, Result};
use crate::models::{CacheEntry, CacheRow};

/// Repository over the `page_cache` table.
#[derive(Debug, Clone)]
pub struct CacheRepository {
    pool: SqlitePool,
    /// Applied to pages that are not the resource's last page.
    base_ttl: Duration,
    /// Applied to last pages; expected to be much shorter.
    last_page_ttl: Duration,
}

impl CacheRepository {
    pub fn new(db: &Database, base_ttl: Duration, last_page_ttl: Duration) -> Self {
        Self {
            pool: db.pool().clone(),
            base_ttl,
            last_page_ttl,
        }
    }

    /// Store an extracted page under its key, demoting the previously-last
    /// page of the same resource when this save proves a later page exists.
    ///
    /// Saving a non-cacheable kind is a no-op rather than an error; callers
    /// pass everything through and the cache decides what it keeps.
    pub async fn save(
        &self,
        key: &ResourceKey,
        url: &str,
        content: &serde_json::Value,
        navi: &Navi,
    ) -> Result<()> {
        if !key.kind.is_cacheable() {
            debug!(kind = %key.kind, %url, "Not a cacheable kind, skipping save");
            return Ok(());
        }
        let is_last = navi.is_last_page();
        let content = serde_json::to_string(content).or_raise(|| ErrorKind::InvalidData("content"))?;
        let mut tx = self.pool.begin().await.or_raise(|| ErrorKind::Database)?;
        sqlx::query(include_str!("../queries/upsert_page.sql"))
            .bind(key.kind.tag())
            .bind(key.id)
            .bind(i64::from(key.page))
            .bind(url)
            .bind(content)
            .bind(is_last)
            .bind(UtcDateTime::now().unix_timestamp())
            .execute(&mut *tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        if is_last && key.page > 1 {
            // The `is_last_page = 1` guard makes the demotion exactly-once:
            // re-saving page N+1 must not keep punishing page N.
            let demoted = sqlx::query(include_str!("../queries/demote_previous_last.sql"))
                .bind(key.kind.tag())
                .bind(key.id)
                .bind(i64::from(key.page - 1))
                .execute(&mut *tx)
                .await
                .or_raise(|| ErrorKind::Database)?;
            if demoted.rows_affected() > 0 {
                debug!(
                    kind = %key.kind,
                    id = key.id,
                    page = key.page - 1,
                    "Demoted previously-last page"
                );
            }
        }
        tx.commit().await.or_raise(|| ErrorKind::Database)?;
        Ok(())
    }

    /// Load the cached entry for a key, with its `invalid` flag computed
    /// against the applicable TTL and the invalidation counter.
    ///
    /// Returns `None` for keys of non-cacheable kinds without touching the
    /// database.
    pub async fn load(&self, key: &ResourceKey) -> Result<Option<CacheEntry>> {
        if !key.kind.is_cacheable() {
            return Ok(None);
        }
        let row: Option<CacheRow> = sqlx::query_as(include_str!("../queries/get_page.sql"))
            .bind(key.kind.tag())
            .bind(key.id)
            .bind(i64::from(key.page))
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let Some(row) = row else {
            return Ok(None);
        };
        let mut entry = CacheEntry::try_from(row)?;
        let ttl = if entry.is_last_page {
            self.last_page_ttl
        } else {
            self.base_ttl
        };
        let elapsed = UtcDateTime::now() - entry.scraped_at;
        entry.invalid = entry.invalidation_counter > 0 || elapsed > ttl;
        Ok(Some(entry))
    }
}
