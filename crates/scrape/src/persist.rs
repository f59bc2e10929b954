//! The persistence seam. Entity tables and their schema live outside this
//! workspace.

use async_trait::async_trait;

use crate::error::Result;
use crate::extract::PageRecord;

/// Persistence collaborator for extracted records.
#[async_trait]
pub trait Persistence: Send + Sync {
    /// Store an extracted record.
    async fn save(&self, record: &PageRecord) -> Result<()>;

    /// Store the raw, un-rendered content of a post. Fetched separately
    /// because the rendered page view only exposes formatted output.
    async fn save_post_content(&self, post_id: i64, raw: &str) -> Result<()>;

    /// Resolve a numeric post id to the already-known URL of its containing
    /// page, sparing a re-discovery round trip.
    async fn known_url_for(&self, post_id: i64) -> Result<Option<String>>;
}

// Shared between the page service and the posts sequence.
#[async_trait]
impl<T: Persistence + ?Sized> Persistence for std::sync::Arc<T> {
    async fn save(&self, record: &PageRecord) -> Result<()> {
        (**self).save(record).await
    }

    async fn save_post_content(&self, post_id: i64, raw: &str) -> Result<()> {
        (**self).save_post_content(post_id, raw).await
    }

    async fn known_url_for(&self, post_id: i64) -> Result<Option<String>> {
        (**self).known_url_for(post_id).await
    }
}
