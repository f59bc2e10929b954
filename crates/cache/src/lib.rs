//! SQLite storage for the board mirror.
//!
//! Holds two kinds of state:
//! - **Cached pages**: already-extracted records keyed by
//!   `(kind, phpbb_id, page)`, with the TTL and last-page demotion rules
//!   that decide when a page must be refetched.
//! - **The crawl-queue row**: the single persisted row the scheduler resumes
//!   from after a restart (written by `mirror-queue`, which shares this
//!   crate's [`Database`]).
//!
//! The database is not the source of truth. The board is; everything here
//! can be rebuilt by crawling it again.

mod db;
pub mod error;
mod models;
mod repo;

pub use crate::db::Database;
pub use crate::models::CacheEntry;
pub use crate::repo::CacheRepository;
