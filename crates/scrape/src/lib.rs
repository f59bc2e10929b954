//! Scraping pipeline for the board mirror.
//!
//! Defines the three collaborator seams the crawl core depends on
//! ([`Fetcher`], [`Extractor`], [`Persistence`]) and composes them with the
//! cache into [`PageService`], the fetch/extract/write-through pipeline used
//! by both the front end (`get`) and the crawl scheduler (`scrape`).

pub mod error;

mod extract;
mod fetcher;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
mod persist;
mod service;

pub use crate::extract::{Extraction, Extractor, OutboundLink, PageRecord};
pub use crate::fetcher::{FetchResponse, Fetcher, ProbeResponse};
pub use crate::persist::Persistence;
pub use crate::service::{PageService, ScrapeOutcome, Served};
