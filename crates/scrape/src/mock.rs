//! In-memory collaborators for testing.
//!
//! State sits in maps behind locks, so all trait methods work on `&self`
//! without external synchronisation. Unconfigured URLs answer with a
//! connection-refused error, which doubles as the "backend down" fixture.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock as SyncRwLock;
use tokio::sync::RwLock;
use url::Url;

use mirror_url::PageKind;

use crate::error::{ErrorKind, Result};
use crate::extract::{Extraction, Extractor, PageRecord};
use crate::fetcher::{FetchResponse, Fetcher, ProbeResponse};
use crate::persist::Persistence;

type Canned<T> = std::result::Result<T, ErrorKind>;

/// Scripted [`Fetcher`] answering from per-URL tables and logging every
/// request it receives.
#[derive(Default)]
pub struct MockFetcher {
    pages: RwLock<HashMap<String, Canned<FetchResponse>>>,
    probes: RwLock<HashMap<String, Canned<ProbeResponse>>>,
    log: RwLock<Vec<String>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a body for a URL.
    pub async fn page(&self, url: &str, status: u16, body: &str) {
        self.pages.write().await.insert(
            url.to_string(),
            Ok(FetchResponse { status, body: body.to_string() }),
        );
    }

    /// Script a fetch failure for a URL.
    pub async fn page_error(&self, url: &str, kind: ErrorKind) {
        self.pages.write().await.insert(url.to_string(), Err(kind));
    }

    /// Script a probe redirect, the "id exists" answer.
    pub async fn redirect(&self, url: &str, location: &str) {
        // A broken location URL means broken test setup; panic is fine here.
        let location = Url::parse(location).expect("mock redirect location must parse");
        self.probes.write().await.insert(
            url.to_string(),
            Ok(ProbeResponse { status: 301, location: Some(location) }),
        );
    }

    /// Script a non-redirect probe answer.
    pub async fn probe_status(&self, url: &str, status: u16) {
        self.probes
            .write()
            .await
            .insert(url.to_string(), Ok(ProbeResponse { status, location: None }));
    }

    /// Script a probe transport failure.
    pub async fn probe_error(&self, url: &str, kind: ErrorKind) {
        self.probes.write().await.insert(url.to_string(), Err(kind));
    }

    /// Every URL fetched or probed, in order.
    pub async fn requests(&self) -> Vec<String> {
        self.log.read().await.clone()
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchResponse> {
        self.log.write().await.push(url.to_string());
        match self.pages.read().await.get(url.as_str()) {
            Some(Ok(response)) => Ok(response.clone()),
            Some(Err(kind)) => Err(exn::Exn::from(*kind)),
            None => Err(exn::Exn::from(ErrorKind::ConnectionRefused)),
        }
    }

    async fn probe(&self, url: &Url) -> Result<ProbeResponse> {
        self.log.write().await.push(url.to_string());
        match self.probes.read().await.get(url.as_str()) {
            Some(Ok(response)) => Ok(response.clone()),
            Some(Err(kind)) => Err(exn::Exn::from(*kind)),
            None => Err(exn::Exn::from(ErrorKind::ConnectionRefused)),
        }
    }
}

/// Scripted [`Extractor`] keyed by URL. Unscripted URLs yield an empty
/// extraction, which reads as "nothing worth keeping on this page".
#[derive(Default)]
pub struct MockExtractor {
    extractions: SyncRwLock<HashMap<String, Canned<Extraction>>>,
}

impl MockExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extraction(&self, url: &str, extraction: Extraction) {
        self.extractions
            .write()
            .expect("extractor lock")
            .insert(url.to_string(), Ok(extraction));
    }

    pub fn failure(&self, url: &str) {
        self.extractions
            .write()
            .expect("extractor lock")
            .insert(url.to_string(), Err(ErrorKind::Extract));
    }
}

impl Extractor for MockExtractor {
    fn extract(&self, _kind: PageKind, url: &Url, _body: &str) -> Result<Extraction> {
        match self.extractions.read().expect("extractor lock").get(url.as_str()) {
            Some(Ok(extraction)) => Ok(extraction.clone()),
            Some(Err(kind)) => Err(exn::Exn::from(*kind)),
            None => Ok(Extraction::default()),
        }
    }
}

/// In-memory [`Persistence`] recording everything it is handed.
#[derive(Default)]
pub struct MemoryPersistence {
    records: RwLock<Vec<PageRecord>>,
    post_contents: RwLock<HashMap<i64, String>>,
    known_urls: RwLock<HashMap<i64, String>>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn records(&self) -> Vec<PageRecord> {
        self.records.read().await.clone()
    }

    pub async fn post_contents(&self) -> HashMap<i64, String> {
        self.post_contents.read().await.clone()
    }

    /// Seed the post-id lookup table.
    pub async fn known_url(&self, post_id: i64, url: &str) {
        self.known_urls.write().await.insert(post_id, url.to_string());
    }
}

#[async_trait]
impl Persistence for MemoryPersistence {
    async fn save(&self, record: &PageRecord) -> Result<()> {
        self.records.write().await.push(record.clone());
        Ok(())
    }

    async fn save_post_content(&self, post_id: i64, raw: &str) -> Result<()> {
        self.post_contents.write().await.insert(post_id, raw.to_string());
        Ok(())
    }

    async fn known_url_for(&self, post_id: i64) -> Result<Option<String>> {
        Ok(self.known_urls.read().await.get(&post_id).cloned())
    }
}
