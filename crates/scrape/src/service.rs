//! The cache-aware page service.
//!
//! `get` is what the front end calls; `scrape` is the fetch half of it,
//! reused directly by the crawl scheduler. Cache and persistence writes are
//! best-effort: a record that failed to persist is still perfectly usable by
//! the caller holding it.

use mirror_cache::{CacheEntry, CacheRepository};
use mirror_url::{Navi, PageKind, ResourceKey, route};
use tracing::{debug, warn};
use url::Url;

use crate::error::{ErrorKind, Result};
use crate::extract::{Extractor, OutboundLink, PageRecord};
use crate::fetcher::Fetcher;
use crate::persist::Persistence;

/// Result of one live scrape: the extracted record plus everything the
/// scheduler needs to keep crawling (links to harvest, pagination to drain).
#[derive(Debug, Clone)]
pub struct ScrapeOutcome {
    pub kind: PageKind,
    /// Cache key the page was stored under; `None` for kinds that are never
    /// cached or pages without a numeric id.
    pub key: Option<ResourceKey>,
    pub record: Option<PageRecord>,
    pub navi: Navi,
    pub links: Vec<OutboundLink>,
    /// Canonical URL that was actually fetched.
    pub url: Url,
}

/// What a `get` ended up serving.
#[derive(Debug)]
pub enum Served {
    /// A cache entry still inside its TTL.
    Cached(CacheEntry),
    /// A fresh scrape.
    Live(Box<ScrapeOutcome>),
    /// An expired or demoted cache entry, served because the refetch failed.
    Stale(CacheEntry),
}

/// Fetch, extract and write-through pipeline over the collaborator seams.
#[derive(Debug, Clone)]
pub struct PageService<F, E, P> {
    fetcher: F,
    extractor: E,
    persistence: P,
    cache: CacheRepository,
}

impl<F: Fetcher, E: Extractor, P: Persistence> PageService<F, E, P> {
    pub fn new(fetcher: F, extractor: E, persistence: P, cache: CacheRepository) -> Self {
        Self {
            fetcher,
            extractor,
            persistence,
            cache,
        }
    }

    /// Serve a page, preferring the cache.
    ///
    /// A valid cache entry is served as-is. A missing or invalid entry
    /// triggers a live scrape; if that fails and an invalid entry exists,
    /// the stale entry is served instead of the error. `nocache` skips the
    /// cache read entirely.
    pub async fn get(&self, url: &Url, nocache: bool) -> Result<Served> {
        let key = ResourceKey::from_url(url);
        let cached = match (&key, nocache) {
            (Some(key), false) => match self.cache.load(key).await {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(error = %err, %url, "Cache read failed, treating as miss");
                    None
                },
            },
            _ => None,
        };
        let stale = match cached {
            Some(entry) if !entry.invalid => return Ok(Served::Cached(entry)),
            other => other,
        };
        let target = self.resolve(url).await;
        match self.scrape(&target).await {
            Ok(outcome) => Ok(Served::Live(Box::new(outcome))),
            Err(err) => match stale {
                Some(entry) => {
                    warn!(error = %err, %url, "Refetch failed, serving stale entry");
                    Ok(Served::Stale(entry))
                },
                None => Err(err),
            },
        }
    }

    /// Fetch one page, extract it, and write the record through to the
    /// cache and persistence. Write failures are logged and swallowed;
    /// extraction failures propagate.
    pub async fn scrape(&self, url: &Url) -> Result<ScrapeOutcome> {
        let canonical = route::rewrite(url);
        let kind = route::classify(&canonical);
        let response = self.fetcher.fetch(&canonical).await?;
        match response.status {
            // A 404 body still renders the board chrome; the extractor
            // decides whether anything in it is worth keeping.
            200 | 404 => {},
            status => exn::bail!(ErrorKind::Status(status)),
        }
        if response.body.is_empty() {
            exn::bail!(ErrorKind::NoContent);
        }
        let extraction = self
            .extractor
            .extract(kind, &canonical, &response.body)?;
        let navi = Navi::compute(
            kind,
            &canonical,
            extraction.widget_page,
            extraction.widget_pages,
        );
        let key = ResourceKey::from_url(&canonical).map(|key| key.at_page(navi.page));
        if let (Some(key), Some(record)) = (&key, &extraction.record) {
            if let Err(err) = self
                .cache
                .save(key, canonical.as_str(), &record.content, &navi)
                .await
            {
                warn!(error = %err, url = %canonical, "Cache write failed");
            }
            if let Err(err) = self.persistence.save(record).await {
                warn!(error = %err, url = %canonical, "Persistence write failed");
            }
        }
        debug!(
            %kind,
            url = %canonical,
            page = navi.page,
            pages = navi.pages,
            links = extraction.links.len(),
            "Scraped page"
        );
        Ok(ScrapeOutcome {
            kind,
            key,
            record: extraction.record,
            navi,
            links: extraction.links,
            url: canonical,
        })
    }

    /// Bare post references (`p` but no `t`) are resolved through the
    /// persistence lookup when the post is already known, skipping a
    /// redirect round trip against the backend.
    async fn resolve(&self, url: &Url) -> Url {
        let canonical = route::rewrite(url);
        if route::numeric_param(&canonical, "t").is_some() {
            return canonical;
        }
        let Some(post) = route::post_id(&canonical) else {
            return canonical;
        };
        match self.persistence.known_url_for(post).await {
            Ok(Some(known)) => match Url::parse(&known) {
                Ok(resolved) => route::rewrite(&resolved),
                Err(_) => {
                    warn!(post, url = %known, "Known post URL failed to parse");
                    canonical
                },
            },
            Ok(None) => canonical,
            Err(err) => {
                warn!(error = %err, post, "Post URL lookup failed");
                canonical
            },
        }
    }
}
