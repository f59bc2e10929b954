//! The crawl scheduler: a resumable round-robin driver over the discovery
//! sequences and the current pagination cursor.
//!
//! One tick is one scheduling decision and at most one content fetch. A
//! pending pagination cursor always outranks the sequences, so a multi-page
//! resource is drained consecutively instead of being interleaved with new
//! discoveries. Pacing is multiplicative both ways: errors stretch the
//! inter-tick interval toward a ceiling, successes shrink it back to the
//! configured floor.

use std::time::Duration;

use mirror_scrape::{Extractor, Fetcher, OutboundLink, PageService, Persistence, ScrapeOutcome};
use mirror_url::{Navi, PageKind, ResourceKey, route};
use tokio::sync::watch;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::Result;
use crate::sequence::{Outcome, Sequence, SequenceKind};
use crate::store::QueueStore;

const FORUMS: usize = 0;
const GROUPS: usize = 1;
const USERS: usize = 2;
const POSTS: usize = 3;

/// Adaptive inter-tick delay.
///
/// Backend trouble stretches the interval by 10% per error up to the
/// ceiling; each success shrinks it by 10% until it settles back on the
/// floor. Slow enough to stop hammering a struggling backend, fast enough
/// that one transient error never stalls the crawl for long.
#[derive(Debug, Clone)]
pub struct Pacing {
    base: Duration,
    max: Duration,
    current: Duration,
}

impl Pacing {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self { base, max, current: base }
    }

    pub fn current(&self) -> Duration {
        self.current
    }

    pub fn backoff(&mut self) {
        self.current = self.current.mul_f64(1.1).min(self.max);
    }

    pub fn recover(&mut self) {
        if self.current > self.base {
            self.current = self.current.mul_f64(0.9).max(self.base);
        }
    }
}

/// Round-robin crawl driver. Owns the queue state exclusively; everything
/// else reaches the database through its own repository.
pub struct Scheduler<F, E, P> {
    service: PageService<F, E, P>,
    fetcher: F,
    persistence: P,
    store: QueueStore,
    origin: Url,
    sequences: [Sequence; 4],
    run_id: i64,
    active: usize,
    /// Pagination cursor of the resource currently being drained.
    cursor: Option<Navi>,
    pacing: Pacing,
    persist_interval: Duration,
}

impl<F, E, P> Scheduler<F, E, P>
where
    F: Fetcher,
    E: Extractor,
    P: Persistence,
{
    /// Build a scheduler resuming from the persisted queue row. Sequence
    /// columns that were never written start from fresh state.
    pub async fn resume(
        service: PageService<F, E, P>,
        fetcher: F,
        persistence: P,
        store: QueueStore,
        origin: Url,
        pacing: Pacing,
        persist_interval: Duration,
    ) -> Result<Self> {
        let persisted = store.load().await?;
        let sequences = [
            Sequence::new(SequenceKind::Forums, &origin, persisted.forums),
            Sequence::new(SequenceKind::Groups, &origin, persisted.groups),
            Sequence::new(SequenceKind::Users, &origin, persisted.users),
            Sequence::new(SequenceKind::Posts, &origin, persisted.posts),
        ];
        Ok(Self {
            service,
            fetcher,
            persistence,
            store,
            origin,
            sequences,
            run_id: persisted.run_id,
            active: persisted.active_index.min(POSTS),
            cursor: None,
            pacing,
            persist_interval,
        })
    }

    /// Drive ticks until the shutdown channel fires, persisting the queue
    /// row and logging stats on a timer.
    ///
    /// State is persisted periodically, not per tick: a crash replays the
    /// ticks since the last persist. That at-least-once window is accepted;
    /// every operation a replayed tick performs is an idempotent upsert.
    /// Shutdown is only observed between ticks; an in-flight fetch always
    /// settles first.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        info!(origin = %self.origin, run_id = self.run_id, "Scheduler running");
        let mut persist_timer = tokio::time::interval(self.persist_interval);
        persist_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // An interval's first tick completes immediately; consume it so the
        // first persist lands one full period in.
        persist_timer.tick().await;
        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.pacing.current()) => self.tick().await,
                _ = persist_timer.tick() => {
                    if let Err(err) = self.persist().await {
                        warn!(error = %err, "Queue state persist failed");
                    }
                    self.log_stats();
                },
                _ = shutdown.changed() => break,
            }
        }
        info!("Scheduler stopping");
        self.persist().await
    }

    /// One scheduling decision plus at most one content fetch.
    pub async fn tick(&mut self) {
        let Some(url) = self.next_url().await else {
            return;
        };
        match self.service.scrape(&url).await {
            Ok(outcome) => {
                self.pacing.recover();
                self.update_cursor(&outcome);
                self.harvest(&outcome.links);
            },
            Err(err) => {
                if err.is_backend_error() {
                    self.pacing.backoff();
                    warn!(error = %err, %url, interval = ?self.pacing.current(), "Backend error, backing off");
                } else {
                    // Extraction and the like: the resource comes around
                    // again on its natural turn.
                    warn!(error = %err, %url, "Tick aborted");
                }
            },
        }
    }

    /// The URL this tick should fetch: the pending pagination cursor first,
    /// otherwise the active sequence, advancing through at most one full
    /// circle of completed sequences.
    async fn next_url(&mut self) -> Option<Url> {
        if let Some(next) = self.cursor.as_ref().and_then(|navi| navi.next_url.clone()) {
            match Url::parse(&next) {
                Ok(url) => return Some(url),
                Err(_) => {
                    warn!(url = %next, "Pagination cursor had an unusable next URL, dropping it");
                    self.cursor = None;
                },
            }
        }
        for _ in 0..self.sequences.len() {
            let outcome = self.sequences[self.active]
                .next(&self.fetcher, &self.persistence)
                .await;
            match outcome {
                Outcome::Url(url) => return Some(url),
                Outcome::EndOfSequence => self.advance_slot(),
                Outcome::Retry => {
                    self.pacing.backoff();
                    return None;
                },
            }
        }
        // Every sequence is empty; nothing to do this tick.
        None
    }

    fn advance_slot(&mut self) {
        self.active = (self.active + 1) % self.sequences.len();
        debug!(active = %self.sequences[self.active].kind(), "Advancing to next sequence");
        if self.active == FORUMS {
            self.run_id += 1;
            info!(run_id = self.run_id, "Completed a full crawl pass");
        }
    }

    /// Adopt, move, or clear the pagination cursor from a fetched page.
    /// Posts never paginate through the cursor; a post redirect lands
    /// mid-topic and draining from there would skip earlier pages.
    fn update_cursor(&mut self, outcome: &ScrapeOutcome) {
        let navi = &outcome.navi;
        if self.cursor.is_none() {
            if navi.pages > 1
                && navi.page < navi.pages
                && self.sequences[self.active].kind() != SequenceKind::Posts
            {
                debug!(url = %outcome.url, pages = navi.pages, "Pagination started");
                self.cursor = Some(navi.clone());
            }
            return;
        }
        if navi.page >= navi.pages {
            debug!(url = %outcome.url, "Pagination finished");
            self.cursor = None;
        } else {
            self.cursor = Some(navi.clone());
        }
    }

    /// Feed outbound links back into the discovery sequences. Only
    /// same-origin links to cacheable kinds count; everything is read off
    /// the canonical form.
    fn harvest(&mut self, links: &[OutboundLink]) {
        for link in links {
            let Ok(url) = Url::parse(&link.url) else {
                continue;
            };
            if url.origin() != self.origin.origin() || !link.kind.is_cacheable() {
                continue;
            }
            if let Some(post) = route::post_id(&url) {
                self.sequences[POSTS].discovered_id(post, &url);
                continue;
            }
            let Some(key) = ResourceKey::from_url(&url) else {
                continue;
            };
            let slot = match key.kind {
                PageKind::Forum => FORUMS,
                PageKind::Group => GROUPS,
                PageKind::User => USERS,
                // Root's id is always 0, which would bound an unbounded
                // probe; topics are reached through their posts.
                _ => continue,
            };
            self.sequences[slot].discovered_id(key.id, &route::rewrite(&url));
        }
    }

    async fn persist(&self) -> Result<()> {
        self.store
            .save(
                self.run_id,
                self.active,
                self.sequences[FORUMS].state(),
                self.sequences[GROUPS].state(),
                self.sequences[USERS].state(),
                self.sequences[POSTS].state(),
            )
            .await
    }

    fn log_stats(&self) {
        info!(
            run_id = self.run_id,
            interval_ms = self.pacing.current().as_millis() as u64,
            active = %self.sequences[self.active].kind(),
            forums = %state_json(&self.sequences[FORUMS]),
            groups = %state_json(&self.sequences[GROUPS]),
            users = %state_json(&self.sequences[USERS]),
            posts = %state_json(&self.sequences[POSTS]),
            "Queue stats"
        );
    }
}

fn state_json(sequence: &Sequence) -> String {
    serde_json::to_string(sequence.state()).unwrap_or_else(|_| "<unserializable>".to_string())
}
