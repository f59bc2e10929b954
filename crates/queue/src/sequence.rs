//! Discovery sequences: strategies for walking identifier spaces that have
//! no directory listing.
//!
//! Two shapes of state exist. *Probe* sequences confirm each id against the
//! backend (legacy numeric URLs still redirect to their canonical slugged
//! form, so a redirect is an existence proof). *Harvest* sequences never
//! touch the network; they replay ids observed in crawled links. The posts
//! sequence is a probe with one extra step: a confirmed post also gets its
//! raw content fetched and stored, because the rendered page view only shows
//! formatted output.

use std::collections::HashMap;

use mirror_scrape::{Fetcher, Persistence};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

/// What one scheduling step of a sequence produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The next URL to scrape.
    Url(Url),
    /// One full pass over the identifier space is complete; the scheduler
    /// moves on to the next sequence.
    EndOfSequence,
    /// The step could not make progress (failed or non-redirect probe).
    /// The id is not skipped; a bare 404 or timeout is not proof of absence.
    Retry,
}

/// The four crawl slots, in scheduling order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum SequenceKind {
    #[display("forums")]
    Forums,
    #[display("groups")]
    Groups,
    #[display("users")]
    Users,
    #[display("posts")]
    Posts,
}

/// Serializable progress of one sequence, stored as a JSON column of the
/// queue row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SequenceState {
    Probe {
        /// Last confirmed id; the next probe targets `current_id + 1`.
        current_id: i64,
        /// Highest id seen in harvested links. Monotone non-decreasing;
        /// tells the probe where the space currently ends.
        max_known_id: Option<i64>,
    },
    Harvest {
        /// Ids in discovery order, deduplicated.
        ids: Vec<i64>,
        /// Next position to yield; wraps to 0 on a full pass.
        cursor: usize,
        #[serde(deserialize_with = "urls_from_json")]
        urls: HashMap<i64, String>,
    },
}

/// Internally tagged enums buffer their content during deserialization, which
/// bypasses serde_json's string-to-integer map key coercion; parse the keys
/// back by hand.
fn urls_from_json<'de, D: serde::Deserializer<'de>>(
    deserializer: D,
) -> Result<HashMap<i64, String>, D::Error> {
    let raw = HashMap::<String, String>::deserialize(deserializer)?;
    raw.into_iter()
        .map(|(id, url)| id.parse::<i64>().map(|id| (id, url)).map_err(serde::de::Error::custom))
        .collect()
}

impl SequenceState {
    pub fn probe() -> Self {
        Self::Probe { current_id: 0, max_known_id: None }
    }

    pub fn harvest() -> Self {
        Self::Harvest { ids: Vec::new(), cursor: 0, urls: HashMap::new() }
    }
}

/// One discovery sequence: a slot, its probe URL template, and its state.
#[derive(Debug, Clone)]
pub struct Sequence {
    kind: SequenceKind,
    origin: Url,
    state: SequenceState,
}

impl Sequence {
    /// Builds the sequence for a slot, resuming from `state` when the
    /// persisted row carried one.
    pub fn new(kind: SequenceKind, origin: &Url, state: Option<SequenceState>) -> Self {
        let state = state.unwrap_or_else(|| match kind {
            SequenceKind::Users => SequenceState::harvest(),
            _ => SequenceState::probe(),
        });
        Self { kind, origin: origin.clone(), state }
    }

    pub fn kind(&self) -> SequenceKind {
        self.kind
    }

    pub fn state(&self) -> &SequenceState {
        &self.state
    }

    /// Numeric-id URL the backend still answers with a redirect.
    fn probe_url(&self, id: i64) -> Option<Url> {
        let path = match self.kind {
            SequenceKind::Forums => format!("/viewforum.php?f={id}"),
            SequenceKind::Groups => format!("/group{id}.html"),
            SequenceKind::Posts => format!("/post{id}.html"),
            SequenceKind::Users => return None,
        };
        self.origin.join(&path).ok()
    }

    /// Produce the next URL to scrape, or signal a wrap or a stall.
    ///
    /// Probe variants advance `current_id` only when the probe confirms the
    /// id; the posts variant additionally fetches the confirmed post's raw
    /// content and hands it to persistence (best-effort, failures logged).
    /// Harvest variants hand out each stored id once per pass; if the
    /// caller's fetch of that URL then fails, the id waits for the next
    /// wrap instead of being retried in place.
    pub async fn next<F: Fetcher, P: Persistence>(
        &mut self,
        fetcher: &F,
        persistence: &P,
    ) -> Outcome {
        if let SequenceState::Probe { current_id, max_known_id } = self.state {
            if max_known_id.is_some_and(|max| current_id >= max) {
                self.state = SequenceState::Probe { current_id: 0, max_known_id };
                return Outcome::EndOfSequence;
            }
            let candidate = current_id + 1;
            let Some(url) = self.probe_url(candidate) else {
                return Outcome::EndOfSequence;
            };
            debug!(kind = %self.kind, id = candidate, %url, "Probing");
            let target = match fetcher.probe(&url).await {
                Ok(response) => response.redirect_target().cloned(),
                Err(err) => {
                    warn!(kind = %self.kind, id = candidate, error = %err, "Probe failed");
                    return Outcome::Retry;
                },
            };
            let Some(target) = target else {
                // Non-redirect answers are ambiguous: the id may not exist
                // yet, or the backend may be struggling.
                return Outcome::Retry;
            };
            self.state = SequenceState::Probe { current_id: candidate, max_known_id };
            if self.kind == SequenceKind::Posts {
                self.store_raw_post(candidate, fetcher, persistence).await;
            }
            return Outcome::Url(target);
        }
        let SequenceState::Harvest { ids, cursor, urls } = &mut self.state else {
            // Probe states were handled above.
            return Outcome::EndOfSequence;
        };
        while *cursor < ids.len() {
            let id = ids[*cursor];
            *cursor += 1;
            let Some(url) = urls.get(&id).and_then(|url| Url::parse(url).ok()) else {
                warn!(kind = %self.kind, id, "Harvested id has no usable URL, skipping");
                continue;
            };
            return Outcome::Url(url);
        }
        *cursor = 0;
        Outcome::EndOfSequence
    }

    /// Record an id observed during ordinary link harvesting. Probe variants
    /// only ever raise their ceiling; harvest variants remember the URL too.
    pub fn discovered_id(&mut self, id: i64, url: &Url) {
        match &mut self.state {
            SequenceState::Probe { max_known_id, .. } => {
                if max_known_id.is_none_or(|max| id > max) {
                    *max_known_id = Some(id);
                }
            },
            SequenceState::Harvest { ids, urls, .. } => {
                if !urls.contains_key(&id) {
                    ids.push(id);
                }
                urls.insert(id, url.to_string());
            },
        }
    }

    /// Fetch the un-rendered content of a confirmed post and persist it.
    /// Never fails the discovery step.
    async fn store_raw_post<F: Fetcher, P: Persistence>(
        &self,
        post_id: i64,
        fetcher: &F,
        persistence: &P,
    ) {
        let path = format!("/ucp.php?i=pm&mode=compose&action=quotepost&p={post_id}");
        let Ok(url) = self.origin.join(&path) else {
            return;
        };
        let body = match fetcher.fetch(&url).await {
            Ok(response) if !response.body.is_empty() => response.body,
            Ok(_) => return,
            Err(err) => {
                warn!(post_id, error = %err, "Raw post fetch failed");
                return;
            },
        };
        if let Err(err) = persistence.save_post_content(post_id, &body).await {
            warn!(post_id, error = %err, "Raw post save failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use mirror_scrape::error::ErrorKind;
    use mirror_scrape::mock::{MemoryPersistence, MockFetcher};
    use rstest::rstest;

    use super::*;

    fn origin() -> Url {
        Url::parse("https://board.example").unwrap()
    }

    fn probe_state(current_id: i64, max_known_id: Option<i64>) -> SequenceState {
        SequenceState::Probe { current_id, max_known_id }
    }

    fn link(path: &str) -> Url {
        origin().join(path).unwrap()
    }

    #[rstest]
    #[case(&[3, 7, 5], Some(7))]
    #[case(&[7, 3], Some(7))]
    #[case(&[1, 1, 1], Some(1))]
    fn max_known_id_is_monotone(#[case] seen: &[i64], #[case] expected: Option<i64>) {
        let mut seq = Sequence::new(SequenceKind::Forums, &origin(), None);
        for id in seen {
            seq.discovered_id(*id, &link(&format!("/viewforum.php?f={id}")));
        }
        match seq.state() {
            SequenceState::Probe { max_known_id, .. } => assert_eq!(*max_known_id, expected),
            other => panic!("expected probe state, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn probe_wraps_past_the_known_ceiling_without_fetching() {
        let fetcher = MockFetcher::new();
        let persistence = MemoryPersistence::new();
        let mut seq = Sequence::new(SequenceKind::Forums, &origin(), Some(probe_state(5, Some(5))));

        let outcome = seq.next(&fetcher, &persistence).await;
        assert_eq!(outcome, Outcome::EndOfSequence);
        assert_eq!(seq.state(), &probe_state(0, Some(5)));
        assert!(fetcher.requests().await.is_empty(), "wrap must not issue a probe");
    }

    #[tokio::test]
    async fn probe_redirect_confirms_the_id_and_yields_the_target() {
        let fetcher = MockFetcher::new();
        let persistence = MemoryPersistence::new();
        fetcher
            .redirect("https://board.example/viewforum.php?f=1", "https://board.example/general-f1/")
            .await;
        let mut seq = Sequence::new(SequenceKind::Forums, &origin(), Some(probe_state(0, Some(3))));

        let outcome = seq.next(&fetcher, &persistence).await;
        assert_eq!(outcome, Outcome::Url(Url::parse("https://board.example/general-f1/").unwrap()));
        assert_eq!(seq.state(), &probe_state(1, Some(3)));
    }

    #[rstest]
    #[case(200)]
    #[case(404)]
    #[tokio::test]
    async fn non_redirect_probe_stalls_without_advancing(#[case] status: u16) {
        let fetcher = MockFetcher::new();
        let persistence = MemoryPersistence::new();
        fetcher.probe_status("https://board.example/viewforum.php?f=1", status).await;
        let mut seq = Sequence::new(SequenceKind::Forums, &origin(), Some(probe_state(0, Some(3))));

        let outcome = seq.next(&fetcher, &persistence).await;
        assert_eq!(outcome, Outcome::Retry);
        assert_eq!(seq.state(), &probe_state(0, Some(3)));
    }

    #[tokio::test]
    async fn probe_transport_error_stalls_without_advancing() {
        let fetcher = MockFetcher::new();
        let persistence = MemoryPersistence::new();
        fetcher
            .probe_error("https://board.example/group1.html", ErrorKind::Timeout)
            .await;
        let mut seq = Sequence::new(SequenceKind::Groups, &origin(), Some(probe_state(0, Some(2))));

        assert_eq!(seq.next(&fetcher, &persistence).await, Outcome::Retry);
        assert_eq!(seq.state(), &probe_state(0, Some(2)));
    }

    #[tokio::test]
    async fn harvest_walks_discovered_ids_in_order_and_wraps() {
        let fetcher = MockFetcher::new();
        let persistence = MemoryPersistence::new();
        let mut seq = Sequence::new(SequenceKind::Users, &origin(), None);
        seq.discovered_id(7, &link("/alice-u7/"));
        seq.discovered_id(3, &link("/bob-u3/"));
        // Duplicate id refreshes the URL but keeps discovery order.
        seq.discovered_id(7, &link("/alice-renamed-u7/"));

        assert_eq!(
            seq.next(&fetcher, &persistence).await,
            Outcome::Url(link("/alice-renamed-u7/"))
        );
        assert_eq!(seq.next(&fetcher, &persistence).await, Outcome::Url(link("/bob-u3/")));
        assert_eq!(seq.next(&fetcher, &persistence).await, Outcome::EndOfSequence);
        // Wrapped: the pass starts over.
        assert_eq!(
            seq.next(&fetcher, &persistence).await,
            Outcome::Url(link("/alice-renamed-u7/"))
        );
        assert!(fetcher.requests().await.is_empty(), "harvesting never probes");
    }

    #[tokio::test]
    async fn empty_harvest_ends_immediately() {
        let fetcher = MockFetcher::new();
        let persistence = MemoryPersistence::new();
        let mut seq = Sequence::new(SequenceKind::Users, &origin(), None);
        assert_eq!(seq.next(&fetcher, &persistence).await, Outcome::EndOfSequence);
    }

    #[tokio::test]
    async fn confirmed_post_gets_its_raw_content_persisted() {
        let fetcher = MockFetcher::new();
        let persistence = MemoryPersistence::new();
        fetcher
            .redirect(
                "https://board.example/post678.html",
                "https://board.example/general-f12/hello-t345.html#p678",
            )
            .await;
        fetcher
            .page(
                "https://board.example/ucp.php?i=pm&mode=compose&action=quotepost&p=678",
                200,
                "[quote]raw bbcode[/quote]",
            )
            .await;
        let mut seq = Sequence::new(SequenceKind::Posts, &origin(), Some(probe_state(677, Some(700))));

        let outcome = seq.next(&fetcher, &persistence).await;
        assert!(matches!(outcome, Outcome::Url(_)));
        let contents = persistence.post_contents().await;
        assert_eq!(contents.get(&678).map(String::as_str), Some("[quote]raw bbcode[/quote]"));
    }

    #[tokio::test]
    async fn raw_post_fetch_failure_does_not_fail_discovery() {
        let fetcher = MockFetcher::new();
        let persistence = MemoryPersistence::new();
        fetcher
            .redirect(
                "https://board.example/post678.html",
                "https://board.example/general-f12/hello-t345.html#p678",
            )
            .await;
        // No quotepost page scripted: the secondary fetch refuses.
        let mut seq = Sequence::new(SequenceKind::Posts, &origin(), Some(probe_state(677, Some(700))));

        let outcome = seq.next(&fetcher, &persistence).await;
        assert!(matches!(outcome, Outcome::Url(_)));
        assert!(persistence.post_contents().await.is_empty());
    }

    #[test]
    fn states_round_trip_through_json() {
        let mut seq = Sequence::new(SequenceKind::Users, &origin(), None);
        seq.discovered_id(7, &link("/alice-u7/"));
        let json = serde_json::to_string(seq.state()).unwrap();
        let restored: SequenceState = serde_json::from_str(&json).unwrap();
        assert_eq!(&restored, seq.state());

        let probe = probe_state(4, Some(9));
        let json = serde_json::to_string(&probe).unwrap();
        assert_eq!(serde_json::from_str::<SequenceState>(&json).unwrap(), probe);
    }
}
