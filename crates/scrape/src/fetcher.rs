//! The HTTP seam. The actual client lives outside this workspace; the crawl
//! core only needs these two calls.

use async_trait::async_trait;
use url::Url;

use crate::error::Result;

/// A fetched page body.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

/// Result of a HEAD-style existence probe. Probes never follow redirects;
/// the redirect target is the interesting part.
#[derive(Debug, Clone)]
pub struct ProbeResponse {
    pub status: u16,
    pub location: Option<Url>,
}

impl ProbeResponse {
    /// The redirect target, when the probe answered with one. A redirect is
    /// proof the probed id exists and hands back its canonical slugged URL.
    pub fn redirect_target(&self) -> Option<&Url> {
        matches!(self.status, 301 | 302 | 303 | 307 | 308)
            .then_some(self.location.as_ref())
            .flatten()
    }
}

/// Transport collaborator. Timeouts are the implementation's business and
/// surface as [`ErrorKind::Timeout`](crate::error::ErrorKind::Timeout).
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Retrieve a page body.
    async fn fetch(&self, url: &Url) -> Result<FetchResponse>;

    /// Lightweight existence check without a body fetch, not following
    /// redirects.
    async fn probe(&self, url: &Url) -> Result<ProbeResponse>;
}

// One transport is shared between the page service and the probe sequences.
#[async_trait]
impl<T: Fetcher + ?Sized> Fetcher for std::sync::Arc<T> {
    async fn fetch(&self, url: &Url) -> Result<FetchResponse> {
        (**self).fetch(url).await
    }

    async fn probe(&self, url: &Url) -> Result<ProbeResponse> {
        (**self).probe(url).await
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use url::Url;

    use super::ProbeResponse;

    #[rstest]
    #[case(301, true)]
    #[case(302, true)]
    #[case(200, false)]
    #[case(404, false)]
    fn only_redirect_statuses_expose_a_target(#[case] status: u16, #[case] expected: bool) {
        let response = ProbeResponse {
            status,
            location: Some(Url::parse("https://board.example/general-f12/").unwrap()),
        };
        assert_eq!(response.redirect_target().is_some(), expected);
    }

    #[test]
    fn redirect_without_location_is_not_a_target() {
        let response = ProbeResponse { status: 301, location: None };
        assert!(response.redirect_target().is_none());
    }
}
