//! Pagination navigation derived from a fetched page.
//!
//! The board renders a pagination widget reporting "page N of M"; everything
//! else here is arithmetic over the canonical `start` offset parameter.
//! A `Navi` is recomputed on every fetch and never persisted.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::kind::PageKind;
use crate::route;

/// Placeholder substituted by [`Navi::page_url`]. The template itself is a
/// plain string, not a URL, because `{` and `}` would not survive URL
/// serialization.
pub const PAGE_PLACEHOLDER: &str = "{PAGE}";

/// Navigation state of one fetched page: where it sits in its resource and
/// how to address the neighbouring pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Navi {
    /// 1-based current page.
    pub page: u32,
    /// Total pages, at least 1.
    pub pages: u32,
    pub elements_per_page: u32,
    /// Canonical URL of page 1 (no `start` parameter).
    pub first_url: String,
    /// `None` on page 1; `first_url` on page 2 so an offset of 0 is never
    /// emitted through the template.
    pub prev_url: Option<String>,
    /// `None` on the last page.
    pub next_url: Option<String>,
    pub last_url: String,
    /// Canonical URL with `start={PAGE}` in place of the offset.
    pub pager_url_template: String,
}

impl Navi {
    /// Builds navigation from the page counts reported by the pagination
    /// widget. A widget total of 0 means the widget was not rendered at all,
    /// which the board only does for single-page resources.
    pub fn compute(kind: PageKind, url: &Url, widget_page: u32, widget_pages: u32) -> Self {
        let pages = widget_pages.max(1);
        let page = widget_page.clamp(1, pages);
        let elements_per_page = kind.elements_per_page();

        let mut first = route::rewrite(url);
        strip_query_param(&mut first, "start");
        let first_url = first.to_string();
        let separator = if first.query().is_some() { '&' } else { '?' };
        let pager_url_template = format!("{first_url}{separator}start={PAGE_PLACEHOLDER}");

        let at = |n: u32| page_url_with(&first_url, &pager_url_template, elements_per_page, n);
        let prev_url = (page > 1).then(|| at(page - 1));
        let next_url = (page < pages).then(|| at(page + 1));
        let last_url = at(pages);

        Self {
            page,
            pages,
            elements_per_page,
            first_url,
            prev_url,
            next_url,
            last_url,
            pager_url_template,
        }
    }

    /// Canonical URL of the given 1-based page of this resource.
    pub fn page_url(&self, page: u32) -> String {
        page_url_with(
            &self.first_url,
            &self.pager_url_template,
            self.elements_per_page,
            page,
        )
    }

    /// Whether this page is the resource's final page.
    pub fn is_last_page(&self) -> bool {
        self.pages <= 1 || self.page == self.pages
    }
}

fn page_url_with(first: &str, template: &str, elements_per_page: u32, page: u32) -> String {
    if page <= 1 {
        first.to_owned()
    } else {
        let offset = (page - 1) * elements_per_page;
        template.replace(PAGE_PLACEHOLDER, &offset.to_string())
    }
}

fn strip_query_param(url: &mut Url, name: &str) {
    let remaining: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != name)
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    if remaining.is_empty() {
        url.set_query(None);
    } else {
        let joined = remaining
            .iter()
            .map(|(key, value)| {
                if value.is_empty() {
                    key.clone()
                } else {
                    format!("{key}={value}")
                }
            })
            .collect::<Vec<_>>()
            .join("&");
        url.set_query(Some(&joined));
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use url::Url;

    use super::Navi;
    use crate::kind::PageKind;

    fn navi(kind: PageKind, path: &str, page: u32, pages: u32) -> Navi {
        let url = Url::parse(&format!("https://board.example{path}")).unwrap();
        Navi::compute(kind, &url, page, pages)
    }

    #[test]
    fn second_of_two_topic_pages_points_back_to_the_first() {
        let navi = navi(PageKind::Topic, "/viewtopic.php?f=12&t=345&start=10", 2, 2);
        assert_eq!(navi.elements_per_page, 10);
        assert_eq!(navi.next_url, None);
        assert_eq!(navi.prev_url, Some(navi.first_url.clone()));
        assert_eq!(
            navi.first_url,
            "https://board.example/viewtopic.php?f=12&t=345"
        );
    }

    #[test]
    fn missing_widget_reads_as_a_single_page() {
        let navi = navi(PageKind::Forum, "/viewforum.php?f=12", 0, 0);
        assert_eq!((navi.page, navi.pages), (1, 1));
        assert_eq!(navi.prev_url, None);
        assert_eq!(navi.next_url, None);
        assert_eq!(navi.last_url, navi.first_url);
        assert!(navi.is_last_page());
    }

    #[test]
    fn middle_page_of_a_forum_listing() {
        let navi = navi(PageKind::Forum, "/viewforum.php?f=12&start=100", 2, 5);
        assert_eq!(
            navi.pager_url_template,
            "https://board.example/viewforum.php?f=12&start={PAGE}"
        );
        assert_eq!(navi.prev_url.as_deref(), Some(navi.first_url.as_str()));
        assert_eq!(
            navi.next_url.as_deref(),
            Some("https://board.example/viewforum.php?f=12&start=200")
        );
        assert_eq!(
            navi.last_url,
            "https://board.example/viewforum.php?f=12&start=400"
        );
        assert!(!navi.is_last_page());
    }

    #[test]
    fn pretty_input_is_canonicalized_before_navigation() {
        let navi = navi(PageKind::Forum, "/general-f12/page100.html", 2, 3);
        assert_eq!(
            navi.first_url,
            "https://board.example/viewforum.php?f=12"
        );
        assert_eq!(
            navi.next_url.as_deref(),
            Some("https://board.example/viewforum.php?f=12&start=200")
        );
    }

    #[rstest]
    #[case(1, "https://board.example/viewtopic.php?t=345")]
    #[case(2, "https://board.example/viewtopic.php?t=345&start=10")]
    #[case(7, "https://board.example/viewtopic.php?t=345&start=60")]
    fn page_url_maps_display_pages_to_offsets(#[case] page: u32, #[case] expected: &str) {
        let navi = navi(PageKind::Topic, "/viewtopic.php?t=345", 1, 9);
        assert_eq!(navi.page_url(page), expected);
    }

    #[test]
    fn root_template_gets_a_question_mark_separator() {
        let navi = navi(PageKind::Root, "/", 1, 1);
        assert_eq!(
            navi.pager_url_template,
            "https://board.example/?start={PAGE}"
        );
    }
}
