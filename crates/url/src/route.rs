//! Pretty-path rewriting and canonical-form classification.
//!
//! The board answers both "pretty" paths and the canonical `.php` query form.
//! Rewriting is a first-match-wins walk over an ordered rule table; order is
//! load-bearing (a topic inside a forum must be tried before the bare
//! forum-by-slug fallback, which would happily swallow it). Canonical URLs
//! match no rule, so rewriting is idempotent.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::kind::PageKind;

/// One entry of the rewrite table: a pattern over the URL path and a
/// canonical replacement of the form `path?query` with `${n}` capture
/// references. Empty-valued query parameters produced by unmatched optional
/// captures are dropped from the result.
#[derive(Debug)]
pub struct RewriteRule {
    pattern: Regex,
    template: &'static str,
}

impl RewriteRule {
    fn new(pattern: &str, template: &'static str) -> Self {
        Self {
            // The table is static data; a malformed pattern is a programming
            // error caught by the rule-table tests.
            pattern: Regex::new(pattern).unwrap(),
            template,
        }
    }

    /// Expanded `path?query` when the path matches, with empty-valued
    /// parameters already stripped.
    fn apply(&self, path: &str) -> Option<(String, Option<String>)> {
        let caps = self.pattern.captures(path)?;
        let mut expanded = String::new();
        caps.expand(self.template, &mut expanded);
        let (path, query) = match expanded.split_once('?') {
            Some((path, query)) => (path.to_owned(), query),
            None => (expanded, ""),
        };
        let kept: Vec<&str> = query
            .split('&')
            .filter(|pair| match pair.split_once('=') {
                Some((_, value)) => !value.is_empty(),
                None => !pair.is_empty(),
            })
            .collect();
        let query = (!kept.is_empty()).then(|| kept.join("&"));
        Some((path, query))
    }
}

static RULES: LazyLock<Vec<RewriteRule>> = LazyLock::new(|| {
    vec![
        // Forum listing, optionally paged: /name-f12/page100.html
        RewriteRule::new(
            r"^/(forum|[a-z0-9_-]*-f)([0-9]+)/?(page([0-9]+)\.html)?$",
            "/viewforum.php?f=${2}&start=${4}",
        ),
        // Topic inside its forum. Must precede the forum-by-slug fallback.
        RewriteRule::new(
            r"^/(forum|[a-z0-9_-]*-f)([0-9]+)/(topic|[a-z0-9_-]*-t)([0-9]+)(-([0-9]+))?\.html$",
            "/viewtopic.php?f=${2}&t=${4}&start=${6}",
        ),
        // Topic under a slug-only forum segment.
        RewriteRule::new(
            r"^/([a-z0-9_-]*)/?(topic|[a-z0-9_-]*-t)([0-9]+)(-([0-9]+))?\.html$",
            "/viewtopic.php?forum_uri=${1}&t=${3}&start=${5}",
        ),
        // Attachments and thumbnails.
        RewriteRule::new(
            r"^/resources/[a-z0-9_-]+/(thumb/)?([0-9]+)$",
            "/download/file.php?id=${2}&t=${1}",
        ),
        // Member profile: /name-u7/
        RewriteRule::new(
            r"^/(member|[a-z0-9_-]*-u)([0-9]+)/?$",
            "/memberlist.php?mode=viewprofile&u=${2}",
        ),
        // Per-member topic/post search: /name-u7/posts/page10.html
        RewriteRule::new(
            r"^/(member|[a-z0-9_-]*-u)([0-9]+)/(topics|posts)/?(page([0-9]+)\.html)?$",
            "/search.php?author_id=${2}&sr=${3}&start=${5}",
        ),
        // Group listing: /name-g3-100.html
        RewriteRule::new(
            r"^/(group|[a-z0-9_-]*-g)([0-9]+)(-([0-9]+))?\.html$",
            "/memberlist.php?mode=group&g=${2}&start=${4}",
        ),
        // Bare numeric post reference.
        RewriteRule::new(r"^/post([0-9]+)\.html$", "/viewtopic.php?p=${1}"),
        // Canned searches.
        RewriteRule::new(
            r"^/active-topics(-([0-9]+))?\.html$",
            "/search.php?search_id=active_topics&start=${2}&sr=topics",
        ),
        RewriteRule::new(
            r"^/unanswered(-([0-9]+))?\.html$",
            "/search.php?search_id=unanswered&start=${2}&sr=topics",
        ),
        RewriteRule::new(
            r"^/newposts(-([0-9]+))?\.html$",
            "/search.php?search_id=newposts&start=${2}&sr=topics",
        ),
        RewriteRule::new(
            r"^/unreadposts(-([0-9]+))?\.html$",
            "/search.php?search_id=unreadposts&start=${2}",
        ),
        // Forum by bare slug. Last of the content rules: anything more
        // specific has already been taken above.
        RewriteRule::new(
            r"^/([a-z0-9_-]+)/?(page([0-9]+)\.html)?$",
            "/viewforum.php?forum_uri=${1}&start=${3}",
        ),
        // Board scripts reached through a pretty prefix.
        RewriteRule::new(
            r"^/.+/(style\.php|ucp\.php|mcp\.php|faq\.php|download/file\.php)$",
            "/${1}",
        ),
        // Theme assets wherever they are referenced from.
        RewriteRule::new(r"^/(.+/)?(styles/.*|images/.*)$", "/${2}"),
    ]
});

/// The ordered rewrite table. Exposed for table-driven tests.
pub fn rules() -> &'static [RewriteRule] {
    &RULES
}

/// Rewrites a pretty URL into its canonical query-parameter form. First
/// matching rule wins; URLs matching no rule (including already-canonical
/// ones) come back unchanged.
pub fn rewrite(url: &Url) -> Url {
    for rule in rules() {
        if let Some((path, query)) = rule.apply(url.path()) {
            let mut out = url.clone();
            out.set_path(&path);
            out.set_query(query.as_deref());
            return out;
        }
    }
    url.clone()
}

/// Classifies a URL by its canonical form, so pretty and canonical spellings
/// of the same resource always agree.
pub fn classify(url: &Url) -> PageKind {
    let url = rewrite(url);
    match url.path() {
        "/" | "/index.php" => PageKind::Root,
        "/viewforum.php" => PageKind::Forum,
        "/viewtopic.php" => PageKind::Topic,
        "/memberlist.php" => match query_param(&url, "mode").as_deref() {
            Some("viewprofile") => PageKind::User,
            Some("group") => PageKind::Group,
            _ => PageKind::MemberList,
        },
        "/search.php" => match query_param(&url, "search_id").as_deref() {
            Some("active_topics") => PageKind::ActiveTopics,
            Some("unanswered") => PageKind::Unanswered,
            _ if numeric_param(&url, "author_id").is_some() => {
                match query_param(&url, "sr").as_deref() {
                    Some("posts") => PageKind::UserPosts,
                    _ => PageKind::UserTopics,
                }
            },
            _ => PageKind::Search,
        },
        "/download/file.php" => PageKind::Resource,
        path if path.starts_with("/styles/") || path.starts_with("/images/") => PageKind::Static,
        _ => PageKind::Unknown,
    }
}

/// First value of a named query parameter.
pub fn query_param(url: &Url, name: &str) -> Option<String> {
    url.query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

/// A named query parameter as a positive integer. Zero and garbage both read
/// as absent, matching how the board treats `f=0`.
pub fn numeric_param(url: &Url, name: &str) -> Option<i64> {
    query_param(url, name)
        .and_then(|value| value.parse::<i64>().ok())
        .filter(|id| *id > 0)
}

/// The post id a URL refers to, if any, read from the canonical `p`
/// parameter.
pub fn post_id(url: &Url) -> Option<i64> {
    numeric_param(&rewrite(url), "p")
}

/// Resolves an href found in a page against the page's origin. Scheme-less
/// and relative references both land on the origin; unparseable hrefs are
/// discarded.
pub fn parse_link(origin: &Url, href: &str) -> Option<Url> {
    origin.join(href).ok()
}
