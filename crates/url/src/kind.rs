use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Closed classification of what a board URL points at.
///
/// Only a handful of kinds are ever cached or crawled; the rest exist so the
/// router can make a definite statement about every URL it sees instead of
/// lumping "known but uninteresting" in with "unparseable".
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageKind {
    /// The board index (`/` or `/index.php`).
    Root,
    /// A forum listing (`/viewforum.php?f=N`).
    Forum,
    /// A topic with its posts (`/viewtopic.php?t=N`).
    Topic,
    /// A member group listing (`/memberlist.php?mode=group&g=N`).
    Group,
    /// A member profile (`/memberlist.php?mode=viewprofile&u=N`).
    User,
    /// A free-form search results page.
    Search,
    /// The canned "unanswered topics" search.
    Unanswered,
    /// The canned "active topics" search.
    ActiveTopics,
    /// Search for all posts by one author.
    UserPosts,
    /// Search for all topics started by one author.
    UserTopics,
    /// The plain member list (no mode, or an unrecognised one).
    MemberList,
    /// An attachment or avatar served through `/download/file.php`.
    Resource,
    /// Theme assets under `/styles/` or `/images/`.
    Static,
    /// Anything the router cannot place.
    Unknown,
}

impl PageKind {
    /// Whether pages of this kind are stored in the cache and walked by the
    /// crawler. Everything else is passed through untouched.
    pub fn is_cacheable(self) -> bool {
        matches!(
            self,
            Self::Root | Self::Forum | Self::Topic | Self::Group | Self::User
        )
    }

    /// How many elements the board renders per page for this kind. Topics and
    /// per-author post searches show ten posts; every listing shows a hundred
    /// rows.
    pub fn elements_per_page(self) -> u32 {
        match self {
            Self::Topic | Self::UserPosts => 10,
            _ => 100,
        }
    }

    /// Stable lowercase tag used in database rows and serialized state.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::Forum => "forum",
            Self::Topic => "topic",
            Self::Group => "group",
            Self::User => "user",
            Self::Search => "search",
            Self::Unanswered => "unanswered",
            Self::ActiveTopics => "active_topics",
            Self::UserPosts => "user_posts",
            Self::UserTopics => "user_topics",
            Self::MemberList => "member_list",
            Self::Resource => "resource",
            Self::Static => "static",
            Self::Unknown => "unknown",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Some(match tag {
            "root" => Self::Root,
            "forum" => Self::Forum,
            "topic" => Self::Topic,
            "group" => Self::Group,
            "user" => Self::User,
            "search" => Self::Search,
            "unanswered" => Self::Unanswered,
            "active_topics" => Self::ActiveTopics,
            "user_posts" => Self::UserPosts,
            "user_topics" => Self::UserTopics,
            "member_list" => Self::MemberList,
            "resource" => Self::Resource,
            "static" => Self::Static,
            "unknown" => Self::Unknown,
            _ => return None,
        })
    }
}
