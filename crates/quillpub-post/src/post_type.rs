//! Post types and their classification from front matter.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::frontmatter::FrontMatter;

/// Generic labels that say nothing about what kind of post a document is.
pub const AMBIGUOUS_TYPES: [&str; 6] = ["entry", "h-entry", "post", "default", "unknown", "none"];

/// Inference rules, highest priority first. The first key present wins.
const INFERENCE_ORDER: [(&str, PostType); 7] = [
    ("bookmark-of", PostType::Bookmark),
    ("like-of", PostType::Like),
    ("repost-of", PostType::Repost),
    ("in-reply-to", PostType::Reply),
    ("photo", PostType::Photo),
    ("name", PostType::Article),
    ("title", PostType::Article),
];

/// The kind of post a document renders as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostType {
    /// Short untitled text.
    #[default]
    Note,
    /// Titled long-form post.
    Article,
    /// Photo post.
    Photo,
    /// Bookmark of another URL.
    Bookmark,
    /// Like of another URL.
    Like,
    /// Repost of another URL.
    Repost,
    /// Reply to another URL.
    Reply,
}

impl PostType {
    /// Every post type.
    pub const ALL: [Self; 7] = [
        Self::Note,
        Self::Article,
        Self::Photo,
        Self::Bookmark,
        Self::Like,
        Self::Repost,
        Self::Reply,
    ];

    /// The front matter value for this type.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Note => "note",
            Self::Article => "article",
            Self::Photo => "photo",
            Self::Bookmark => "bookmark",
            Self::Like => "like",
            Self::Repost => "repost",
            Self::Reply => "reply",
        }
    }

    /// Template the static site renders this type with.
    #[must_use]
    pub fn layout(self) -> &'static str {
        match self {
            Self::Note => "layouts/note.njk",
            Self::Article => "layouts/article.njk",
            Self::Photo => "layouts/photo.njk",
            Self::Bookmark => "layouts/bookmark.njk",
            Self::Like => "layouts/like.njk",
            Self::Repost => "layouts/repost.njk",
            Self::Reply => "layouts/reply.njk",
        }
    }

    /// Parse a declared `type` value, rejecting empty, ambiguous, and unknown labels.
    #[must_use]
    pub fn from_declared(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.is_empty() || is_ambiguous(value) {
            return None;
        }
        value.parse().ok()
    }

    /// Infer a type from the keys present, ignoring any declared `type`.
    #[must_use]
    pub fn infer(front_matter: &FrontMatter) -> Self {
        INFERENCE_ORDER
            .iter()
            .find(|(key, _)| front_matter.contains_key(key))
            .map_or(Self::Note, |(_, post_type)| *post_type)
    }

    /// The declared type when it is usable, otherwise the inferred one.
    #[must_use]
    pub fn classify(front_matter: &FrontMatter) -> Self {
        front_matter
            .get("type")
            .and_then(|declared| Self::from_declared(&declared))
            .unwrap_or_else(|| Self::infer(front_matter))
    }
}

impl fmt::Display for PostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for a label that names no known post type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown post type: {0}")]
pub struct UnknownPostType(pub String);

impl FromStr for PostType {
    type Err = UnknownPostType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == lower)
            .ok_or_else(|| UnknownPostType(s.to_owned()))
    }
}

/// Whether a label is one of the generic [`AMBIGUOUS_TYPES`].
#[must_use]
pub fn is_ambiguous(value: &str) -> bool {
    AMBIGUOUS_TYPES
        .iter()
        .any(|t| t.eq_ignore_ascii_case(value.trim()))
}
