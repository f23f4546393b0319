//! Mention aggregation: de-duplication across target variants and counting.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Mention counts for one page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MentionCounts {
    /// Replies.
    pub reply: u64,
    /// Likes.
    pub like: u64,
    /// Reposts.
    pub repost: u64,
    /// Plain mentions and anything unrecognized.
    pub mention: u64,
    /// RSVPs of any kind.
    pub rsvp: u64,
    /// Sum of all of the above.
    pub total: u64,
}

/// Bucket a `wm-property` / `wm-type` value falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MentionKind {
    /// `in-reply-to`
    Reply,
    /// `like-of`
    Like,
    /// `repost-of`
    Repost,
    /// `mention-of` and the fallback
    Mention,
    /// `rsvp*`
    Rsvp,
}

impl MentionKind {
    /// Classify a webmention.io property name.
    #[must_use]
    pub fn from_property(property: &str) -> Self {
        match property {
            "in-reply-to" | "reply" => Self::Reply,
            "like-of" | "like" => Self::Like,
            "repost-of" | "repost" => Self::Repost,
            "rsvp" | "rsvp-yes" | "rsvp-no" | "rsvp-maybe" | "rsvp-interested" => Self::Rsvp,
            _ => Self::Mention,
        }
    }
}

/// Count mentions by kind.
#[must_use]
pub fn summarize(items: &[Value]) -> MentionCounts {
    let mut counts = MentionCounts::default();
    for item in items {
        let property = non_empty_str(item, "wm-property")
            .or_else(|| non_empty_str(item, "wm-type"))
            .unwrap_or("mention");
        match MentionKind::from_property(property) {
            MentionKind::Reply => counts.reply += 1,
            MentionKind::Like => counts.like += 1,
            MentionKind::Repost => counts.repost += 1,
            MentionKind::Mention => counts.mention += 1,
            MentionKind::Rsvp => counts.rsvp += 1,
        }
    }
    counts.total = counts.reply + counts.like + counts.repost + counts.mention + counts.rsvp;
    counts
}

/// Drop repeated mentions, keeping the first occurrence.
///
/// Identity is the `wm-id`, else the `wm-source`/`wm-target` pair, else the
/// `url`. Items with none of these are always kept.
#[must_use]
pub fn dedup(items: impl IntoIterator<Item = Value>) -> Vec<Value> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| match identity(item) {
            Some(key) => seen.insert(key),
            None => true,
        })
        .collect()
}

fn identity(item: &Value) -> Option<String> {
    if let Some(id) = item.get("wm-id").filter(|id| !id.is_null()) {
        let id = id.as_str().map_or_else(|| id.to_string(), str::to_owned);
        return Some(format!("id:{id}"));
    }
    if let (Some(source), Some(target)) = (
        non_empty_str(item, "wm-source"),
        non_empty_str(item, "wm-target"),
    ) {
        return Some(format!("st:{source}\u{2192}{target}"));
    }
    non_empty_str(item, "url").map(|url| format!("url:{url}"))
}

fn non_empty_str<'a>(item: &'a Value, key: &str) -> Option<&'a str> {
    item.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}
