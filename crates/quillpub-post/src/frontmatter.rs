//! Markdown documents with a `---`-delimited front matter block.
//!
//! The block is held twice: as an ordered list of lines, so a rewrite only
//! touches the fields it changes and everything else round-trips byte for
//! byte, and as a YAML mapping decoded with `serde_yaml`, which is what
//! every read goes through.

use std::sync::LazyLock;

use regex::Regex;
use serde_yaml::{Mapping, Value};
use tracing::debug;

static DOCUMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\A---[ \t]*\r?\n(?:(.*?)\r?\n)?---[ \t]*(?:\r?\n|\z)(.*)\z")
        .expect("valid document regex")
});

static FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z_][A-Za-z0-9_-]*)[ \t]*:(.*)$").expect("valid field regex")
});

static KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_-]*$").expect("valid key regex"));

/// Whether `key` can be written as a plain top-level front matter key.
#[must_use]
pub fn is_valid_key(key: &str) -> bool {
    KEY.is_match(key)
}

/// One line (or logical field) of a front matter block.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Item {
    /// A top-level `key: value` field with any indented continuation lines.
    Field {
        key: String,
        value: String,
        continuation: Vec<String>,
    },
    /// Comments, blank lines, and anything that is not a top-level field.
    Other(String),
}

impl Item {
    fn render_into(&self, lines: &mut Vec<String>) {
        match self {
            Self::Field {
                key,
                value,
                continuation,
            } => {
                if value.is_empty() {
                    lines.push(format!("{key}:"));
                } else {
                    lines.push(format!("{key}: {value}"));
                }
                lines.extend(continuation.iter().cloned());
            }
            Self::Other(line) => lines.push(line.clone()),
        }
    }
}

/// Ordered front matter block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrontMatter {
    items: Vec<Item>,
    values: Mapping,
}

impl FrontMatter {
    /// Parse the text between the `---` fences.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut items: Vec<Item> = Vec::new();
        for line in text.lines() {
            if let Some(caps) = FIELD.captures(line) {
                items.push(Item::Field {
                    key: caps[1].to_owned(),
                    value: caps[2].trim().to_owned(),
                    continuation: Vec::new(),
                });
                continue;
            }
            let is_continuation = line.starts_with([' ', '\t']) || line.starts_with("- ");
            match items.last_mut() {
                Some(Item::Field { continuation, .. }) if is_continuation => {
                    continuation.push(line.to_owned());
                }
                _ => items.push(Item::Other(line.to_owned())),
            }
        }
        let values = decode(&items);
        Self { items, values }
    }

    /// Whether a top-level key is present (case-insensitive).
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.field(key).is_some() || self.value(key).is_some()
    }

    /// Decoded YAML value of a top-level key (case-insensitive).
    #[must_use]
    pub fn value(&self, key: &str) -> Option<&Value> {
        self.values
            .iter()
            .find(|(k, _)| k.as_str().is_some_and(|k| k.eq_ignore_ascii_case(key)))
            .map(|(_, v)| v)
    }

    /// Scalar value of a top-level key as text.
    ///
    /// Returns `None` for absent keys and for lists or nested mappings; a
    /// null value reads as an empty string.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        self.value(key).and_then(scalar_text)
    }

    /// Remove a top-level key and its continuation lines.
    ///
    /// Returns `false` when the key was absent.
    pub fn remove(&mut self, key: &str) -> bool {
        let before = self.items.len();
        self.items.retain(
            |item| !matches!(item, Item::Field { key: k, .. } if k.eq_ignore_ascii_case(key)),
        );
        let removed = self.items.len() != before;
        if removed {
            self.values = decode(&self.items);
        }
        removed
    }

    /// Set a top-level key to a raw YAML value, replacing it in place or appending it.
    ///
    /// Returns `false` when the key already held exactly this value.
    pub fn set(&mut self, key: &str, value: &str) -> bool {
        let replaced = self.items.iter_mut().find_map(|item| match item {
            Item::Field {
                key: k,
                value: v,
                continuation,
            } if k.eq_ignore_ascii_case(key) => Some((v, continuation)),
            _ => None,
        });
        match replaced {
            Some((v, continuation)) => {
                if v == value && continuation.is_empty() {
                    return false;
                }
                value.clone_into(v);
                continuation.clear();
            }
            None => {
                // Trailing blank lines stay at the end of the block.
                let at = self
                    .items
                    .iter()
                    .rposition(|item| !matches!(item, Item::Other(line) if line.trim().is_empty()))
                    .map_or(0, |i| i + 1);
                self.items.insert(
                    at,
                    Item::Field {
                        key: key.to_owned(),
                        value: value.to_owned(),
                        continuation: Vec::new(),
                    },
                );
            }
        }
        self.values = decode(&self.items);
        true
    }

    /// Top-level keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.items.iter().filter_map(|item| match item {
            Item::Field { key, .. } => Some(key.as_str()),
            Item::Other(_) => None,
        })
    }

    /// Whether the block holds no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Render the block without fences.
    #[must_use]
    pub fn render(&self) -> String {
        let mut lines: Vec<String> = Vec::with_capacity(self.items.len());
        for item in &self.items {
            item.render_into(&mut lines);
        }
        lines.join("\n")
    }

    fn field(&self, key: &str) -> Option<&Item> {
        self.items
            .iter()
            .find(|item| matches!(item, Item::Field { key: k, .. } if k.eq_ignore_ascii_case(key)))
    }
}

/// Text of a scalar YAML value.
#[must_use]
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => Some(String::new()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        Value::Tagged(tagged) => scalar_text(&tagged.value),
        Value::Sequence(_) | Value::Mapping(_) => None,
    }
}

/// Decode the block as one YAML mapping.
///
/// A block that is not valid YAML as a whole is decoded field by field, so
/// one malformed line only hides that field.
fn decode(items: &[Item]) -> Mapping {
    let mut lines = Vec::new();
    for item in items {
        item.render_into(&mut lines);
    }
    let text = lines.join("\n");
    if text.trim().is_empty() {
        return Mapping::new();
    }
    match serde_yaml::from_str::<Value>(&text) {
        Ok(Value::Mapping(mapping)) => mapping,
        Ok(_) => Mapping::new(),
        Err(e) => {
            debug!(error = %e, "front matter is not valid YAML, decoding fields one by one");
            let mut mapping = Mapping::new();
            for item in items.iter().filter(|item| matches!(item, Item::Field { .. })) {
                let mut lines = Vec::new();
                item.render_into(&mut lines);
                if let Ok(Value::Mapping(field)) = serde_yaml::from_str::<Value>(&lines.join("\n")) {
                    mapping.extend(field);
                }
            }
            mapping
        }
    }
}

/// A Markdown document split into optional front matter and body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// The front matter block, if the document opens with one.
    pub front_matter: Option<FrontMatter>,
    /// Everything after the closing fence.
    pub body: String,
}

impl Document {
    /// Split a document. Text without a leading fenced block is all body.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        match DOCUMENT.captures(text) {
            Some(caps) => Self {
                front_matter: Some(FrontMatter::parse(
                    caps.get(1).map_or("", |m| m.as_str()),
                )),
                body: caps.get(2).map_or("", |m| m.as_str()).to_owned(),
            },
            None => Self {
                front_matter: None,
                body: text.to_owned(),
            },
        }
    }

    /// Render the document with `\n` line endings around the fences.
    #[must_use]
    pub fn render(&self) -> String {
        match &self.front_matter {
            Some(fm) if fm.is_empty() => format!("---\n---\n{}", self.body),
            Some(fm) => format!("---\n{}\n---\n{}", fm.render(), self.body),
            None => self.body.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_split_front_matter_and_body() {
        let doc = Document::parse("---\ntitle: Hello\ndate: 2024-01-01\n---\nBody text\n");
        let fm = doc.front_matter.expect("front matter");
        assert_eq!(fm.get("title").as_deref(), Some("Hello"));
        assert_eq!(fm.get("date").as_deref(), Some("2024-01-01"));
        assert_eq!(doc.body, "Body text\n");
    }

    #[test]
    fn test_should_treat_unfenced_text_as_body() {
        let doc = Document::parse("Just a note\n---\nnot front matter\n");
        assert!(doc.front_matter.is_none());
        assert_eq!(doc.render(), "Just a note\n---\nnot front matter\n");
    }

    #[test]
    fn test_should_accept_crlf_fences() {
        let doc = Document::parse("---\r\ntitle: Hi\r\n---\r\nbody");
        let fm = doc.front_matter.expect("front matter");
        assert_eq!(fm.get("title").as_deref(), Some("Hi"));
        assert_eq!(doc.body, "body");
    }

    #[test]
    fn test_should_parse_empty_block() {
        let doc = Document::parse("---\n---\nbody");
        assert!(doc.front_matter.as_ref().is_some_and(FrontMatter::is_empty));
        assert_eq!(doc.render(), "---\n---\nbody");
    }

    #[test]
    fn test_should_round_trip_unchanged_document() {
        let text = "---\ntitle: \"Quoted: yes\"\ntags:\n  - rust\n  - indieweb\n# comment\n---\n\nBody\n";
        assert_eq!(Document::parse(text).render(), text);
    }

    #[test]
    fn test_should_decode_quoted_scalars() {
        let fm = FrontMatter::parse("a: \"x\"\nb: 'y'\nc: z\nd: 'it''s'\ne: 3\nf:");
        assert_eq!(fm.get("a").as_deref(), Some("x"));
        assert_eq!(fm.get("b").as_deref(), Some("y"));
        assert_eq!(fm.get("c").as_deref(), Some("z"));
        assert_eq!(fm.get("d").as_deref(), Some("it's"));
        assert_eq!(fm.get("e").as_deref(), Some("3"));
        assert_eq!(fm.get("f").as_deref(), Some(""));
    }

    #[test]
    fn test_should_strip_trailing_comments() {
        let fm = FrontMatter::parse("type: photo # hero shot\ntitle: Sunset");
        assert_eq!(fm.get("type").as_deref(), Some("photo"));
        assert_eq!(fm.render(), "type: photo # hero shot\ntitle: Sunset");
    }

    #[test]
    fn test_should_fold_block_scalars() {
        let fm = FrontMatter::parse("type: >-\n  photo\ntitle: |-\n  line one\n  line two");
        assert_eq!(fm.get("type").as_deref(), Some("photo"));
        assert_eq!(fm.get("title").as_deref(), Some("line one\nline two"));
    }

    #[test]
    fn test_should_read_flow_and_block_lists() {
        let fm = FrontMatter::parse("tags: ['a, b', c]\ncategory:\n  - x\n  - y");
        let tags = fm.value("tags").and_then(Value::as_sequence).expect("tags list");
        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0].as_str(), Some("a, b"));
        assert_eq!(fm.value("category").and_then(Value::as_sequence).map(Vec::len), Some(2));
        assert!(fm.get("tags").is_none());
    }

    #[test]
    fn test_should_keep_valid_fields_when_one_line_is_malformed() {
        let fm = FrontMatter::parse("title: Hi\nbroken: [unclosed\ntype: note");
        assert_eq!(fm.get("title").as_deref(), Some("Hi"));
        assert_eq!(fm.get("type").as_deref(), Some("note"));
        assert!(fm.get("broken").is_none());
        assert!(fm.contains_key("broken"));
    }

    #[test]
    fn test_should_validate_keys() {
        assert!(is_valid_key("in-reply-to"));
        assert!(is_valid_key("collection_type"));
        assert!(!is_valid_key("bad:key"));
        assert!(!is_valid_key("two\nlines"));
        assert!(!is_valid_key(""));
    }

    #[test]
    fn test_should_match_keys_case_insensitively() {
        let fm = FrontMatter::parse("Bookmark-Of: https://example.com");
        assert!(fm.contains_key("bookmark-of"));
    }

    #[test]
    fn test_should_not_treat_nested_keys_as_top_level() {
        let fm = FrontMatter::parse("properties:\n  photo: x.png");
        assert!(fm.contains_key("properties"));
        assert!(!fm.contains_key("photo"));
    }

    #[test]
    fn test_should_replace_field_in_place() {
        let mut fm = FrontMatter::parse("type: entry\ntitle: Hi");
        assert!(fm.set("type", "article"));
        assert_eq!(fm.render(), "type: article\ntitle: Hi");
        assert!(!fm.set("type", "article"));
    }

    #[test]
    fn test_should_drop_continuation_when_replacing_list() {
        let mut fm = FrontMatter::parse("layout:\n  - a\n  - b\ntitle: x");
        fm.set("layout", "layouts/note.njk");
        assert_eq!(fm.render(), "layout: layouts/note.njk\ntitle: x");
    }

    #[test]
    fn test_should_remove_field_with_continuation() {
        let mut fm = FrontMatter::parse("title: Hi\ntags:\n  - a\n  - b\ndate: now");
        assert!(fm.remove("TAGS"));
        assert!(!fm.remove("tags"));
        assert_eq!(fm.render(), "title: Hi\ndate: now");
    }

    #[test]
    fn test_should_refresh_values_after_edits() {
        let mut fm = FrontMatter::parse("type: note\ntags:\n  - a");
        fm.set("type", "\"photo\"");
        assert_eq!(fm.get("type").as_deref(), Some("photo"));
        fm.remove("tags");
        assert!(fm.value("tags").is_none());
    }

    #[test]
    fn test_should_append_missing_field_before_trailing_blank_lines() {
        let mut fm = FrontMatter::parse("title: Hi\n\n");
        fm.set("layout", "layouts/article.njk");
        let keys: Vec<&str> = fm.keys().collect();
        assert_eq!(keys, vec!["title", "layout"]);
        assert!(fm.render().starts_with("title: Hi\nlayout: layouts/article.njk"));
    }
}
