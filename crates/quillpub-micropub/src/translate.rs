//! Translation between Micropub properties and Markdown posts.
//!
//! With translation on, microformats names map to the site's front matter
//! names: `name` -> `title`, `published` -> `date`, `category` -> `tags`, and
//! `content` becomes the Markdown body. Values are written as JSON-quoted
//! scalars, or flow lists when a property holds several values, so every
//! field is valid YAML. Reads go through the decoded YAML of the block, so
//! hand-edited values (block scalars, single quotes, comments) read back the
//! same way the site generator sees them.

use chrono::{DateTime, SecondsFormat, Utc};
use quillpub_post::{Document, FrontMatter, is_valid_key};
use serde_json::Value;
use tracing::debug;

use crate::request::{Properties, Removal, value_text};

/// Number of content words used for a slug when a post has no name.
pub const SLUG_WORDS: usize = 6;

/// Front matter keys that hold site bookkeeping rather than post properties.
const INTERNAL_KEYS: [&str; 3] = ["type", "layout", "collectionType"];

/// Where a property is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// The Markdown body.
    Body,
    /// A front matter field.
    Field(String),
    /// Not stored.
    Dropped,
}

/// Storage target of a property.
#[must_use]
pub fn target_for(property: &str, translate: bool) -> Target {
    if property == "content" {
        return Target::Body;
    }
    if property.starts_with("mp-") || matches!(property, "h" | "access_token" | "action") {
        return Target::Dropped;
    }
    if !is_valid_key(property) {
        debug!(%property, "dropping property with an unwritable name");
        return Target::Dropped;
    }
    let key = if translate {
        match property {
            "name" => "title",
            "published" => "date",
            "category" => "tags",
            other => other,
        }
    } else {
        property
    };
    Target::Field(key.to_owned())
}

/// Property name for a front matter key.
#[must_use]
pub fn property_for(key: &str, translate: bool) -> Option<&str> {
    if INTERNAL_KEYS.iter().any(|k| k.eq_ignore_ascii_case(key)) {
        return None;
    }
    if !translate {
        return Some(key);
    }
    Some(match key {
        "title" => "name",
        "date" => "published",
        "tags" => "category",
        other => other,
    })
}

/// Render the post text for a create.
#[must_use]
pub fn render_post(props: &Properties, now: DateTime<Utc>, translate: bool) -> String {
    let mut fm = FrontMatter::default();
    let mut body = String::new();
    for (name, values) in props.iter() {
        match target_for(name, translate) {
            Target::Body => body = values.first().and_then(value_text).unwrap_or_default(),
            Target::Field(key) if !values.is_empty() => {
                fm.set(&key, &encode_values(values));
            }
            Target::Field(_) | Target::Dropped => {}
        }
    }
    if translate && !fm.contains_key("date") {
        fm.set("date", &encode_scalar(&Value::String(timestamp(now))));
    }
    let body = if body.is_empty() || body.ends_with('\n') {
        body
    } else {
        format!("{body}\n")
    };
    Document {
        front_matter: Some(fm),
        body,
    }
    .render()
}

/// RFC 3339 timestamp used for `date`.
#[must_use]
pub fn timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Encode values as a front matter value.
#[must_use]
pub fn encode_values(values: &[Value]) -> String {
    match values {
        [single] => encode_scalar(single),
        many => format!(
            "[{}]",
            many.iter().map(encode_scalar).collect::<Vec<_>>().join(", ")
        ),
    }
}

fn encode_scalar(value: &Value) -> String {
    match value {
        Value::Number(_) | Value::Bool(_) => value.to_string(),
        Value::Object(map) if !map.contains_key("html") && !map.contains_key("value") => {
            value.to_string()
        }
        other => {
            let text = value_text(other).unwrap_or_default();
            Value::String(text).to_string()
        }
    }
}

/// Property values of a decoded front matter value.
///
/// A list yields its items, null yields nothing, anything else is one value.
#[must_use]
pub fn decode_values(value: &serde_yaml::Value) -> Vec<Value> {
    match value {
        serde_yaml::Value::Null => Vec::new(),
        serde_yaml::Value::Sequence(items) => items.iter().filter_map(to_json).collect(),
        other => to_json(other).into_iter().collect(),
    }
}

fn to_json(value: &serde_yaml::Value) -> Option<Value> {
    serde_json::to_value(value)
        .inspect_err(|e| debug!(error = %e, "front matter value has no JSON form"))
        .ok()
}

/// Base slug for a new post: `mp-slug`, `name`, leading content words, or a timestamp.
#[must_use]
pub fn derive_slug(props: &Properties, now: DateTime<Utc>) -> String {
    let candidates = [
        props.first_text("mp-slug"),
        props.first_text("name"),
        props.first_text("content").map(|c| {
            strip_tags(&c)
                .split_whitespace()
                .take(SLUG_WORDS)
                .collect::<Vec<_>>()
                .join(" ")
        }),
    ];
    candidates
        .into_iter()
        .flatten()
        .map(|c| slug::slugify(c.trim()))
        .find(|s| !s.is_empty())
        .unwrap_or_else(|| now.format("%Y%m%d%H%M%S").to_string())
}

fn strip_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => {
                in_tag = false;
                out.push(' ');
            }
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

/// Apply a Micropub update to a stored document.
pub fn apply_update(
    doc: &mut Document,
    replace: &Properties,
    add: &Properties,
    delete: Option<&Removal>,
    translate: bool,
) {
    let fm = doc.front_matter.get_or_insert_with(FrontMatter::default);

    for (name, values) in replace.iter() {
        match target_for(name, translate) {
            Target::Body => doc.body = body_text(values),
            Target::Field(key) if values.is_empty() => {
                fm.remove(&key);
            }
            Target::Field(key) => {
                fm.set(&key, &encode_values(values));
            }
            Target::Dropped => {}
        }
    }

    for (name, values) in add.iter() {
        match target_for(name, translate) {
            Target::Body if doc.body.trim().is_empty() => doc.body = body_text(values),
            Target::Field(key) => {
                let mut current = current_values(fm, &key);
                current.extend(values.iter().cloned());
                fm.set(&key, &encode_values(&current));
            }
            Target::Body | Target::Dropped => {}
        }
    }

    match delete {
        Some(Removal::Properties(names)) => {
            for name in names {
                match target_for(name, translate) {
                    Target::Body => doc.body.clear(),
                    Target::Field(key) => {
                        fm.remove(&key);
                    }
                    Target::Dropped => {}
                }
            }
        }
        Some(Removal::Values(props)) => {
            for (name, values) in props.iter() {
                let Target::Field(key) = target_for(name, translate) else {
                    continue;
                };
                let remaining: Vec<Value> = current_values(fm, &key)
                    .into_iter()
                    .filter(|v| !values.contains(v))
                    .collect();
                if remaining.is_empty() {
                    fm.remove(&key);
                } else {
                    fm.set(&key, &encode_values(&remaining));
                }
            }
        }
        None => {}
    }
}

fn body_text(values: &[Value]) -> String {
    let text = values.first().and_then(value_text).unwrap_or_default();
    if text.is_empty() || text.ends_with('\n') {
        text
    } else {
        format!("{text}\n")
    }
}

fn current_values(fm: &FrontMatter, key: &str) -> Vec<Value> {
    fm.value(key).map(decode_values).unwrap_or_default()
}

/// Microformats2 JSON for a stored document, optionally limited to `only`.
#[must_use]
pub fn source_json(doc: &Document, only: &[String], translate: bool) -> Value {
    let mut properties = serde_json::Map::new();
    if let Some(fm) = &doc.front_matter {
        for key in fm.keys() {
            let Some(name) = property_for(key, translate) else {
                continue;
            };
            properties.insert(name.to_owned(), Value::Array(current_values(fm, key)));
        }
    }
    let body = doc.body.trim();
    if !body.is_empty() {
        properties.insert("content".to_owned(), Value::Array(vec![Value::from(body)]));
    }
    if !only.is_empty() {
        properties.retain(|name, _| only.iter().any(|o| o == name));
        return serde_json::json!({ "properties": properties });
    }
    serde_json::json!({ "type": ["h-entry"], "properties": properties })
}
