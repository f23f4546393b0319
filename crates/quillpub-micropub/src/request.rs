//! Micropub request bodies.
//!
//! Three encodings carry the same requests:
//!
//! - `application/x-www-form-urlencoded`: `h=entry&content=...&category[]=a`
//! - `application/json`: `{"type": ["h-entry"], "properties": {...}}` or
//!   `{"action": "update", "url": ..., "replace": {...}}`
//! - `multipart/form-data`: form fields plus `photo`, `video`, `audio` files

use quillpub_http::{MultipartForm, MultipartPart};
use serde_json::Value;

use crate::error::{EndpointError, EndpointResult};

/// Property names whose multipart file parts are uploaded as media.
pub const MEDIA_PROPERTIES: [&str; 3] = ["photo", "video", "audio"];

/// Ordered microformats2 properties, each holding one or more values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Properties {
    entries: Vec<(String, Vec<Value>)>,
}

impl Properties {
    /// Append a value to `name`, creating the property if needed.
    pub fn push(&mut self, name: &str, value: Value) {
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some((_, values)) => values.push(value),
            None => self.entries.push((name.to_owned(), vec![value])),
        }
    }

    /// Replace every value of `name`.
    pub fn insert(&mut self, name: &str, values: Vec<Value>) {
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some((_, existing)) => *existing = values,
            None => self.entries.push((name.to_owned(), values)),
        }
    }

    /// Values of `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&[Value]> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_slice())
    }

    /// First value of `name` as text.
    #[must_use]
    pub fn first_text(&self, name: &str) -> Option<String> {
        self.get(name)?.first().and_then(value_text)
    }

    /// Properties in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Value])> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_slice()))
    }

    /// Property names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    /// Whether there are no properties.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn from_json_object(object: &serde_json::Map<String, Value>) -> Self {
        let mut props = Self::default();
        for (name, value) in object {
            let values = match value {
                Value::Array(items) => items.clone(),
                other => vec![other.clone()],
            };
            props.insert(name, values);
        }
        props
    }
}

/// Text of a value: strings as-is, `{html}` or `{value}` objects unwrapped.
#[must_use]
pub fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Object(map) => map
            .get("html")
            .or_else(|| map.get("value"))
            .and_then(value_text),
        Value::Null | Value::Array(_) => None,
    }
}

/// What an update removes.
#[derive(Debug, Clone, PartialEq)]
pub enum Removal {
    /// Remove whole properties.
    Properties(Vec<String>),
    /// Remove specific values.
    Values(Properties),
}

/// A post to create.
#[derive(Debug, Clone, Default)]
pub struct CreateRequest {
    /// Microformats type without the `h-` prefix, e.g. `entry`.
    pub kind: String,
    /// Submitted properties.
    pub properties: Properties,
    /// Files attached under media property names, as `(property, part)`.
    pub uploads: Vec<(String, MultipartPart)>,
}

/// Changes to an existing post.
#[derive(Debug, Clone)]
pub struct UpdateRequest {
    /// URL of the post.
    pub url: String,
    /// Properties whose values are replaced.
    pub replace: Properties,
    /// Values appended to properties.
    pub add: Properties,
    /// Properties or values removed.
    pub delete: Option<Removal>,
}

/// A parsed Micropub request.
#[derive(Debug, Clone)]
pub enum MicropubRequest {
    /// Create a post.
    Create(CreateRequest),
    /// Update a post.
    Update(UpdateRequest),
    /// Delete a post.
    Delete {
        /// URL of the post.
        url: String,
    },
    /// Restore a deleted post.
    Undelete {
        /// URL of the post.
        url: String,
    },
}

/// A parsed body plus any `access_token` it carried.
#[derive(Debug, Clone)]
pub struct ParsedBody {
    /// The request.
    pub request: MicropubRequest,
    /// Token submitted in the body.
    pub access_token: Option<String>,
}

/// Parse a form-encoded body.
pub fn parse_form(body: &[u8]) -> EndpointResult<ParsedBody> {
    let pairs = form_urlencoded::parse(body).map(|(k, v)| (k.into_owned(), v.into_owned()));
    from_pairs(pairs, Vec::new())
}

/// Parse a multipart body, keeping media files for upload.
pub fn parse_multipart_body(form: MultipartForm) -> EndpointResult<ParsedBody> {
    let mut fields = Vec::new();
    let mut uploads = Vec::new();
    for part in form.parts {
        if part.is_file() {
            let name = array_name(&part.name).to_owned();
            if MEDIA_PROPERTIES.contains(&name.as_str()) {
                uploads.push((name, part));
            }
        } else {
            fields.push((part.name.clone(), part.text()));
        }
    }
    from_pairs(fields, uploads)
}

/// Parse a JSON body.
pub fn parse_json(body: &[u8]) -> EndpointResult<ParsedBody> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| EndpointError::InvalidRequest(format!("invalid JSON body: {e}")))?;
    let Value::Object(object) = value else {
        return Err(EndpointError::InvalidRequest("JSON body must be an object".into()));
    };
    let access_token = object
        .get("access_token")
        .and_then(Value::as_str)
        .map(str::to_owned);

    if let Some(action) = object.get("action").and_then(Value::as_str) {
        let url = required_url(object.get("url").and_then(Value::as_str))?;
        let request = match action {
            "delete" => MicropubRequest::Delete { url },
            "undelete" => MicropubRequest::Undelete { url },
            "update" => MicropubRequest::Update(UpdateRequest {
                url,
                replace: json_properties(object.get("replace"), "replace")?,
                add: json_properties(object.get("add"), "add")?,
                delete: json_removal(object.get("delete"))?,
            }),
            other => {
                return Err(EndpointError::InvalidRequest(format!(
                    "unsupported action: {other}"
                )));
            }
        };
        return Ok(ParsedBody {
            request,
            access_token,
        });
    }

    let kind = match object.get("type") {
        Some(Value::Array(types)) => types.first().and_then(Value::as_str),
        Some(Value::String(kind)) => Some(kind.as_str()),
        _ => None,
    }
    .unwrap_or("h-entry");
    let properties = match object.get("properties") {
        Some(Value::Object(props)) => Properties::from_json_object(props),
        Some(_) => {
            return Err(EndpointError::InvalidRequest(
                "properties must be an object".into(),
            ));
        }
        None => Properties::default(),
    };
    Ok(ParsedBody {
        request: MicropubRequest::Create(CreateRequest {
            kind: kind.trim_start_matches("h-").to_owned(),
            properties,
            uploads: Vec::new(),
        }),
        access_token,
    })
}

fn from_pairs(
    pairs: impl IntoIterator<Item = (String, String)>,
    uploads: Vec<(String, MultipartPart)>,
) -> EndpointResult<ParsedBody> {
    let mut kind = None;
    let mut action = None;
    let mut url = None;
    let mut access_token = None;
    let mut properties = Properties::default();

    for (key, value) in pairs {
        match key.as_str() {
            "h" => kind = Some(value),
            "action" => action = Some(value),
            "access_token" => access_token = Some(value),
            "url" => url = Some(value),
            _ => properties.push(array_name(&key), Value::String(value)),
        }
    }

    let request = match action.as_deref() {
        None => {
            // `url` is a regular property on creates (e.g. for bookmarks of the own site).
            if let Some(url) = url {
                properties.push("url", Value::String(url));
            }
            MicropubRequest::Create(CreateRequest {
                kind: kind.unwrap_or_else(|| "entry".to_owned()),
                properties,
                uploads,
            })
        }
        Some("delete") => MicropubRequest::Delete {
            url: required_url(url.as_deref())?,
        },
        Some("undelete") => MicropubRequest::Undelete {
            url: required_url(url.as_deref())?,
        },
        Some("update") => {
            return Err(EndpointError::InvalidRequest(
                "updates must be sent as JSON".into(),
            ));
        }
        Some(other) => {
            return Err(EndpointError::InvalidRequest(format!(
                "unsupported action: {other}"
            )));
        }
    };
    Ok(ParsedBody {
        request,
        access_token,
    })
}

fn array_name(key: &str) -> &str {
    key.strip_suffix("[]").unwrap_or(key)
}

fn required_url(url: Option<&str>) -> EndpointResult<String> {
    url.map(str::trim)
        .filter(|u| !u.is_empty())
        .map(str::to_owned)
        .ok_or_else(|| EndpointError::InvalidRequest("missing url".into()))
}

fn json_properties(value: Option<&Value>, field: &str) -> EndpointResult<Properties> {
    match value {
        None | Some(Value::Null) => Ok(Properties::default()),
        Some(Value::Object(map)) => Ok(Properties::from_json_object(map)),
        Some(_) => Err(EndpointError::InvalidRequest(format!(
            "{field} must be an object"
        ))),
    }
}

fn json_removal(value: Option<&Value>) -> EndpointResult<Option<Removal>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(names)) => names
            .iter()
            .map(|n| {
                n.as_str().map(str::to_owned).ok_or_else(|| {
                    EndpointError::InvalidRequest("delete names must be strings".into())
                })
            })
            .collect::<EndpointResult<Vec<_>>>()
            .map(|names| Some(Removal::Properties(names))),
        Some(Value::Object(map)) => Ok(Some(Removal::Values(Properties::from_json_object(map)))),
        Some(_) => Err(EndpointError::InvalidRequest(
            "delete must be an array or an object".into(),
        )),
    }
}
