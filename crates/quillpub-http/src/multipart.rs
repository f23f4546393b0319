//! `multipart/form-data` parsing and encoding.
//!
//! Parses an already-collected body into ordered parts (plain fields and
//! file uploads, in submission order) and encodes parts back into a fresh
//! body with a new boundary for per-file fan-out.

use bytes::{BufMut, Bytes, BytesMut};

/// Errors produced while reading a multipart body.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MultipartError {
    /// The content type is not `multipart/form-data`.
    #[error("expected multipart/form-data, got: {0}")]
    NotMultipart(String),
    /// The content type carries no boundary parameter.
    #[error("missing boundary in Content-Type")]
    MissingBoundary,
    /// The boundary parameter is empty.
    #[error("empty boundary in Content-Type")]
    EmptyBoundary,
    /// No part could be read from a non-empty body.
    #[error("no parts found in multipart body")]
    NoParts,
}

/// One part of a multipart submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartPart {
    /// Form field name.
    pub name: String,
    /// Client file name. Present exactly when the part is a file upload.
    pub filename: Option<String>,
    /// Declared content type of the part.
    pub content_type: Option<String>,
    /// Raw part content.
    pub data: Bytes,
}

impl MultipartPart {
    /// A plain text field.
    #[must_use]
    pub fn field(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            filename: None,
            content_type: None,
            data: Bytes::from(value.into()),
        }
    }

    /// A file upload.
    #[must_use]
    pub fn file(
        name: impl Into<String>,
        filename: impl Into<String>,
        content_type: Option<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            name: name.into(),
            filename: Some(filename.into()),
            content_type,
            data: data.into(),
        }
    }

    /// Whether the part is a file upload.
    #[must_use]
    pub fn is_file(&self) -> bool {
        self.filename.is_some()
    }

    /// The content decoded as UTF-8, replacing invalid sequences.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }
}

/// A parsed multipart submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultipartForm {
    /// Parts in submission order.
    pub parts: Vec<MultipartPart>,
}

impl MultipartForm {
    /// File parts in submission order.
    pub fn files(&self) -> impl Iterator<Item = &MultipartPart> {
        self.parts.iter().filter(|p| p.is_file())
    }

    /// Non-file parts in submission order.
    pub fn fields(&self) -> impl Iterator<Item = &MultipartPart> {
        self.parts.iter().filter(|p| !p.is_file())
    }

    /// Number of file parts.
    #[must_use]
    pub fn file_count(&self) -> usize {
        self.files().count()
    }

    /// First text value of a non-file field.
    #[must_use]
    pub fn field_value(&self, name: &str) -> Option<String> {
        self.fields().find(|p| p.name == name).map(MultipartPart::text)
    }
}

/// Extract the boundary from a `multipart/form-data; boundary=...` content type.
pub fn extract_boundary(content_type: &str) -> Result<String, MultipartError> {
    if !content_type
        .trim_start()
        .to_ascii_lowercase()
        .starts_with("multipart/form-data")
    {
        return Err(MultipartError::NotMultipart(content_type.to_owned()));
    }

    for part in content_type.split(';') {
        let trimmed = part.trim();
        let Some((key, val)) = trimmed.split_once('=') else {
            continue;
        };
        if key.trim().eq_ignore_ascii_case("boundary") {
            let boundary = val.trim().trim_matches('"').to_owned();
            if boundary.is_empty() {
                return Err(MultipartError::EmptyBoundary);
            }
            return Ok(boundary);
        }
    }

    Err(MultipartError::MissingBoundary)
}

/// Parse a `multipart/form-data` body.
pub fn parse_multipart(body: &[u8], boundary: &str) -> Result<MultipartForm, MultipartError> {
    let delimiter = format!("--{boundary}");
    let end_delimiter = format!("--{boundary}--");

    let mut parts = Vec::new();
    for part_bytes in split_multipart_parts(body, delimiter.as_bytes(), end_delimiter.as_bytes()) {
        let Some((headers_section, part_body)) = split_headers_body(part_bytes) else {
            continue;
        };

        let disposition = parse_content_disposition(headers_section);
        let Some(name) = disposition.name else {
            continue;
        };

        parts.push(MultipartPart {
            name,
            filename: disposition.filename,
            content_type: parse_part_content_type(headers_section),
            data: Bytes::copy_from_slice(part_body),
        });
    }

    if parts.is_empty() && !body.is_empty() {
        return Err(MultipartError::NoParts);
    }
    Ok(MultipartForm { parts })
}

/// A fresh random boundary.
#[must_use]
pub fn new_boundary() -> String {
    format!("----quillpub-{}", uuid::Uuid::new_v4().simple())
}

/// The `Content-Type` header value for `boundary`.
#[must_use]
pub fn content_type_for(boundary: &str) -> String {
    format!("multipart/form-data; boundary={boundary}")
}

/// Encode parts into a multipart body delimited by `boundary`.
#[must_use]
pub fn encode_multipart<'a>(
    parts: impl IntoIterator<Item = &'a MultipartPart>,
    boundary: &str,
) -> Bytes {
    let mut out = BytesMut::new();
    for part in parts {
        out.put_slice(format!("--{boundary}\r\n").as_bytes());
        let name = escape_quoted(&part.name);
        match &part.filename {
            Some(filename) => out.put_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{name}\"; filename=\"{}\"\r\n",
                    escape_quoted(filename)
                )
                .as_bytes(),
            ),
            None => out.put_slice(
                format!("Content-Disposition: form-data; name=\"{name}\"\r\n").as_bytes(),
            ),
        }
        if let Some(ct) = &part.content_type {
            out.put_slice(format!("Content-Type: {ct}\r\n").as_bytes());
        } else if part.is_file() {
            out.put_slice(b"Content-Type: application/octet-stream\r\n");
        }
        out.put_slice(b"\r\n");
        out.put_slice(&part.data);
        out.put_slice(b"\r\n");
    }
    out.put_slice(format!("--{boundary}--\r\n").as_bytes());
    out.freeze()
}

fn escape_quoted(value: &str) -> String {
    value.replace('"', "%22").replace(['\r', '\n'], " ")
}

/// Split the multipart body into individual parts by boundary.
fn split_multipart_parts<'a>(
    body: &'a [u8],
    delimiter: &[u8],
    end_delimiter: &[u8],
) -> Vec<&'a [u8]> {
    let mut parts = Vec::new();
    let mut remaining = body;

    // Skip the preamble.
    if let Some(pos) = find_bytes(remaining, delimiter) {
        remaining = skip_crlf(&remaining[pos + delimiter.len()..]);
    } else {
        return parts;
    }

    loop {
        if remaining.starts_with(b"--")
            || remaining.starts_with(end_delimiter)
            || remaining
                .strip_prefix(b"\r\n")
                .is_some_and(|r| r.starts_with(end_delimiter))
        {
            break;
        }

        // Delimiters inside the body are always preceded by CRLF.
        let mut needle = Vec::with_capacity(delimiter.len() + 2);
        needle.extend_from_slice(b"\r\n");
        needle.extend_from_slice(delimiter);

        if let Some(pos) = find_bytes(remaining, &needle) {
            parts.push(&remaining[..pos]);
            remaining = &remaining[pos + needle.len()..];
            remaining = skip_crlf(remaining);
        } else {
            let part = strip_trailing_crlf(remaining);
            if !part.is_empty() {
                parts.push(part);
            }
            break;
        }
    }

    parts
}

/// Split a part into headers and body at the first blank line.
fn split_headers_body(part: &[u8]) -> Option<(&[u8], &[u8])> {
    let separator = b"\r\n\r\n";
    find_bytes(part, separator).map(|pos| (&part[..pos], &part[pos + separator.len()..]))
}

struct ContentDisposition {
    name: Option<String>,
    filename: Option<String>,
}

fn parse_content_disposition(headers: &[u8]) -> ContentDisposition {
    let headers_str = String::from_utf8_lossy(headers);
    let mut name = None;
    let mut filename = None;

    for line in headers_str.split("\r\n") {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        if !key.trim().eq_ignore_ascii_case("content-disposition") {
            continue;
        }
        for (key, value) in disposition_params(value) {
            match key.to_ascii_lowercase().as_str() {
                "name" => name = Some(value),
                "filename" => filename = Some(value),
                _ => {}
            }
        }
    }

    ContentDisposition { name, filename }
}

/// `key=value` parameters of a disposition header value, after the type.
///
/// Quoted values may contain `;` and `=`, and `\` escapes the next character.
fn disposition_params(value: &str) -> Vec<(String, String)> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' if in_quotes => {
                current.push(c);
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            '"' => {
                in_quotes = !in_quotes;
                current.push(c);
            }
            ';' if !in_quotes => segments.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    segments.push(current);

    segments
        .into_iter()
        .skip(1)
        .filter_map(|segment| {
            let (key, value) = segment.split_once('=')?;
            Some((key.trim().to_owned(), unquote_param(value.trim())))
        })
        .collect()
}

fn unquote_param(value: &str) -> String {
    let Some(inner) = value.strip_prefix('"') else {
        return value.to_owned();
    };
    let inner = inner.strip_suffix('"').unwrap_or(inner);
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn parse_part_content_type(headers: &[u8]) -> Option<String> {
    let headers_str = String::from_utf8_lossy(headers);
    headers_str.split("\r\n").find_map(|line| {
        let (key, value) = line.split_once(':')?;
        key.trim()
            .eq_ignore_ascii_case("content-type")
            .then(|| value.trim().to_owned())
    })
}

fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn skip_crlf(data: &[u8]) -> &[u8] {
    data.strip_prefix(b"\r\n").unwrap_or(data)
}

fn strip_trailing_crlf(data: &[u8]) -> &[u8] {
    data.strip_suffix(b"\r\n").unwrap_or(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    const THREE_FILES: &str = "--xyzzy\r\n\
         Content-Disposition: form-data; name=\"alt\"\r\n\
         \r\n\
         a cat\r\n\
         --xyzzy\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"one.png\"\r\n\
         Content-Type: image/png\r\n\
         \r\n\
         \x01\x02\r\n\
         --xyzzy\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"two.jpg\"\r\n\
         Content-Type: image/jpeg\r\n\
         \r\n\
         two\r\n\
         --xyzzy\r\n\
         Content-Disposition: form-data; name=\"photo[]\"; filename=\"three.gif\"\r\n\
         \r\n\
         three\r\n\
         --xyzzy--\r\n";

    #[test]
    fn test_should_extract_boundary() {
        let ct = "multipart/form-data; boundary=----WebKitFormBoundary7MA4YWxkTrZu0gW";
        let b = extract_boundary(ct).expect("should extract boundary");
        assert_eq!(b, "----WebKitFormBoundary7MA4YWxkTrZu0gW");
    }

    #[test]
    fn test_should_extract_quoted_boundary() {
        let b = extract_boundary(r#"multipart/form-data; charset=utf-8; boundary="abc123""#)
            .expect("should extract boundary");
        assert_eq!(b, "abc123");
    }

    #[test]
    fn test_should_reject_non_multipart() {
        assert!(matches!(
            extract_boundary("application/json"),
            Err(MultipartError::NotMultipart(_))
        ));
        assert_eq!(
            extract_boundary("multipart/form-data"),
            Err(MultipartError::MissingBoundary)
        );
    }

    #[test]
    fn test_should_parse_parts_in_order() {
        let form = parse_multipart(THREE_FILES.as_bytes(), "xyzzy").expect("should parse");
        assert_eq!(form.parts.len(), 4);
        assert_eq!(form.file_count(), 3);
        assert_eq!(form.field_value("alt").as_deref(), Some("a cat"));

        let files: Vec<&MultipartPart> = form.files().collect();
        assert_eq!(files[0].filename.as_deref(), Some("one.png"));
        assert_eq!(files[0].data.as_ref(), b"\x01\x02");
        assert_eq!(files[1].content_type.as_deref(), Some("image/jpeg"));
        assert_eq!(files[2].name, "photo[]");
        assert!(files[2].content_type.is_none());
    }

    #[test]
    fn test_should_keep_crlf_inside_file_data() {
        let body = "--b\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"x.txt\"\r\n\
             \r\n\
             line1\r\nline2\r\n\
             --b--\r\n";
        let form = parse_multipart(body.as_bytes(), "b").expect("should parse");
        assert_eq!(form.parts[0].data.as_ref(), b"line1\r\nline2");
    }

    #[test]
    fn test_should_keep_separators_inside_quoted_filenames() {
        let body = "--b\r\n\
             Content-Disposition: form-data; name=\"photo\"; filename=\"a;b=c.jpg\"\r\n\
             \r\n\
             JPG\r\n\
             --b\r\n\
             content-disposition: form-data; filename=\"say \\\"hi\\\".png\"; name=alt2\r\n\
             \r\n\
             PNG\r\n\
             --b--\r\n";
        let form = parse_multipart(body.as_bytes(), "b").expect("should parse");
        assert_eq!(form.parts[0].name, "photo");
        assert_eq!(form.parts[0].filename.as_deref(), Some("a;b=c.jpg"));
        assert_eq!(form.parts[1].name, "alt2");
        assert_eq!(form.parts[1].filename.as_deref(), Some("say \"hi\".png"));
    }

    #[test]
    fn test_should_reject_body_without_parts() {
        assert_eq!(
            parse_multipart(b"garbage", "abc"),
            Err(MultipartError::NoParts)
        );
    }

    #[test]
    fn test_should_encode_fields_and_file_with_new_boundary() {
        let alt = MultipartPart::field("alt", "a cat");
        let file = MultipartPart::file("photo", "cat.png", Some("image/png".into()), "PNG");
        let boundary = new_boundary();
        let body = encode_multipart([&alt, &file], &boundary);

        let parsed = parse_multipart(&body, &boundary).expect("should parse encoded body");
        assert_eq!(parsed.parts, vec![alt, file]);
        assert!(content_type_for(&boundary).starts_with("multipart/form-data; boundary=----quillpub-"));
    }
}
