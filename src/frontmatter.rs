//! Document parsing.
//!
//! A document is a text file that may start with a TOML metadata block
//! fenced by `+++` lines:
//!
//! ```text
//! +++
//! title = "Example"
//! slug = "example"
//! date = "2020-01-01"
//! +++
//! Body text here.
//! ```
//!
//! Without an opening fence the metadata is empty and the whole file is
//! the body. The body is returned verbatim; no markdown rendering happens
//! here.

use std::path::Path;

use serde_json::{Map, Value};
use toml::Table;

use crate::error::ParseError;
use crate::models::Post;

/// Fence line that opens and closes the metadata block.
pub const DELIMITER: &str = "+++";

/// The metadata block starts on the line after the opening fence.
const METADATA_FIRST_LINE: usize = 2;

/// Parses one document into a [`Post`].
///
/// `file` identifies the document in error messages and supplies the slug
/// (its file stem) when the metadata has no `slug` key.
pub fn parse_document(file: &str, bytes: &[u8]) -> Result<Post, ParseError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| parse_error(file, 1, 1, format!("invalid UTF-8: {e}")))?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let (metadata, body) = match split(text) {
        Some(parts) => parts,
        None => return Err(parse_error(file, 1, 1, "unterminated metadata block")),
    };

    let mut table = match metadata {
        Some(block) => decode_block(file, block)?,
        None => Table::new(),
    };

    let field_error = |key: &str, expected: &str| {
        let (line, column) = key_position(metadata.unwrap_or_default(), key);
        parse_error(
            file,
            line,
            column,
            format!("field `{key}` must be {expected}"),
        )
    };

    let slug = take_string(&mut table, "slug").map_err(|_| field_error("slug", "a string"))?;
    let title = take_string(&mut table, "title").map_err(|_| field_error("title", "a string"))?;
    let description = take_string(&mut table, "description")
        .map_err(|_| field_error("description", "a string"))?;
    let date = take_date(&mut table).map_err(|_| field_error("date", "a string or a date"))?;
    let aliases = take_aliases(&mut table)
        .map_err(|_| field_error("aliases", "an array of strings"))?;

    // The body always wins over a metadata key of the same name.
    table.remove("content");

    let slug = slug
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| file_stem(file));

    let extra: Map<String, Value> = table
        .into_iter()
        .map(|(k, v)| (k, toml_to_json(v)))
        .collect();

    Ok(Post {
        slug,
        title,
        date,
        description,
        aliases,
        extra,
        content: Some(body.to_string()),
    })
}

/// Splits a document into its optional metadata block and its body.
///
/// Returns `None` when an opening fence has no matching closing fence.
fn split(text: &str) -> Option<(Option<&str>, &str)> {
    let (first, rest) = split_line(text);
    if !is_delimiter(first) {
        return Some((None, text));
    }

    let mut pos = 0;
    loop {
        let (line, after) = split_line(&rest[pos..]);
        if is_delimiter(line) {
            return Some((Some(&rest[..pos]), after));
        }
        if pos + line.len() >= rest.len() {
            return None;
        }
        pos = rest.len() - after.len();
    }
}

/// Returns the first line (without its terminator) and the remainder.
fn split_line(s: &str) -> (&str, &str) {
    match s.find('\n') {
        Some(i) => (&s[..i], &s[i + 1..]),
        None => (s, ""),
    }
}

fn is_delimiter(line: &str) -> bool {
    line.trim_end() == DELIMITER
}

fn decode_block(file: &str, block: &str) -> Result<Table, ParseError> {
    block.parse::<Table>().map_err(|e| {
        let (line, column) = match e.span() {
            Some(span) => position(block, span.start),
            None => (1, 1),
        };
        parse_error(
            file,
            line + METADATA_FIRST_LINE - 1,
            column,
            e.message().trim_end().to_string(),
        )
    })
}

/// 1-based line and column of a byte offset within `text`.
fn position(text: &str, offset: usize) -> (usize, usize) {
    let before = text.get(..offset.min(text.len())).unwrap_or(text);
    let line = before.matches('\n').count() + 1;
    let column = before.rsplit('\n').next().map_or(0, |l| l.chars().count()) + 1;
    (line, column)
}

/// File-relative position of a top-level `key = ...` line in the block.
fn key_position(block: &str, key: &str) -> (usize, usize) {
    for (i, line) in block.lines().enumerate() {
        let trimmed = line.trim_start();
        let Some(after) = trimmed.strip_prefix(key) else {
            continue;
        };
        if after.trim_start().starts_with('=') {
            let column = line.len() - trimmed.len() + 1;
            return (i + METADATA_FIRST_LINE, column);
        }
    }
    (METADATA_FIRST_LINE, 1)
}

fn take_string(table: &mut Table, key: &str) -> Result<Option<String>, ()> {
    match table.remove(key) {
        None => Ok(None),
        Some(toml::Value::String(s)) => Ok(Some(s)),
        Some(_) => Err(()),
    }
}

fn take_date(table: &mut Table) -> Result<Option<String>, ()> {
    match table.remove("date") {
        None => Ok(None),
        Some(toml::Value::String(s)) => Ok(Some(s)),
        Some(toml::Value::Datetime(dt)) => Ok(Some(dt.to_string())),
        Some(_) => Err(()),
    }
}

fn take_aliases(table: &mut Table) -> Result<Vec<String>, ()> {
    match table.remove("aliases") {
        None => Ok(Vec::new()),
        Some(toml::Value::Array(items)) => items
            .into_iter()
            .map(|item| match item {
                toml::Value::String(s) => Ok(s),
                _ => Err(()),
            })
            .collect(),
        Some(_) => Err(()),
    }
}

/// Converts TOML metadata to JSON. Datetimes become their TOML text form.
fn toml_to_json(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::from(i),
        toml::Value::Float(f) => serde_json::Number::from_f64(f).map_or(Value::Null, Value::Number),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(items) => Value::Array(items.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
    }
}

fn file_stem(file: &str) -> String {
    Path::new(file)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn parse_error(file: &str, line: usize, column: usize, message: impl Into<String>) -> ParseError {
    ParseError {
        file: file.to_string(),
        line,
        column,
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(content: &str) -> Result<Post, ParseError> {
        parse_document("content/blog/first-post.md", content.as_bytes())
    }

    #[test]
    fn test_missing_frontmatter_returns_whole_file() {
        let post = parse("this is a file\n+++\nnot metadata\n+++\n").unwrap();
        assert_eq!(post.slug, "first-post");
        assert_eq!(post.title, None);
        assert!(post.extra.is_empty());
        assert_eq!(
            post.content.as_deref(),
            Some("this is a file\n+++\nnot metadata\n+++\n")
        );
    }

    #[test]
    fn test_body_does_not_contain_frontmatter() {
        let post = parse("+++\ntitle = \"Foo\"\nslug = \"foo\"\n+++\nHello").unwrap();
        assert_eq!(post.slug, "foo");
        assert_eq!(post.title.as_deref(), Some("Foo"));
        assert_eq!(post.content.as_deref(), Some("Hello"));
    }

    #[test]
    fn test_empty_frontmatter_and_empty_body() {
        let post = parse("+++\n+++").unwrap();
        assert_eq!(post.slug, "first-post");
        assert_eq!(post.content.as_deref(), Some(""));
    }

    #[test]
    fn test_only_first_block_is_metadata() {
        let content = "+++\ntitle = \"first\"\n+++\n+++\ntitle = \"second\"\n+++\nbody";
        let post = parse(content).unwrap();
        assert_eq!(post.title.as_deref(), Some("first"));
        assert_eq!(
            post.content.as_deref(),
            Some("+++\ntitle = \"second\"\n+++\nbody")
        );
    }

    #[test]
    fn test_crlf_line_endings() {
        let post = parse("+++\r\ntitle = \"Windows\"\r\n+++\r\nBody\r\n").unwrap();
        assert_eq!(post.title.as_deref(), Some("Windows"));
        assert_eq!(post.content.as_deref(), Some("Body\r\n"));
    }

    #[test]
    fn test_leading_bom_is_ignored() {
        let post = parse("\u{feff}+++\nslug = \"bom\"\n+++\nx").unwrap();
        assert_eq!(post.slug, "bom");
        assert_eq!(post.content.as_deref(), Some("x"));
    }

    #[test]
    fn test_known_fields_and_extras() {
        let content = r#"+++
title = "Nested"
date = 2020-01-01
description = "A post"
aliases = ["/old/one", "/old/two"]
draft = true
tags = ["rust", "cms"]
published = 1979-05-27T07:32:00Z

[author]
name = "Someone"
+++
Body
"#;
        let post = parse(content).unwrap();
        assert_eq!(post.date.as_deref(), Some("2020-01-01"));
        assert_eq!(post.description.as_deref(), Some("A post"));
        assert_eq!(post.aliases, vec!["/old/one", "/old/two"]);
        assert_eq!(post.extra["draft"], json!(true));
        assert_eq!(post.extra["tags"], json!(["rust", "cms"]));
        assert_eq!(post.extra["published"], json!("1979-05-27T07:32:00Z"));
        assert_eq!(post.extra["author"], json!({"name": "Someone"}));
        assert_eq!(post.content.as_deref(), Some("Body\n"));
    }

    #[test]
    fn test_content_key_in_metadata_is_ignored() {
        let post = parse("+++\ncontent = \"shadow\"\n+++\nreal").unwrap();
        assert!(!post.extra.contains_key("content"));
        assert_eq!(post.content.as_deref(), Some("real"));
    }

    #[test]
    fn test_empty_slug_falls_back_to_file_stem() {
        let post = parse("+++\nslug = \"\"\n+++\n").unwrap();
        assert_eq!(post.slug, "first-post");
    }

    #[test]
    fn test_decode_error_reports_file_line() {
        let err = parse("+++\nslug = \"a\"\ntitle = nope\n+++\nbody").unwrap_err();
        assert_eq!(err.file, "content/blog/first-post.md");
        assert_eq!(err.line, 3);
        assert!(err.column >= 1);
        assert!(!err.message.is_empty());
        assert!(err.to_string().contains("content/blog/first-post.md"));
    }

    #[test]
    fn test_decode_error_on_first_metadata_line() {
        let err = parse("+++\n= 1\n+++\n").unwrap_err();
        assert_eq!(err.line, 2);
    }

    #[test]
    fn test_unterminated_block_is_an_error() {
        let err = parse("+++\ntitle = \"open\"\nno closing fence").unwrap_err();
        assert_eq!((err.line, err.column), (1, 1));
        assert!(err.message.contains("unterminated"));

        assert!(parse("+++").is_err());
    }

    #[test]
    fn test_wrong_field_type_points_at_key() {
        let err = parse("+++\nslug = \"a\"\n  title = 5\n+++\n").unwrap_err();
        assert_eq!((err.line, err.column), (3, 3));
        assert!(err.message.contains("`title`"));

        let err = parse("+++\naliases = \"/one\"\n+++\n").unwrap_err();
        assert_eq!(err.line, 2);
        assert!(err.message.contains("`aliases`"));
    }

    #[test]
    fn test_invalid_utf8_is_an_error() {
        let err = parse_document("bad.md", &[0x2b, 0xff, 0xfe]).unwrap_err();
        assert_eq!((err.line, err.column), (1, 1));
    }

    #[test]
    fn test_deterministic() {
        let content = "+++\nb = 2\na = 1\ntitle = \"T\"\n+++\nbody";
        let p1 = serde_json::to_string(&parse(content).unwrap()).unwrap();
        let p2 = serde_json::to_string(&parse(content).unwrap()).unwrap();
        assert_eq!(p1, p2);
    }

    #[test]
    fn test_position() {
        assert_eq!(position("abc", 0), (1, 1));
        assert_eq!(position("abc\ndef", 5), (2, 2));
        assert_eq!(position("abc\n", 4), (2, 1));
    }
}
