//! Core data models: collections and the posts parsed from their documents.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// File extension used when a collection does not declare one.
pub const DEFAULT_EXTENSION: &str = "md";

/// A named, folder-backed group of documents.
///
/// Deserialized from one entry of the CMS configuration's `collections`
/// list. Keys other than `name`, `label` and `folder` are kept in `extra`
/// and serialized back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Folder as written in the configuration.
    pub folder: PathBuf,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    /// Absolute folder path, filled in by the registry at load time.
    #[serde(skip)]
    pub(crate) root: PathBuf,
}

impl Collection {
    pub fn new(name: impl Into<String>, folder: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            label: None,
            folder: folder.into(),
            extra: Map::new(),
            root: PathBuf::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Absolute path of the folder scanned for documents.
    ///
    /// Empty until the collection has been loaded into a registry.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Extension of eligible document files, without the leading dot.
    pub fn extension(&self) -> &str {
        self.extra
            .get("extension")
            .and_then(Value::as_str)
            .map(|ext| ext.trim_start_matches('.'))
            .filter(|ext| !ext.is_empty())
            .unwrap_or(DEFAULT_EXTENSION)
    }
}

/// A parsed document.
///
/// Built fresh from the file on every read. Known metadata fields are
/// typed; everything else lands in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Post {
    pub slug: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl Post {
    /// Drops the body, for listings where only metadata is needed.
    pub fn without_content(mut self) -> Self {
        self.content = None;
        self
    }
}

/// Orders posts for output: newest first, undated last, then by slug.
///
/// The sort is stable, so posts that tie keep the scan's file-name order.
/// Every reader of a collection goes through here, which makes slug
/// lookups pick the same post on every request.
pub fn sort_posts(posts: &mut [Post]) {
    posts.sort_by(|a, b| {
        let by_date = match (&a.date, &b.date) {
            (Some(x), Some(y)) => y.cmp(x),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        by_date.then_with(|| a.slug.cmp(&b.slug))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_collection_extension_defaults_to_markdown() {
        let c = Collection::new("blog", "content/blog");
        assert_eq!(c.extension(), "md");
    }

    #[test]
    fn test_collection_extension_from_extra() {
        let mut c = Collection::new("notes", "content/notes");
        c.extra.insert("extension".into(), json!(".markdown"));
        assert_eq!(c.extension(), "markdown");
    }

    #[test]
    fn test_collection_serializes_extra_fields_flat() {
        let mut c = Collection::new("blog", "content/blog").with_label("Blog");
        c.extra.insert("create".into(), json!(true));
        c.root = PathBuf::from("/srv/site/content/blog");

        let v = serde_json::to_value(&c).unwrap();
        assert_eq!(
            v,
            json!({"name": "blog", "label": "Blog", "folder": "content/blog", "create": true})
        );
    }

    fn post(slug: &str, date: Option<&str>, title: &str) -> Post {
        Post {
            slug: slug.to_string(),
            title: Some(title.to_string()),
            date: date.map(str::to_string),
            description: None,
            aliases: vec![],
            extra: Map::new(),
            content: None,
        }
    }

    fn titles(posts: &[Post]) -> Vec<&str> {
        posts.iter().filter_map(|p| p.title.as_deref()).collect()
    }

    #[test]
    fn test_sort_posts_newest_first_undated_last() {
        let mut posts = vec![
            post("undated", None, "u"),
            post("old", Some("2018-03-01"), "o"),
            post("new", Some("2021-07-15"), "n"),
            post("b-same-day", Some("2020-01-01"), "b"),
            post("a-same-day", Some("2020-01-01"), "a"),
        ];
        sort_posts(&mut posts);

        let slugs: Vec<&str> = posts.iter().map(|p| p.slug.as_str()).collect();
        assert_eq!(
            slugs,
            vec!["new", "a-same-day", "b-same-day", "old", "undated"]
        );
    }

    #[test]
    fn test_sort_posts_keeps_input_order_on_full_ties() {
        let mut posts = vec![
            post("dup", Some("2020-01-01"), "first"),
            post("dup", Some("2020-01-01"), "second"),
            post("dup", Some("2020-01-01"), "third"),
        ];
        sort_posts(&mut posts);
        assert_eq!(titles(&posts), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_post_without_content_omits_field() {
        let post = Post {
            slug: "hello".into(),
            title: Some("Hello".into()),
            date: None,
            description: None,
            aliases: vec![],
            extra: Map::new(),
            content: Some("body".into()),
        };
        let full = serde_json::to_value(&post).unwrap();
        assert_eq!(full["content"], "body");

        let summary = serde_json::to_value(post.without_content()).unwrap();
        assert_eq!(summary, json!({"slug": "hello", "title": "Hello"}));
    }
}
