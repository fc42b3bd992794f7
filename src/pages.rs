//! Page index consumed by the build-time artifact generators.
//!
//! The index is either supplied by the site generator as JSON:
//!
//! ```json
//! [
//!   {
//!     "path": "/blog/hello/",
//!     "title": "Hello",
//!     "frontmatter": { "date": "2020-01-01", "aliases": ["/old/hello"] }
//!   }
//! ]
//! ```
//!
//! or built from the collections themselves, one page per post at
//! `/{collection}/{slug}/`.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::Post;
use crate::registry::Registry;
use crate::scanner;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub path: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub frontmatter: PageFrontmatter,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageFrontmatter {
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageIndex {
    pub pages: Vec<Page>,
}

impl PageIndex {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read page index: {}", path.display()))?;
        let pages: Vec<Page> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse page index: {}", path.display()))?;
        Ok(Self { pages })
    }

    /// One page per post, at `/{collection}/{slug}/`.
    pub fn from_posts(collection: &str, posts: Vec<Post>) -> Self {
        let pages = posts
            .into_iter()
            .map(|post| Page {
                path: format!("/{}/{}/", collection, post.slug),
                title: post.title,
                frontmatter: PageFrontmatter {
                    aliases: post.aliases,
                    date: post.date,
                    description: post.description,
                    extra: post.extra,
                },
            })
            .collect();
        Self { pages }
    }

    /// Scans every collection of the registry. Any scan failure fails the
    /// whole build.
    pub async fn from_registry(registry: &Registry) -> Result<Self> {
        let mut index = Self::default();
        for collection in registry.list() {
            let posts = scanner::scan(collection)
                .await
                .with_context(|| format!("Failed to scan collection '{}'", collection.name))?;
            let mut pages = Self::from_posts(&collection.name, posts).pages;
            pages.sort_by(|a, b| a.path.cmp(&b.path));
            index.pages.extend(pages);
        }
        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}
