//! Redirect table generation.
//!
//! Every alias listed in a page's frontmatter becomes one
//! `alias<TAB>destination` line of a Netlify-style `_redirects` file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::pages::PageIndex;

pub const REDIRECTS_FILE: &str = "_redirects";

/// Redirect lines in page order, then alias order.
pub fn redirect_lines(index: &PageIndex) -> Vec<String> {
    index
        .pages
        .iter()
        .flat_map(|page| {
            page.frontmatter
                .aliases
                .iter()
                .map(move |alias| format!("{}\t{}", alias, page.path))
        })
        .collect()
}

/// Writes `_redirects` into `out_dir`. Nothing is written when no page has
/// an alias.
pub fn write_redirects(index: &PageIndex, out_dir: &Path) -> Result<Option<PathBuf>> {
    let lines = redirect_lines(index);
    if lines.is_empty() {
        return Ok(None);
    }

    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create output directory: {}", out_dir.display()))?;
    let path = out_dir.join(REDIRECTS_FILE);
    std::fs::write(&path, lines.join("\n"))
        .with_context(|| format!("Failed to write {}", path.display()))?;

    tracing::info!(path = %path.display(), redirects = lines.len(), "wrote redirect table");
    Ok(Some(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pages::{Page, PageFrontmatter};
    use tempfile::TempDir;

    fn page(path: &str, aliases: &[&str]) -> Page {
        Page {
            path: path.to_string(),
            title: None,
            frontmatter: PageFrontmatter {
                aliases: aliases.iter().map(|a| a.to_string()).collect(),
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_redirect_lines_flatten_aliases() {
        let index = PageIndex {
            pages: vec![
                page("/blog/a/", &["/old/a", "/older/a"]),
                page("/about/", &[]),
                page("/blog/b/", &["/old/b"]),
            ],
        };
        assert_eq!(
            redirect_lines(&index),
            vec!["/old/a\t/blog/a/", "/older/a\t/blog/a/", "/old/b\t/blog/b/"]
        );
    }

    #[test]
    fn test_write_redirects() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("dist");
        let index = PageIndex {
            pages: vec![page("/blog/a/", &["/old/a"]), page("/blog/b/", &["/old/b"])],
        };

        let path = write_redirects(&index, &out).unwrap().unwrap();
        assert_eq!(path, out.join("_redirects"));
        assert_eq!(
            std::fs::read_to_string(path).unwrap(),
            "/old/a\t/blog/a/\n/old/b\t/blog/b/"
        );
    }

    #[test]
    fn test_no_aliases_writes_nothing() {
        let tmp = TempDir::new().unwrap();
        let index = PageIndex {
            pages: vec![page("/about/", &[])],
        };

        assert_eq!(write_redirects(&index, tmp.path()).unwrap(), None);
        assert!(!tmp.path().join(REDIRECTS_FILE).exists());
    }
}
