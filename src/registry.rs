//! Collection registry.
//!
//! Built once at startup from the CMS configuration and shared read-only
//! (behind an `Arc`) with every request handler. Lookups are exact,
//! case-sensitive name matches; listing preserves declaration order.
//!
//! # CMS configuration
//!
//! ```yaml
//! backend:
//!   name: git-gateway
//!   branch: master
//! media_folder: static/img
//! collections:
//!   - name: blog
//!     label: Blog
//!     folder: content/blog
//!     extension: md
//!     create: true
//! ```
//!
//! Relative folders are resolved against a base directory when the
//! registry is loaded. Folder existence is checked lazily, on scan.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::RegistryError;
use crate::models::Collection;

/// Decoded CMS configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct CmsConfig {
    #[serde(default)]
    pub collections: Vec<Collection>,
    /// Every other top-level setting (`backend`, `media_folder`, ...).
    #[serde(flatten)]
    pub settings: Map<String, Value>,
}

/// Reads and decodes a YAML CMS configuration file.
pub fn load_cms_config(path: &Path) -> Result<CmsConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read CMS config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse CMS config file: {}", path.display()))
}

/// Immutable name → collection mapping.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    collections: Vec<Collection>,
}

impl Registry {
    /// Validates the collections and resolves their folders against
    /// `base_dir`.
    pub fn load(collections: Vec<Collection>, base_dir: &Path) -> Result<Self, RegistryError> {
        let mut seen = HashSet::new();
        let mut loaded = Vec::with_capacity(collections.len());

        for (index, mut collection) in collections.into_iter().enumerate() {
            if collection.name.is_empty() {
                return Err(RegistryError::EmptyName { index });
            }
            if !seen.insert(collection.name.clone()) {
                return Err(RegistryError::DuplicateName(collection.name));
            }
            if collection.folder.as_os_str().is_empty() {
                return Err(RegistryError::EmptyFolder(collection.name));
            }

            collection.root = std::path::absolute(base_dir.join(&collection.folder)).map_err(
                |source| RegistryError::UnresolvableFolder {
                    name: collection.name.clone(),
                    source,
                },
            )?;

            tracing::debug!(
                collection = %collection.name,
                root = %collection.root.display(),
                "registered collection"
            );
            loaded.push(collection);
        }

        Ok(Self { collections: loaded })
    }

    /// Loads the registry from a YAML CMS configuration file.
    pub fn from_cms_config(path: &Path, base_dir: &Path) -> Result<Self> {
        let cms = load_cms_config(path)?;
        let registry = Self::load(cms.collections, base_dir)
            .with_context(|| format!("Invalid collections in {}", path.display()))?;
        Ok(registry)
    }

    /// All collections, in declaration order.
    pub fn list(&self) -> &[Collection] {
        &self.collections
    }

    pub fn lookup(&self, name: &str) -> Option<&Collection> {
        self.collections.iter().find(|c| c.name == name)
    }

    pub fn len(&self) -> usize {
        self.collections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    const CMS_YAML: &str = r#"
backend:
  name: git-gateway
  branch: master
media_folder: static/img
collections:
  - name: blog
    label: Blog
    folder: content/blog
    create: true
    fields:
      - { label: Title, name: title, widget: string }
  - name: pages
    label: Pages
    folder: /srv/pages
"#;

    #[test]
    fn test_cms_config_keeps_settings_and_collections() {
        let cms: CmsConfig = serde_yaml::from_str(CMS_YAML).unwrap();
        assert_eq!(
            cms.settings["backend"],
            json!({"name": "git-gateway", "branch": "master"})
        );
        assert_eq!(cms.settings["media_folder"], json!("static/img"));
        assert!(!cms.settings.contains_key("collections"));

        assert_eq!(cms.collections.len(), 2);
        assert_eq!(cms.collections[0].label.as_deref(), Some("Blog"));
        assert_eq!(cms.collections[0].extra["create"], json!(true));
        assert!(cms.collections[0].extra.contains_key("fields"));
    }

    #[test]
    fn test_list_preserves_declaration_order() {
        let registry = Registry::load(
            vec![
                Collection::new("zeta", "z"),
                Collection::new("alpha", "a"),
                Collection::new("mid", "m"),
            ],
            Path::new("/site"),
        )
        .unwrap();

        let names: Vec<&str> = registry.list().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
        // Listing is a pure read.
        let again: Vec<&str> = registry.list().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, again);
    }

    #[test]
    fn test_folders_resolve_against_base() {
        let registry = Registry::load(
            vec![
                Collection::new("blog", "content/blog"),
                Collection::new("pages", "/srv/pages"),
            ],
            Path::new("/site"),
        )
        .unwrap();

        let blog = registry.lookup("blog").unwrap();
        assert_eq!(blog.root(), Path::new("/site/content/blog"));
        assert_eq!(blog.folder, Path::new("content/blog"));
        assert_eq!(registry.lookup("pages").unwrap().root(), Path::new("/srv/pages"));
    }

    #[test]
    fn test_relative_base_becomes_absolute() {
        let registry =
            Registry::load(vec![Collection::new("blog", "blog")], Path::new("content")).unwrap();
        assert!(registry.lookup("blog").unwrap().root().is_absolute());
    }

    #[test]
    fn test_lookup_is_exact_and_case_sensitive() {
        let registry =
            Registry::load(vec![Collection::new("Blog", "blog")], Path::new("/site")).unwrap();
        assert!(registry.lookup("Blog").is_some());
        assert!(registry.lookup("blog").is_none());
        assert!(registry.lookup("Blo").is_none());
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let err = Registry::load(
            vec![Collection::new("blog", "a"), Collection::new("blog", "b")],
            Path::new("/site"),
        )
        .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateName(ref n) if n == "blog"));
    }

    #[test]
    fn test_empty_name_and_folder_rejected() {
        let err = Registry::load(vec![Collection::new("", "a")], Path::new("/site")).unwrap_err();
        assert!(matches!(err, RegistryError::EmptyName { index: 0 }));

        let err = Registry::load(vec![Collection::new("blog", "")], Path::new("/site")).unwrap_err();
        assert!(matches!(err, RegistryError::EmptyFolder(_)));
    }

    #[test]
    fn test_missing_folder_is_not_checked_at_load() {
        let tmp = TempDir::new().unwrap();
        let registry = Registry::load(
            vec![Collection::new("ghost", "does/not/exist")],
            tmp.path(),
        )
        .unwrap();
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_from_cms_config_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.yml");
        fs::write(&path, CMS_YAML).unwrap();

        let registry = Registry::from_cms_config(&path, tmp.path()).unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(
            registry.lookup("blog").unwrap().root(),
            tmp.path().join("content/blog")
        );
    }

    #[test]
    fn test_from_cms_config_rejects_missing_folder_key() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.yml");
        fs::write(&path, "collections:\n  - name: blog\n    label: Blog\n").unwrap();

        assert!(Registry::from_cms_config(&path, tmp.path()).is_err());
    }

    #[test]
    fn test_from_cms_config_rejects_malformed_yaml() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.yml");
        fs::write(&path, "collections: [name: blog\n").unwrap();

        assert!(Registry::from_cms_config(&path, tmp.path()).is_err());
    }

    #[test]
    fn test_empty_registry() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.yml");
        fs::write(&path, "backend:\n  name: test-repo\n").unwrap();

        let registry = Registry::from_cms_config(&path, tmp.path()).unwrap();
        assert!(registry.is_empty());
        assert!(registry.list().is_empty());
    }
}
