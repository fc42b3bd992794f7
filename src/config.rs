use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub content: ContentConfig,
    #[serde(default)]
    pub feed: Option<FeedConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
    /// Path prefix the collections API is mounted under.
    #[serde(default = "default_mount")]
    pub mount: String,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_mount() -> String {
    "/ncms".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct ContentConfig {
    /// Base directory for relative collection folders and `cms_config`.
    #[serde(default = "default_root")]
    pub root: PathBuf,
    #[serde(default = "default_cms_config")]
    pub cms_config: PathBuf,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            cms_config: default_cms_config(),
        }
    }
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}
fn default_cms_config() -> PathBuf {
    PathBuf::from("static/admin/config.yml")
}

impl ContentConfig {
    /// Location of the CMS configuration, resolved against `root`.
    pub fn cms_config_path(&self) -> PathBuf {
        self.root.join(&self.cms_config)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct FeedConfig {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub site_url: String,
    #[serde(default)]
    pub copyright: Option<String>,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_path_prefix")]
    pub path_prefix: String,
}

fn default_language() -> String {
    "en".to_string()
}
fn default_path_prefix() -> String {
    "/blog/".to_string()
}

impl FeedConfig {
    /// Absolute URL of a page path on the published site.
    pub fn page_url(&self, path: &str) -> String {
        format!("{}{}", self.site_url.trim_end_matches('/'), path)
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;

    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if !config.server.mount.starts_with('/') {
        anyhow::bail!("server.mount must start with '/'");
    }

    if config.server.request_timeout_secs == 0 {
        anyhow::bail!("server.request_timeout_secs must be > 0");
    }

    if let Some(feed) = &config.feed {
        if feed.site_url.is_empty() {
            anyhow::bail!("feed.site_url must not be empty");
        }
        if !feed.path_prefix.starts_with('/') {
            anyhow::bail!("feed.path_prefix must start with '/'");
        }
    }

    Ok(())
}
