//! RSS feed generation.
//!
//! Pages under the configured path prefix (default `/blog/`) become feed
//! items, newest first. Pages whose date cannot be read are left out.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rss::{validation::Validate, ChannelBuilder, GuidBuilder, ItemBuilder};

use crate::config::FeedConfig;
use crate::pages::{Page, PageIndex};

pub const FEED_FILE: &str = "rss.xml";

/// Renders the RSS 2.0 document for `index`.
pub fn build_feed(index: &PageIndex, config: &FeedConfig) -> Result<String> {
    let mut dated: Vec<(&Page, DateTime<Utc>)> = index
        .pages
        .iter()
        .filter(|page| page.path.starts_with(&config.path_prefix))
        .filter_map(|page| {
            let raw = page.frontmatter.date.as_deref().unwrap_or_default();
            match parse_date(raw) {
                Some(date) => Some((page, date)),
                None => {
                    tracing::warn!(path = %page.path, date = raw, "skipping feed item without a usable date");
                    None
                }
            }
        })
        .collect();
    dated.sort_by(|a, b| b.1.cmp(&a.1));

    let items: Vec<rss::Item> = dated
        .into_iter()
        .map(|(page, date)| {
            let link = config.page_url(&page.path);
            ItemBuilder::default()
                .title(page.title.clone())
                .link(Some(link.clone()))
                .guid(GuidBuilder::default().permalink(true).value(link).build())
                .description(page.frontmatter.description.clone())
                .pub_date(date.to_rfc2822())
                .build()
        })
        .collect();

    let channel = ChannelBuilder::default()
        .title(&config.title)
        .link(&config.site_url)
        .description(&config.description)
        .language(config.language.clone())
        .copyright(config.copyright.clone())
        .generator("ncms".to_string())
        .items(items)
        .build();

    channel
        .validate()
        .map_err(|e| anyhow!("rss validation failed: {e}"))?;
    Ok(channel.to_string())
}

/// Writes `rss.xml` into `out_dir`.
pub fn write_feed(index: &PageIndex, config: &FeedConfig, out_dir: &Path) -> Result<PathBuf> {
    let xml = build_feed(index, config)?;

    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create output directory: {}", out_dir.display()))?;
    let path = out_dir.join(FEED_FILE);
    std::fs::write(&path, xml).with_context(|| format!("Failed to write {}", path.display()))?;

    tracing::info!(path = %path.display(), "wrote rss feed");
    Ok(path)
}

/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS` and
/// `YYYY-MM-DD`. Dates without an offset are taken as UTC.
fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}
