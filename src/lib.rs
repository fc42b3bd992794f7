//! # ncms
//!
//! A read-only JSON API over folder-backed content collections, for CMS
//! admin tooling that needs to list and fetch content without a database.
//!
//! Collections are declared in a YAML CMS configuration; each one points
//! at a folder of documents whose optional `+++`-fenced TOML metadata is
//! parsed on every request.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌────────────┐   ┌─────────────┐
//! │  Registry  │──▶│  Scanner   │──▶│ Frontmatter │
//! │ (config)   │   │ (JoinSet)  │   │  (parser)   │
//! └─────┬──────┘   └─────┬──────┘   └─────────────┘
//!       │                │
//!       ▼                ▼
//!  ┌─────────────────────────┐     ┌──────────────────┐
//!  │   HTTP server (axum)    │     │ build: redirects │
//!  │   /collections/...      │     │        rss feed  │
//!  └─────────────────────────┘     └──────────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Collections and posts |
//! | [`frontmatter`] | Document parsing |
//! | [`registry`] | Collection registry and CMS config loading |
//! | [`scanner`] | Concurrent collection folder scans |
//! | [`server`] | HTTP JSON API |
//! | [`pages`] | Page index for build artifacts |
//! | [`redirects`] | `_redirects` table generation |
//! | [`feed`] | RSS feed generation |
//! | [`error`] | Typed errors |

pub mod config;
pub mod error;
pub mod feed;
pub mod frontmatter;
pub mod get;
pub mod models;
pub mod pages;
pub mod redirects;
pub mod registry;
pub mod scanner;
pub mod server;
pub mod sources;
