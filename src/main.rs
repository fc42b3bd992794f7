//! # ncms CLI
//!
//! The `ncms` binary serves the collections API and runs the build-time
//! artifact generators.
//!
//! ## Usage
//!
//! ```bash
//! ncms --config ./ncms.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ncms serve` | Start the JSON API server |
//! | `ncms collections` | List configured collections and their folder status |
//! | `ncms posts <collection>` | List the posts of a collection |
//! | `ncms get <collection> <slug>` | Print one post |
//! | `ncms build --out <dir>` | Write `_redirects` and `rss.xml` |

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use ncms::config::{self, Config};
use ncms::pages::PageIndex;
use ncms::registry::Registry;
use ncms::{feed, get, redirects, server, sources};

/// ncms: a read-only JSON API over folder-backed content collections.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. Collections themselves are declared in the CMS configuration
/// (`[content].cms_config`, YAML).
#[derive(Parser)]
#[command(name = "ncms", version, about)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./ncms.toml")]
    config: PathBuf,

    /// Log at debug level (overrides RUST_LOG).
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Start the collections API server.
    ///
    /// Binds to `[server].bind` and mounts the API under `[server].mount`.
    Serve,

    /// List configured collections.
    ///
    /// Shows each collection's label, resolved folder, and whether the
    /// folder currently exists.
    Collections,

    /// List the posts of a collection, newest first.
    Posts {
        /// Collection name.
        collection: String,
    },

    /// Print one post with its full content.
    Get {
        /// Collection name.
        collection: String,
        /// Post slug.
        slug: String,
    },

    /// Write build artifacts: the `_redirects` table and, when `[feed]` is
    /// configured, `rss.xml`.
    Build {
        /// Output directory.
        #[arg(long)]
        out: PathBuf,

        /// Page index (JSON). Defaults to one page per post of every
        /// collection.
        #[arg(long)]
        pages: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("ncms=debug,tower_http=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Serve => {
            let registry = load_registry(&cfg)?;
            server::run_server(&cfg, Arc::new(registry)).await?;
        }
        Commands::Collections => {
            sources::list_collections(&load_registry(&cfg)?)?;
        }
        Commands::Posts { collection } => {
            get::run_posts(&load_registry(&cfg)?, &collection).await?;
        }
        Commands::Get { collection, slug } => {
            get::run_get(&load_registry(&cfg)?, &collection, &slug).await?;
        }
        Commands::Build { out, pages } => {
            run_build(&cfg, &out, pages.as_deref()).await?;
        }
    }

    Ok(())
}

/// Builds the registry from the CMS configuration. Failure here is fatal:
/// no command runs against an invalid registry.
fn load_registry(cfg: &Config) -> Result<Registry> {
    let registry = Registry::from_cms_config(&cfg.content.cms_config_path(), &cfg.content.root)?;
    tracing::info!(collections = registry.len(), "loaded collection registry");
    Ok(registry)
}

async fn run_build(cfg: &Config, out: &Path, pages: Option<&Path>) -> Result<()> {
    let index = match pages {
        Some(path) => PageIndex::from_json_file(path)?,
        None => PageIndex::from_registry(&load_registry(cfg)?).await?,
    };
    println!("pages: {}", index.len());

    match redirects::write_redirects(&index, out)? {
        Some(path) => println!("wrote {}", path.display()),
        None => println!("no aliases, skipped {}", redirects::REDIRECTS_FILE),
    }

    match &cfg.feed {
        Some(feed_cfg) => {
            let path = feed::write_feed(&index, feed_cfg, out)?;
            println!("wrote {}", path.display());
        }
        None => println!("no [feed] section, skipped {}", feed::FEED_FILE),
    }

    Ok(())
}
