//! Post retrieval for the CLI.
//!
//! `ncms posts <collection>` and `ncms get <collection> <slug>` read the
//! same data the HTTP API serves, straight from the collection folder.

use anyhow::{anyhow, Result};

use crate::models::{sort_posts, Post};
use crate::registry::Registry;
use crate::scanner;

/// Scans a collection by name. Unknown names are an error.
pub async fn collection_posts(registry: &Registry, name: &str) -> Result<Vec<Post>> {
    let collection = registry
        .lookup(name)
        .ok_or_else(|| anyhow!("collection not found: {}", name))?;

    let mut posts = scanner::scan(collection).await?;
    sort_posts(&mut posts);
    Ok(posts)
}

/// Finds one post by slug. With duplicate slugs the first post in sorted
/// order wins.
pub async fn find_post(registry: &Registry, name: &str, slug: &str) -> Result<Post> {
    collection_posts(registry, name)
        .await?
        .into_iter()
        .find(|p| p.slug == slug)
        .ok_or_else(|| anyhow!("post not found: {}/{}", name, slug))
}

/// CLI entry point for `ncms posts`.
pub async fn run_posts(registry: &Registry, name: &str) -> Result<()> {
    let posts = collection_posts(registry, name).await?;

    println!("{:<32} {:<12} TITLE", "SLUG", "DATE");
    for post in &posts {
        println!(
            "{:<32} {:<12} {}",
            post.slug,
            post.date.as_deref().unwrap_or("-"),
            post.title.as_deref().unwrap_or("(untitled)")
        );
    }
    println!();
    println!("{} posts", posts.len());

    Ok(())
}

/// CLI entry point for `ncms get`. Exits with status 1 when the post does
/// not exist.
pub async fn run_get(registry: &Registry, name: &str, slug: &str) -> Result<()> {
    let post = match find_post(registry, name, slug).await {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    println!("--- Post ---");
    println!("slug:         {}", post.slug);
    println!(
        "title:        {}",
        post.title.as_deref().unwrap_or("(untitled)")
    );
    if let Some(ref date) = post.date {
        println!("date:         {}", date);
    }
    if let Some(ref description) = post.description {
        println!("description:  {}", description);
    }
    if !post.aliases.is_empty() {
        println!("aliases:      {}", post.aliases.join(", "));
    }
    if !post.extra.is_empty() {
        println!("extra:        {}", serde_json::Value::Object(post.extra.clone()));
    }
    println!();

    println!("--- Content ---");
    println!("{}", post.content.as_deref().unwrap_or_default());

    Ok(())
}
