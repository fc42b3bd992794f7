use anyhow::Result;

use crate::registry::Registry;

/// Prints every collection with the state of its folder.
pub fn list_collections(registry: &Registry) -> Result<()> {
    println!("{:<16} {:<20} {:<8} FOLDER", "COLLECTION", "LABEL", "STATUS");

    for collection in registry.list() {
        let status = if collection.root().is_dir() {
            "OK"
        } else {
            "MISSING"
        };
        println!(
            "{:<16} {:<20} {:<8} {}",
            collection.name,
            collection.label.as_deref().unwrap_or("-"),
            status,
            collection.root().display()
        );
    }

    Ok(())
}
