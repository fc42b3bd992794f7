//! Directory scanner.
//!
//! Lists the document files directly inside a collection's folder (no
//! recursion) and parses each of them concurrently. A scan is
//! whole-or-nothing: the first document that fails to read or parse
//! aborts the remaining tasks and fails the scan.
//!
//! Nothing is cached; every scan re-reads every file. Posts come back in
//! file-name order regardless of which parse finishes first.

use std::path::{Path, PathBuf};

use tokio::task::JoinSet;
use walkdir::WalkDir;

use crate::error::ScanError;
use crate::frontmatter::parse_document;
use crate::models::{Collection, Post};

/// Parses every eligible document of `collection`, in file-name order.
pub async fn scan(collection: &Collection) -> Result<Vec<Post>, ScanError> {
    let root = collection.root().to_path_buf();
    let extension = collection.extension().to_string();

    let files = tokio::task::spawn_blocking(move || list_documents(&root, &extension)).await??;

    tracing::debug!(
        collection = %collection.name,
        files = files.len(),
        "scanning collection"
    );

    let mut tasks = JoinSet::new();
    for (index, path) in files.into_iter().enumerate() {
        tasks.spawn(async move { load_post(path).await.map(|post| (index, post)) });
    }

    let mut parsed = Vec::with_capacity(tasks.len());
    while let Some(joined) = tasks.join_next().await {
        // Returning early drops the set, which aborts the tasks still running.
        parsed.push(joined??);
    }
    parsed.sort_unstable_by_key(|(index, _)| *index);

    Ok(parsed.into_iter().map(|(_, post)| post).collect())
}

/// Eligible document paths directly inside `root`, sorted by file name.
pub fn list_documents(root: &Path, extension: &str) -> Result<Vec<PathBuf>, ScanError> {
    let io_error = |source: std::io::Error| ScanError::Io {
        path: root.to_path_buf(),
        source,
    };

    // WalkDir reports a missing root as a walk error, but a root that is a
    // plain file would be yielded as an entry.
    if !std::fs::metadata(root).map_err(io_error)?.is_dir() {
        return Err(io_error(std::io::Error::other("not a directory")));
    }

    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name();
    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(root).to_path_buf();
            ScanError::Io {
                path,
                source: e.into(),
            }
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.into_path();
        if path.extension().is_some_and(|ext| ext == extension) {
            files.push(path);
        }
    }

    Ok(files)
}

async fn load_post(path: PathBuf) -> Result<Post, ScanError> {
    let bytes = tokio::fs::read(&path).await.map_err(|source| ScanError::Io {
        path: path.clone(),
        source,
    })?;
    Ok(parse_document(&path.to_string_lossy(), &bytes)?)
}
