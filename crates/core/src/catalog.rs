use std::{io::ErrorKind, path::Path};

use tokio::fs;
use tracing::debug;

use crate::{
    error::Result,
    story::{StoryId, StoryLayout},
};

/// Stories under `stories_root` that already have a final video, sorted by id.
///
/// Entries whose names are not valid story ids are ignored. A missing root is an empty catalog.
pub async fn list_completed_stories(stories_root: &Path) -> Result<Vec<StoryId>> {
    let mut entries = match fs::read_dir(stories_root).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut completed = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_dir() {
            continue;
        }
        let name = entry.file_name();
        let Some(id) = name.to_str().and_then(|n| StoryId::parse(n).ok()) else {
            continue;
        };
        if StoryLayout::new(stories_root, &id).final_path().is_file() {
            completed.push(id);
        }
    }

    completed.sort();
    debug!(count = completed.len(), "Listed completed stories");
    Ok(completed)
}
