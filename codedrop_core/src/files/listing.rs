use std::io::ErrorKind;
use std::path::Path;
use std::time::SystemTime;

use chrono::{DateTime, Local};
use tokio::fs as async_fs;

use super::models::{DirectoryEntry, EntryKind};
use crate::error::{AppError, Result};

const MTIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Reads one level of `dir`, sorted by name.
pub async fn list_directory(dir: &Path) -> Result<Vec<DirectoryEntry>> {
    let mut reader = async_fs::read_dir(dir).await.map_err(|e| match e.kind() {
        ErrorKind::NotFound => AppError::NotFound("Directory not found".to_string()),
        _ => AppError::IoError(e),
    })?;

    let mut entries = Vec::new();
    while let Some(entry) = reader.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();

        let metadata = match entry.metadata().await {
            Ok(metadata) => metadata,
            Err(e) => {
                tracing::warn!("Skipping entry {} in {}: {}", name, dir.display(), e);
                continue;
            }
        };

        let (kind, size) = if metadata.is_dir() {
            (EntryKind::Dir, 0)
        } else {
            (EntryKind::File, metadata.len())
        };

        entries.push(DirectoryEntry {
            name,
            kind,
            size,
            mtime: metadata.modified().map(format_mtime).unwrap_or_default(),
        });
    }

    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}

fn format_mtime(modified: SystemTime) -> String {
    DateTime::<Local>::from(modified).format(MTIME_FORMAT).to_string()
}
