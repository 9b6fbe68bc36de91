//! Streaming upload receiver.
//!
//! The multipart body is consumed field by field and each chunk is written
//! before the next one is pulled, so nothing larger than a single chunk is
//! ever held in memory and the disk governs how fast the client can send.

use std::path::{Path, PathBuf};

use axum::{body::Bytes, extract::Multipart};
use futures_util::{pin_mut, Stream, StreamExt};
use tokio::fs as async_fs;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{info, warn};

use super::confine::sanitize_file_name;
use crate::error::{AppError, Result};

/// Multipart field carrying the uploaded file.
pub const FILE_FIELD: &str = "file";

/// Saves the first `file` field of `multipart` into `dir` and returns the
/// sanitized name it was stored under.
pub async fn receive_upload(dir: &Path, mut multipart: Multipart) -> Result<String> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            drain_stream(field).await?;
            continue;
        }

        let file_name = field
            .file_name()
            .and_then(sanitize_file_name)
            .ok_or_else(|| AppError::BadRequest("Missing file name".to_string()))?;

        let destination = dir.join(&file_name);
        let written = save_stream(field, &destination).await?;
        info!(file = %file_name, bytes = written, dir = %dir.display(), "Upload saved");

        return Ok(file_name);
    }

    Err(AppError::BadRequest(format!(
        "No \"{}\" field in upload",
        FILE_FIELD
    )))
}

/// Creates `destination` fresh and copies `stream` into it.
///
/// On failure, or if the returned future is dropped before completion, the
/// partially written file is removed.
pub async fn save_stream<S, E>(stream: S, destination: &Path) -> Result<u64>
where
    S: Stream<Item = std::result::Result<Bytes, E>>,
    AppError: From<E>,
{
    let mut file = async_fs::File::create(destination).await?;
    let guard = PartialFile::new(destination);

    match write_stream(stream, &mut file).await {
        Ok(written) => {
            guard.keep();
            Ok(written)
        }
        Err(e) => {
            drop(file);
            guard.discard().await;
            Err(e)
        }
    }
}

/// Copies every chunk of `stream` into `writer`, one chunk at a time.
pub async fn write_stream<S, E, W>(stream: S, writer: &mut W) -> Result<u64>
where
    S: Stream<Item = std::result::Result<Bytes, E>>,
    W: AsyncWrite + Unpin,
    AppError: From<E>,
{
    pin_mut!(stream);

    let mut written: u64 = 0;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        writer.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    writer.flush().await?;

    Ok(written)
}

/// Reads `stream` to the end, discarding its content.
pub async fn drain_stream<S, E>(stream: S) -> Result<()>
where
    S: Stream<Item = std::result::Result<Bytes, E>>,
    AppError: From<E>,
{
    pin_mut!(stream);
    while let Some(chunk) = stream.next().await {
        chunk?;
    }
    Ok(())
}

/// Removes a destination file unless it was explicitly kept.
struct PartialFile {
    path: Option<PathBuf>,
}

impl PartialFile {
    fn new(path: &Path) -> Self {
        Self {
            path: Some(path.to_path_buf()),
        }
    }

    fn keep(mut self) {
        self.path = None;
    }

    async fn discard(mut self) {
        if let Some(path) = self.path.take() {
            if let Err(e) = async_fs::remove_file(&path).await {
                warn!("Failed to remove partial upload {}: {}", path.display(), e);
            }
        }
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            warn!("Upload to {} interrupted, removing partial file", path.display());
            if let Err(e) = std::fs::remove_file(&path) {
                warn!("Failed to remove partial upload {}: {}", path.display(), e);
            }
        }
    }
}
