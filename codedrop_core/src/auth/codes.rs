//! One-time access codes backed by files.
//!
//! Each code lives in its own `<code>.<extension>` file inside the store
//! directory. A matching code is claimed by renaming its file out of the
//! enumerated set; the rename is atomic, so when several requests race on the
//! same file exactly one of them wins.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use rand::{distributions::Alphanumeric, rngs::OsRng, Rng};
use subtle::ConstantTimeEq;
use tokio::fs as async_fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::CodeConfig;
use crate::error::Result;

pub const MISSING_CODE: &str = "missing code";
pub const INVALID_CODE: &str = "invalid code";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Redemption {
    Redeemed,
    Rejected(&'static str),
}

impl Redemption {
    pub fn is_redeemed(&self) -> bool {
        matches!(self, Redemption::Redeemed)
    }
}

#[derive(Debug, Clone)]
pub struct CodeStore {
    dir: PathBuf,
    extension: String,
}

impl CodeStore {
    pub fn new(dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            extension: extension.into(),
        }
    }

    pub fn from_config(config: &CodeConfig) -> Self {
        Self::new(config.dir.clone(), config.extension.clone())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn redeem(&self, candidate: &str) -> Result<Redemption> {
        let candidate = candidate.trim();
        if candidate.is_empty() {
            return Ok(Redemption::Rejected(MISSING_CODE));
        }

        for path in self.code_files().await? {
            let content = match async_fs::read_to_string(&path).await {
                Ok(content) => content,
                Err(e) => {
                    debug!("Skipping unreadable code file {}: {}", path.display(), e);
                    continue;
                }
            };

            let matches: bool = content.trim().as_bytes().ct_eq(candidate.as_bytes()).into();
            if matches && self.claim(&path).await {
                info!(file = %path.display(), "Access code redeemed");
                return Ok(Redemption::Redeemed);
            }
        }

        debug!("No code file matched the submitted code");
        Ok(Redemption::Rejected(INVALID_CODE))
    }

    /// Writes a fresh random code of `length` characters and returns it.
    pub async fn mint(&self, length: usize) -> Result<String> {
        async_fs::create_dir_all(&self.dir).await?;

        let code = generate_code(length);
        let path = self.dir.join(format!("{}.{}", code, self.extension));

        let mut file = async_fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;
        file.write_all(format!("{}\n", code).as_bytes()).await?;
        file.flush().await?;

        info!(file = %path.display(), "Access code written");
        Ok(code)
    }

    async fn code_files(&self) -> Result<Vec<PathBuf>> {
        let mut reader = match async_fs::read_dir(&self.dir).await {
            Ok(reader) => reader,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!("Code directory {} does not exist", self.dir.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let mut files = Vec::new();
        while let Some(entry) = reader.next_entry().await? {
            let path = entry.path();
            let has_extension = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext == self.extension);

            if has_extension && entry.file_type().await.is_ok_and(|t| t.is_file()) {
                files.push(path);
            }
        }

        files.sort();
        Ok(files)
    }

    async fn claim(&self, path: &Path) -> bool {
        let claimed = path.with_extension(format!(
            "{}.claimed-{}",
            self.extension,
            Uuid::new_v4().simple()
        ));

        match async_fs::rename(path, &claimed).await {
            Ok(()) => {
                if let Err(e) = async_fs::remove_file(&claimed).await {
                    warn!("Failed to delete claimed code file {}: {}", claimed.display(), e);
                }
                true
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Code file {} was claimed by another request", path.display());
                false
            }
            Err(e) => {
                warn!("Failed to claim code file {}: {}", path.display(), e);
                false
            }
        }
    }
}

/// Random alphanumeric code drawn from the OS generator.
pub fn generate_code(length: usize) -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}
