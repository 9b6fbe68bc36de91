use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Dir,
    File,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    /// Bytes; always 0 for directories.
    pub size: u64,
    /// Local modification time, `YYYY-MM-DD HH:MM`.
    pub mtime: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    pub dir: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DownloadQuery {
    pub path: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UploadQuery {
    pub dir: Option<String>,
    pub token: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListResponse {
    pub ok: bool,
    pub cwd: String,
    pub items: Vec<DirectoryEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub ok: bool,
    pub saved_as: String,
    pub url: String,
}
