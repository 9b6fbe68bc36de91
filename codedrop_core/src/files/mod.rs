pub mod confine;
pub mod download;
pub mod listing;
pub mod models;
pub mod upload;

pub use confine::{display_dir, display_path, sanitize_file_name, PathConfiner};
pub use download::serve_file;
pub use listing::list_directory;
pub use models::{DirectoryEntry, EntryKind, ListResponse, UploadResponse};
pub use upload::{receive_upload, save_stream};
