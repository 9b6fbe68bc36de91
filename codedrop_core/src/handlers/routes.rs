//! API route table. Paths are prefixed so they never collide with static assets.

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use super::{auth, files};
use crate::AppState;

pub const LIST_ROUTE: &str = "/__fs_list";
pub const DOWNLOAD_ROUTE: &str = "/__fs_download";
pub const CHECK_CODE_ROUTE: &str = "/__fs_checkcode";
pub const UPLOAD_ROUTE: &str = "/__fs_upload";

pub fn create_routes() -> Router<AppState> {
    Router::new()
        .route(LIST_ROUTE, get(files::list_dir))
        .route(DOWNLOAD_ROUTE, get(files::download_file))
        .route(CHECK_CODE_ROUTE, get(auth::check_code))
        .route(
            UPLOAD_ROUTE,
            // Upload size is deliberately unbounded; limit it at the proxy if needed.
            post(files::upload_file).layer(DefaultBodyLimit::disable()),
        )
}
