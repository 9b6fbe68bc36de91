use axum::{
    extract::{multipart::MultipartRejection, Multipart, Query, Request, State},
    response::Response,
    Json,
};

use super::routes::DOWNLOAD_ROUTE;
use crate::{
    error::{AppError, Result},
    files::{
        display_dir, display_path, list_directory, receive_upload, serve_file,
        models::{DownloadQuery, ListQuery, UploadQuery},
        ListResponse, UploadResponse,
    },
    AppState,
};

pub async fn list_dir(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListResponse>> {
    let dir = query.dir.unwrap_or_default();
    let target = state.confiner.confine(&dir)?;

    let items = list_directory(&target).await?;

    Ok(Json(ListResponse {
        ok: true,
        cwd: display_dir(&dir),
        items,
    }))
}

pub async fn download_file(
    State(state): State<AppState>,
    Query(query): Query<DownloadQuery>,
    request: Request,
) -> Result<Response> {
    let path = query
        .path
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing path".to_string()))?;

    let target = state.confiner.confine(&path)?;
    serve_file(&target, request).await
}

/// Streams one multipart `file` field into the confined `dir`.
///
/// The token is consumed before anything else about the request is trusted;
/// a failed upload still spends it.
pub async fn upload_file(
    State(state): State<AppState>,
    Query(query): Query<UploadQuery>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>> {
    let dir = query
        .dir
        .filter(|d| !d.is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing dir".to_string()))?;

    if !state.tokens.redeem(query.token.as_deref().unwrap_or_default()) {
        return Err(AppError::Forbidden("Invalid or expired token".to_string()));
    }

    let target = state.confiner.confine(&dir)?;

    let multipart = multipart.map_err(|e| {
        AppError::BadRequest(format!(
            "Content-Type must be multipart/form-data: {}",
            e.body_text()
        ))
    })?;

    let saved_as = receive_upload(&target, multipart).await?;
    let url = download_url(&dir, &saved_as);

    Ok(Json(UploadResponse {
        ok: true,
        saved_as,
        url,
    }))
}

fn download_url(dir: &str, file_name: &str) -> String {
    let dir = display_path(dir);
    let path = format!("{}/{}", dir.trim_end_matches('/'), file_name);
    let encoded: Vec<String> = path
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect();

    format!("{}?path={}", DOWNLOAD_ROUTE, encoded.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_url() {
        assert_eq!(download_url("/uploads", "x.bin"), "/__fs_download?path=/uploads/x.bin");
        assert_eq!(download_url("/", "x.bin"), "/__fs_download?path=/x.bin");
        assert_eq!(download_url("a/../b/", "x.bin"), "/__fs_download?path=/b/x.bin");
        assert_eq!(
            download_url("/my docs", "q&a.txt"),
            "/__fs_download?path=/my%20docs/q%26a.txt"
        );
    }
}
