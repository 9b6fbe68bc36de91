use std::io::ErrorKind;
use std::path::Path;

use axum::{
    body::Body,
    extract::Request,
    http::{header, HeaderValue},
    response::Response,
};
use tokio::fs as async_fs;
use tower::ServiceExt;
use tower_http::services::ServeFile;

use crate::error::{AppError, Result};

/// Streams `path` as an attachment. Range requests are answered by [`ServeFile`].
pub async fn serve_file(path: &Path, request: Request) -> Result<Response> {
    let metadata = async_fs::metadata(path).await.map_err(|e| match e.kind() {
        ErrorKind::NotFound => AppError::NotFound("File not found".to_string()),
        _ => AppError::IoError(e),
    })?;

    if !metadata.is_file() {
        return Err(AppError::NotFound("File not found".to_string()));
    }

    let mime = mime_guess::from_path(path).first_or_octet_stream();
    let response = match ServeFile::new_with_mime(path, &mime).oneshot(request).await {
        Ok(response) => response,
        Err(never) => match never {},
    };

    let mut response = response.map(Body::new);
    if !response.status().is_client_error() && !response.status().is_server_error() {
        response
            .headers_mut()
            .insert(header::CONTENT_DISPOSITION, attachment_disposition(path));
    }

    Ok(response)
}

fn attachment_disposition(path: &Path) -> HeaderValue {
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let disposition = format!("attachment; filename=\"{}\"", filename.replace('"', "\\\""));
    HeaderValue::from_bytes(disposition.as_bytes())
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}
