//! 上传文件的读取与下发。

use axum::body::Body as AxumBody;
use axum::extract::{Extension, Path as AxumPath};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use std::path::Path;
use std::sync::Arc;
use tokio::fs::{self, File};
use tokio_util::io::ReaderStream;
use tracing::debug;

use crate::error::ApiError;
use crate::storage::Storage;

const IMAGE_NOT_FOUND: &str = "Image Not Found";

/// 按扩展名推断内容类型，未知类型一律按二进制下发。
pub fn content_type_for(name: &str) -> &'static str {
    let extension = Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        _ => "application/octet-stream",
    }
}

/// 下发上传文件。
pub async fn serve_upload(
    AxumPath(name): AxumPath<String>,
    Extension(storage): Extension<Arc<Storage>>,
) -> Result<Response, ApiError> {
    let not_found = || ApiError::NotFound(IMAGE_NOT_FOUND.into());
    let target = storage.resolve(&name).await.map_err(|_| not_found())?;
    let metadata = fs::metadata(&target).await.map_err(|_| not_found())?;
    if !metadata.is_file() {
        return Err(not_found());
    }
    let file = File::open(&target)
        .await
        .map_err(|err| ApiError::Internal(err.to_string()))?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(content_type_for(&name)),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(metadata.len()));
    debug!(name, size = metadata.len(), "serve upload");

    let stream = ReaderStream::new(file);
    Ok((StatusCode::OK, headers, AxumBody::from_stream(stream)).into_response())
}
