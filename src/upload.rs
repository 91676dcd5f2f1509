//! 上传处理器：解析表单、落盘文件并追加记录。

use axum::body::Bytes;
use axum::extract::Extension;
use axum::http::HeaderMap;
use axum::response::Json as JsonResponse;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::ApiError;
use crate::http::content_type;
use crate::multipart::{self, FormData, UploadedFile};
use crate::storage::{Storage, name_from_public_path, public_path, stored_name};
use crate::store::{Catalog, Record};

const UPLOAD_ERROR: &str = "Upload Error";

#[derive(Serialize)]
pub(crate) struct UploadResponse {
    message: &'static str,
    path: String,
}

/// 新建上传：需要文件部分，字段缺失时记为空字符串。
pub async fn upload(
    headers: HeaderMap,
    Extension(storage): Extension<Arc<Storage>>,
    Extension(catalog): Extension<Arc<Catalog>>,
    body: Bytes,
) -> Result<JsonResponse<UploadResponse>, ApiError> {
    let mut form = read_form(&headers, &body).await?;
    let Some(file) = form.file.take() else {
        return Err(ApiError::BadRequest("No file uploaded".into()));
    };

    let path = save_upload(&storage, &file).await?;
    let record = Record {
        name: form.field("name").to_string(),
        email: form.field("email").to_string(),
        profession: form.field("profession").to_string(),
        original_file_name: file.file_name,
        path: path.clone(),
        uploaded_at: Utc::now(),
    };

    let mut txn = catalog.begin().await;
    txn.records.push(record);
    if let Err(err) = txn.commit().await {
        warn!(path, error = %err, "failed to persist record, removing file");
        discard_upload(&storage, &path).await;
        return Err(ApiError::Internal(UPLOAD_ERROR.into()));
    }

    info!(path, bytes = body.len(), "upload stored");
    Ok(JsonResponse(UploadResponse {
        message: "Uploaded!",
        path,
    }))
}

/// 按 `Content-Type` 中的 boundary 解码请求体。
pub async fn read_form(headers: &HeaderMap, body: &Bytes) -> Result<FormData, ApiError> {
    let boundary =
        multipart::extract_boundary(content_type(headers)).ok_or_else(ApiError::invalid_request)?;
    multipart::decode(body.clone(), &boundary)
        .await
        .map_err(|err| {
            debug!(error = %err, "malformed multipart body");
            ApiError::invalid_request()
        })
}

/// 写入上传文件并返回其对外路径。
pub async fn save_upload(storage: &Storage, file: &UploadedFile) -> Result<String, ApiError> {
    let name = stored_name(&file.file_name);
    if let Err(err) = storage.write_file(&name, &file.data).await {
        warn!(name, error = ?err, "failed to write upload");
        return Err(ApiError::Internal(UPLOAD_ERROR.into()));
    }
    Ok(public_path(&name))
}

/// 删除记录指向的文件；路径不在上传目录下或文件已不存在时忽略。
pub async fn discard_upload(storage: &Storage, path: &str) {
    let Some(name) = name_from_public_path(path) else {
        warn!(path, "record path outside upload directory, skipping delete");
        return;
    };
    if let Err(err) = storage.remove_file(name).await {
        warn!(path, error = ?err, "failed to remove upload");
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use tempfile::tempdir;

    use crate::multipart::tests::{BOUNDARY, build_body};
    use crate::store::JsonFileStore;
    use crate::store::RecordStore;

    pub(crate) fn multipart_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::CONTENT_TYPE,
            HeaderValue::from_str(&format!("multipart/form-data; boundary={BOUNDARY}"))
                .expect("content type"),
        );
        headers
    }

    pub(crate) fn make_env() -> (tempfile::TempDir, Arc<Storage>, Arc<Catalog>, JsonFileStore) {
        let temp = tempdir().expect("tempdir");
        let root = temp.path().join("uploads");
        std::fs::create_dir_all(&root).expect("create upload root");
        let store = JsonFileStore::new(temp.path().join("data.json"));
        let catalog = Arc::new(Catalog::new(Arc::new(store.clone())));
        (temp, Arc::new(Storage::new(root)), catalog, store)
    }

    #[tokio::test]
    async fn upload_persists_file_and_record() {
        let (_temp, storage, catalog, store) = make_env();
        let body = build_body(
            &[("name", "A"), ("email", "a@x.com"), ("profession", "dev")],
            Some(("my pic.png", &b"pngdata"[..])),
        );

        let JsonResponse(response) = upload(
            multipart_headers(),
            Extension(storage.clone()),
            Extension(catalog),
            Bytes::from(body),
        )
        .await
        .unwrap_or_else(|_| panic!("upload failed"));

        assert!(response.path.starts_with("/uploads/"));
        assert!(response.path.ends_with("-my_pic.png"));
        let name = name_from_public_path(&response.path).expect("name");
        let stored = std::fs::read(storage.root_path().join(name)).expect("read upload");
        assert_eq!(stored, b"pngdata");

        let records = store.load().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].original_file_name, "my pic.png");
        assert_eq!(records[0].name, "A");
        assert_eq!(records[0].path, response.path);
    }

    #[tokio::test]
    async fn upload_without_file_is_rejected() {
        let (_temp, storage, catalog, store) = make_env();
        let body = build_body(&[("name", "A")], None);
        let result = upload(
            multipart_headers(),
            Extension(storage),
            Extension(catalog),
            Bytes::from(body),
        )
        .await;

        assert!(matches!(result, Err(ApiError::BadRequest(msg)) if msg == "No file uploaded"));
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn truncated_multipart_is_invalid() {
        let (_temp, storage, catalog, store) = make_env();
        let mut body = build_body(&[("name", "A")], Some(("pic.png", &b"pngdata"[..])));
        body.truncate(body.len() - 12);
        let result = upload(
            multipart_headers(),
            Extension(storage),
            Extension(catalog),
            Bytes::from(body),
        )
        .await;

        assert!(matches!(result, Err(ApiError::BadRequest(msg)) if msg == "Invalid request"));
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn upload_without_boundary_is_invalid() {
        let (_temp, storage, catalog, _store) = make_env();
        let result = upload(
            HeaderMap::new(),
            Extension(storage),
            Extension(catalog),
            Bytes::from_static(b"{}"),
        )
        .await;
        assert!(matches!(result, Err(ApiError::BadRequest(_))));
    }
}
