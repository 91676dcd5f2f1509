//! 记录的列表、更新与删除处理器。

use axum::body::Bytes;
use axum::extract::Extension;
use axum::http::HeaderMap;
use axum::response::Json as JsonResponse;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

use crate::error::ApiError;
use crate::http::content_type;
use crate::multipart::{FormData, UploadedFile, is_multipart};
use crate::storage::Storage;
use crate::store::{Catalog, Record};
use crate::upload::{discard_upload, read_form, save_upload};

#[derive(Serialize)]
pub(crate) struct MessageResponse {
    message: &'static str,
}

#[derive(Serialize)]
pub(crate) struct UpdateResponse {
    message: &'static str,
    updated: Record,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UpdateRequest {
    #[serde(default)]
    original_file_name: String,
    name: Option<String>,
    email: Option<String>,
    profession: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DeleteRequest {
    #[serde(default)]
    original_file_name: String,
}

/// 一次更新请求的内容，来源可以是 multipart 或 JSON。
struct RecordUpdate {
    original_file_name: String,
    name: Option<String>,
    email: Option<String>,
    profession: Option<String>,
    file: Option<UploadedFile>,
}

impl From<FormData> for RecordUpdate {
    fn from(mut form: FormData) -> Self {
        let file = form.file.take();
        let mut take = |key: &str| form.fields.remove(key);
        Self {
            original_file_name: take("originalFileName").unwrap_or_default(),
            name: take("name"),
            email: take("email"),
            profession: take("profession"),
            file,
        }
    }
}

impl From<UpdateRequest> for RecordUpdate {
    fn from(request: UpdateRequest) -> Self {
        Self {
            original_file_name: request.original_file_name,
            name: request.name,
            email: request.email,
            profession: request.profession,
            file: None,
        }
    }
}

/// 仅在新值非空时覆盖。
fn overwrite_if_present(target: &mut String, value: Option<String>) {
    if let Some(value) = value.filter(|value| !value.is_empty()) {
        *target = value;
    }
}

/// 返回全部记录。
pub async fn list_records(
    Extension(catalog): Extension<Arc<Catalog>>,
) -> JsonResponse<Vec<Record>> {
    let records = catalog.list().await;
    info!(count = records.len(), "list records");
    JsonResponse(records)
}

/// 按原始文件名更新记录；附带文件时替换旧文件。
pub async fn update_record(
    headers: HeaderMap,
    Extension(storage): Extension<Arc<Storage>>,
    Extension(catalog): Extension<Arc<Catalog>>,
    body: Bytes,
) -> Result<JsonResponse<UpdateResponse>, ApiError> {
    let update: RecordUpdate = if is_multipart(content_type(&headers)) {
        read_form(&headers, &body).await?.into()
    } else {
        serde_json::from_slice::<UpdateRequest>(&body)
            .map_err(|_| ApiError::invalid_request())?
            .into()
    };

    let mut txn = catalog.begin().await;
    let Some(index) = txn.position(&update.original_file_name) else {
        return Err(ApiError::record_not_found());
    };

    let replacement = match &update.file {
        Some(file) => Some(save_upload(&storage, file).await?),
        None => None,
    };

    let record = &mut txn.records[index];
    overwrite_if_present(&mut record.name, update.name);
    overwrite_if_present(&mut record.email, update.email);
    overwrite_if_present(&mut record.profession, update.profession);
    record.uploaded_at = Utc::now();

    let mut previous_path = None;
    if let (Some(path), Some(file)) = (replacement, update.file) {
        previous_path = Some(std::mem::replace(&mut record.path, path));
        record.original_file_name = file.file_name;
    }
    let updated = record.clone();

    if let Err(err) = txn.commit().await {
        error!(error = %err, "failed to persist updated record");
        if previous_path.is_some() {
            discard_upload(&storage, &updated.path).await;
        }
        return Err(ApiError::Internal(err.to_string()));
    }
    if let Some(previous) = previous_path {
        discard_upload(&storage, &previous).await;
    }

    info!(
        original_file_name = updated.original_file_name,
        path = updated.path,
        "record updated"
    );
    Ok(JsonResponse(UpdateResponse {
        message: "Updated successfully",
        updated,
    }))
}

/// 删除记录及其文件。
pub async fn delete_record(
    Extension(storage): Extension<Arc<Storage>>,
    Extension(catalog): Extension<Arc<Catalog>>,
    body: Bytes,
) -> Result<JsonResponse<MessageResponse>, ApiError> {
    let request: DeleteRequest =
        serde_json::from_slice(&body).map_err(|_| ApiError::invalid_request())?;

    let mut txn = catalog.begin().await;
    let Some(index) = txn.position(&request.original_file_name) else {
        return Err(ApiError::record_not_found());
    };
    let removed = txn.records.remove(index);
    txn.commit().await.map_err(|err| {
        error!(error = %err, "failed to persist record removal");
        ApiError::Internal(err.to_string())
    })?;
    discard_upload(&storage, &removed.path).await;

    info!(
        original_file_name = removed.original_file_name,
        path = removed.path,
        "record deleted"
    );
    Ok(JsonResponse(MessageResponse {
        message: "Deleted successfully",
    }))
}
