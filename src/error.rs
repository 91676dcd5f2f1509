//! 统一的 API 错误类型与转换。

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::io::ErrorKind;

use crate::storage::StorageError;

pub const INVALID_REQUEST: &str = "Invalid request";
pub const RECORD_NOT_FOUND: &str = "Record not found";

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    NotFound(String),
    Internal(String),
}

/// 错误响应体。
#[derive(Serialize)]
struct MessageBody<'a> {
    message: &'a str,
}

impl ApiError {
    pub fn invalid_request() -> Self {
        ApiError::BadRequest(INVALID_REQUEST.into())
    }

    pub fn record_not_found() -> Self {
        ApiError::NotFound(RECORD_NOT_FOUND.into())
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::BadRequest(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::NotFound(msg)
            | ApiError::Internal(msg) => msg.as_str(),
        };
        (status, Json(MessageBody { message })).into_response()
    }
}

impl From<StorageError> for ApiError {
    fn from(error: StorageError) -> Self {
        match error {
            StorageError::InvalidPath => ApiError::BadRequest("invalid path".into()),
            StorageError::Io(err) => match err.kind() {
                ErrorKind::NotFound => ApiError::NotFound(err.to_string()),
                _ => ApiError::Internal(err.to_string()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn renders_json_message_with_status() {
        let response = ApiError::record_not_found().into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = response
            .into_body()
            .collect()
            .await
            .expect("collect body")
            .to_bytes();
        let value: serde_json::Value = serde_json::from_slice(&body).expect("json body");
        assert_eq!(value["message"], RECORD_NOT_FOUND);
    }

    #[test]
    fn storage_errors_map_to_statuses() {
        let missing = std::io::Error::from(ErrorKind::NotFound);
        assert!(matches!(
            ApiError::from(StorageError::Io(missing)),
            ApiError::NotFound(_)
        ));
        assert!(matches!(
            ApiError::from(StorageError::InvalidPath),
            ApiError::BadRequest(_)
        ));
        let denied = std::io::Error::from(ErrorKind::PermissionDenied);
        assert!(matches!(
            ApiError::from(StorageError::Io(denied)),
            ApiError::Internal(_)
        ));
    }
}
