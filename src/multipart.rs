//! multipart/form-data 解码。
//!
//! 请求体已经完整缓冲在内存中，作为单块流交给 `multer` 解析。
//! 带非空 `filename` 的部分视为文件（多个时保留最后一个），
//! 仅带 `name` 的部分视为文本字段，其余部分忽略。

use axum::body::Bytes;
use std::collections::HashMap;
use std::convert::Infallible;

/// 解码后的表单。
#[derive(Debug, Default)]
pub struct FormData {
    pub fields: HashMap<String, String>,
    pub file: Option<UploadedFile>,
}

impl FormData {
    /// 读取文本字段；缺失时返回空字符串。
    pub fn field(&self, name: &str) -> &str {
        self.fields.get(name).map(String::as_str).unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UploadedFile {
    pub file_name: String,
    pub data: Vec<u8>,
}

/// 从 `Content-Type` 中取出 boundary 参数。
pub fn extract_boundary(content_type: &str) -> Option<String> {
    multer::parse_boundary(content_type).ok()
}

/// 判断 `Content-Type` 是否为 multipart/form-data。
pub fn is_multipart(content_type: &str) -> bool {
    content_type
        .trim_start()
        .to_ascii_lowercase()
        .starts_with("multipart/form-data")
}

/// 按 boundary 解码完整请求体。
pub async fn decode(body: Bytes, boundary: &str) -> Result<FormData, multer::Error> {
    let stream = futures_util::stream::once(async move { Ok::<Bytes, Infallible>(body) });
    let mut multipart = multer::Multipart::new(stream, boundary);
    let mut form = FormData::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match field.file_name().map(str::to_string) {
            Some(file_name) if !file_name.is_empty() => {
                let data = field.bytes().await?;
                form.file = Some(UploadedFile {
                    file_name,
                    data: data.to_vec(),
                });
            }
            // 浏览器对空文件输入框会发送 filename=""
            Some(_) => {}
            None => {
                let Some(name) = name.filter(|name| !name.is_empty()) else {
                    continue;
                };
                let value = field.bytes().await?;
                let value = String::from_utf8_lossy(&value).trim().to_string();
                form.fields.insert(name, value);
            }
        }
    }

    Ok(form)
}
