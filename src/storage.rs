//! 上传目录：文件命名、路径校验、写入与删除。

use chrono::Utc;
use std::io;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tokio::io::ErrorKind;
use tracing::debug;

use crate::atomic::AtomicFile;
use crate::config::UPLOADS_ROUTE_PREFIX;

#[derive(Clone, Debug)]
pub struct Storage {
    root: PathBuf,
}

impl Storage {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub async fn ensure_root(&self) -> io::Result<()> {
        fs::create_dir_all(&self.root).await
    }

    pub fn root_path(&self) -> &Path {
        &self.root
    }

    /// 解析上传目录内的单个文件名，拒绝目录穿越与符号链接。
    pub async fn resolve(&self, name: &str) -> Result<PathBuf, StorageError> {
        let mut components = Path::new(name).components();
        let segment = match (components.next(), components.next()) {
            (Some(Component::Normal(segment)), None) => segment,
            _ => return Err(StorageError::InvalidPath),
        };
        let target = self.root.join(segment);
        match fs::symlink_metadata(&target).await {
            Ok(metadata) if metadata.file_type().is_symlink() => Err(StorageError::InvalidPath),
            Ok(_) => Ok(target),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(target),
            Err(err) => Err(StorageError::Io(err)),
        }
    }

    /// 写入上传文件（临时文件 + 原子重命名）。
    pub async fn write_file(&self, name: &str, contents: &[u8]) -> Result<(), StorageError> {
        let target = self.resolve(name).await?;
        AtomicFile::write(&target, contents).await?;
        debug!(name, bytes = contents.len(), "upload file written");
        Ok(())
    }

    /// 删除上传文件，文件不存在时视为成功。
    pub async fn remove_file(&self, name: &str) -> Result<(), StorageError> {
        let target = self.resolve(name).await?;
        match fs::remove_file(&target).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(name, "upload file already missing");
                Ok(())
            }
            Err(err) => Err(StorageError::Io(err)),
        }
    }
}

/// 生成落盘文件名：`<毫秒时间戳>-<清洗后的原始文件名>`。
pub fn stored_name(original: &str) -> String {
    format!(
        "{}-{}",
        Utc::now().timestamp_millis(),
        sanitize_file_name(original)
    )
}

/// 空白字符与路径分隔符替换为下划线。
pub fn sanitize_file_name(original: &str) -> String {
    original
        .chars()
        .map(|ch| {
            if ch.is_whitespace() || ch == '/' || ch == '\\' {
                '_'
            } else {
                ch
            }
        })
        .collect()
}

/// 文件名对应的对外访问路径。
pub fn public_path(name: &str) -> String {
    format!("{UPLOADS_ROUTE_PREFIX}{name}")
}

/// 从对外访问路径还原文件名。
pub fn name_from_public_path(path: &str) -> Option<&str> {
    path.strip_prefix(UPLOADS_ROUTE_PREFIX)
        .filter(|name| !name.is_empty())
}

#[derive(Debug)]
pub enum StorageError {
    InvalidPath,
    Io(io::Error),
}

impl From<io::Error> for StorageError {
    fn from(err: io::Error) -> Self {
        StorageError::Io(err)
    }
}
