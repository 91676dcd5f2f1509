//! 记录存储：`RecordStore` 抽象、JSON 文件实现，以及串行化读改写的 `Catalog`。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::{Mutex, MutexGuard};
use tracing::warn;

use crate::atomic::AtomicFile;

/// 一条上传记录。
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub name: String,
    pub email: String,
    pub profession: String,
    pub original_file_name: String,
    pub path: String,
    pub uploaded_at: DateTime<Utc>,
}

/// 记录列表的持久化接口。
///
/// `load` 永不失败：缺失或损坏的数据视为空列表。
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn load(&self) -> Vec<Record>;
    async fn save(&self, records: &[Record]) -> io::Result<()>;
}

/// 以单个 JSON 数组文件保存全部记录。
#[derive(Clone, Debug)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 确保父目录存在；文件本身缺失时写入空数组。
    pub async fn ensure_file(&self) -> io::Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await?;
        }
        if fs::metadata(&self.path).await.is_err() {
            self.save(&[]).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for JsonFileStore {
    async fn load(&self) -> Vec<Record> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Vec::new(),
            Err(err) => {
                warn!(path = ?self.path, error = %err, "failed to read record store");
                return Vec::new();
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(records) => records,
            Err(err) => {
                warn!(path = ?self.path, error = %err, "record store is corrupt, treating as empty");
                Vec::new()
            }
        }
    }

    async fn save(&self, records: &[Record]) -> io::Result<()> {
        let contents = serde_json::to_vec_pretty(records).map_err(io::Error::other)?;
        AtomicFile::write(&self.path, &contents).await
    }
}

/// 记录目录：所有读改写都在同一把锁内完成。
pub struct Catalog {
    store: Arc<dyn RecordStore>,
    gate: Mutex<()>,
}

impl Catalog {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            gate: Mutex::new(()),
        }
    }

    /// 读取当前全部记录。
    pub async fn list(&self) -> Vec<Record> {
        let _guard = self.gate.lock().await;
        self.store.load().await
    }

    /// 开始一次读改写；在 `commit` 或丢弃前其他写者会等待。
    pub async fn begin(&self) -> CatalogTxn<'_> {
        let guard = self.gate.lock().await;
        let records = self.store.load().await;
        CatalogTxn {
            _guard: guard,
            store: self.store.as_ref(),
            records,
        }
    }
}

pub struct CatalogTxn<'a> {
    _guard: MutexGuard<'a, ()>,
    store: &'a dyn RecordStore,
    pub records: Vec<Record>,
}

impl CatalogTxn<'_> {
    /// 按原始文件名查找第一条匹配记录。
    pub fn position(&self, original_file_name: &str) -> Option<usize> {
        self.records
            .iter()
            .position(|record| record.original_file_name == original_file_name)
    }

    /// 整体写回并释放锁。
    pub async fn commit(self) -> io::Result<()> {
        self.store.save(&self.records).await
    }
}
