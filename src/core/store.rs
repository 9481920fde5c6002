use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::errors::Result;
use super::types::{EntryId, UploadEntry};

/// 远端记录边界。按条目 ID 透传当前字段集，内部协议不在本 crate 范围内
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// 保存新条目记录
    async fn create_record(&self, entry: &UploadEntry) -> Result<()>;

    /// 更新条目记录
    async fn update_record(&self, entry: &UploadEntry) -> Result<()>;

    /// 删除条目记录
    async fn delete_record(&self, id: EntryId) -> Result<()>;

    /// 列出所有记录
    async fn list_records(&self) -> Result<Vec<UploadEntry>>;
}

/// 内存实现，测试和演示用
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: RwLock<HashMap<EntryId, UploadEntry>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn create_record(&self, entry: &UploadEntry) -> Result<()> {
        self.records.write().await.insert(entry.id, entry.clone());
        Ok(())
    }

    async fn update_record(&self, entry: &UploadEntry) -> Result<()> {
        self.records.write().await.insert(entry.id, entry.clone());
        Ok(())
    }

    async fn delete_record(&self, id: EntryId) -> Result<()> {
        self.records.write().await.remove(&id);
        Ok(())
    }

    async fn list_records(&self) -> Result<Vec<UploadEntry>> {
        Ok(self.records.read().await.values().cloned().collect())
    }
}

/// JSON 文件实现，每次变更后整体重写快照文件
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    records: RwLock<HashMap<EntryId, UploadEntry>>,
}

impl JsonFileStore {
    /// Open a store backed by `path`, restoring any records already there.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut records = HashMap::new();

        if path.exists() {
            let data = tokio::fs::read_to_string(&path).await?;
            if !data.trim().is_empty() {
                let restored: Vec<UploadEntry> = serde_json::from_str(&data)?;
                for entry in restored {
                    records.insert(entry.id, entry);
                }
            }
        }

        Ok(Self {
            path,
            records: RwLock::new(records),
        })
    }

    /// Save records snapshot
    async fn persist(&self) -> Result<()> {
        let records = self.records.read().await;
        let mut entries: Vec<&UploadEntry> = records.values().collect();
        entries.sort_by_key(|e| e.created_at);

        let data = serde_json::to_string_pretty(&entries)?;
        tokio::fs::write(&self.path, data).await?;

        Ok(())
    }
}

#[async_trait]
impl RecordStore for JsonFileStore {
    async fn create_record(&self, entry: &UploadEntry) -> Result<()> {
        self.records.write().await.insert(entry.id, entry.clone());
        self.persist().await
    }

    async fn update_record(&self, entry: &UploadEntry) -> Result<()> {
        self.records.write().await.insert(entry.id, entry.clone());
        self.persist().await
    }

    async fn delete_record(&self, id: EntryId) -> Result<()> {
        self.records.write().await.remove(&id);
        self.persist().await
    }

    async fn list_records(&self) -> Result<Vec<UploadEntry>> {
        Ok(self.records.read().await.values().cloned().collect())
    }
}
