use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock, broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::transfer::{TransferSimulator, generate_preview, validate};

use super::errors::{Result, UploadError};
use super::events::{EventStream, QueueEvent};
use super::source::FileSource;
use super::store::RecordStore;
use super::types::{BatchReport, EntryId, QueueStats, UploadEntry, UploadStatus, UploadedRecord};

/// 一次进行中的传输尝试
struct ActiveAttempt {
    attempt: u64,
    token: CancellationToken,
}

/// 上传队列控制器。唯一持有条目集合，所有状态变更都经过它。
///
/// 条目集合只通过整体替换更新：读当前集合，计算下一个集合，在写锁内写回。
/// 每次传输尝试带一个代号（attempt），来自过期尝试的进度和结清回调会被丢弃，
/// 取消因此是确定性的。
#[derive(Clone)]
pub struct QueueController {
    entries: Arc<RwLock<Vec<UploadEntry>>>,
    /// 条目 ID 到字节源的映射，条目本身只存普通数据
    sources: Arc<RwLock<HashMap<EntryId, Arc<dyn FileSource>>>>,
    active: Arc<Mutex<HashMap<EntryId, ActiveAttempt>>>,
    simulator: TransferSimulator,
    records: Option<Arc<dyn RecordStore>>,
    event_tx: broadcast::Sender<QueueEvent>,
}

impl QueueController {
    pub fn new(simulator: TransferSimulator) -> Self {
        let (event_tx, _) = broadcast::channel(256);

        Self {
            entries: Arc::new(RwLock::new(Vec::new())),
            sources: Arc::new(RwLock::new(HashMap::new())),
            active: Arc::new(Mutex::new(HashMap::new())),
            simulator,
            records: None,
            event_tx,
        }
    }

    /// 挂接可选的远端记录存储
    pub fn with_record_store(mut self, store: Arc<dyn RecordStore>) -> Self {
        self.records = Some(store);
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.event_tx.subscribe()
    }

    /// 事件的 `Stream` 视图
    pub fn events(&self) -> EventStream {
        EventStream::new(self.event_tx.subscribe())
    }

    /// 校验并入队一批文件，保持输入顺序，不去重。
    /// 每个文件单独返回结果，校验失败不影响队列
    pub async fn add_files(&self, files: Vec<Arc<dyn FileSource>>) -> Vec<Result<EntryId>> {
        let mut results = Vec::with_capacity(files.len());
        for file in files {
            results.push(self.add_file(file).await);
        }
        results
    }

    async fn add_file(&self, file: Arc<dyn FileSource>) -> Result<EntryId> {
        validate(file.as_ref())?;

        let preview = generate_preview(file.as_ref()).await;
        let mut entry = UploadEntry::new(file.name(), file.size(), file.mime_type());
        entry.preview = preview;
        let id = entry.id;

        self.sources.write().await.insert(id, file);
        {
            let mut guard = self.entries.write().await;
            let mut next = guard.clone();
            next.push(entry.clone());
            *guard = next;
        }

        debug!(id = %id, name = %entry.name, "entry added");
        self.emit(QueueEvent::EntryAdded { id });
        self.record_create(&entry).await;

        Ok(id)
    }

    /// 队列只读快照
    pub async fn entries(&self) -> Vec<UploadEntry> {
        self.entries.read().await.clone()
    }

    pub async fn entry(&self, id: EntryId) -> Option<UploadEntry> {
        self.entries.read().await.iter().find(|e| e.id == id).cloned()
    }

    pub async fn stats(&self) -> QueueStats {
        let entries = self.entries.read().await;
        let mut stats = QueueStats {
            total: entries.len(),
            ..Default::default()
        };

        for entry in entries.iter() {
            stats.total_size += entry.size;
            match entry.status {
                UploadStatus::Pending => stats.pending += 1,
                UploadStatus::Uploading => stats.uploading += 1,
                UploadStatus::Success => stats.succeeded += 1,
                UploadStatus::Error => stats.failed += 1,
            }
        }

        stats
    }

    /// 移除条目，不限制状态。进行中的传输继续跑，其回调会被围栏丢弃
    pub async fn remove_entry(&self, id: EntryId) -> Result<()> {
        {
            let mut guard = self.entries.write().await;
            if !guard.iter().any(|e| e.id == id) {
                return Err(UploadError::EntryNotFound(id));
            }
            let next = guard.iter().filter(|e| e.id != id).cloned().collect();
            *guard = next;
        }
        self.sources.write().await.remove(&id);

        debug!(id = %id, "entry removed");
        self.emit(QueueEvent::EntryRemoved { id });
        self.record_delete(id).await;

        Ok(())
    }

    /// 取消正在上传的条目：立即回到 Pending、进度清零。
    /// 同时废弃旧尝试的代号并触发取消信号
    pub async fn cancel_entry(&self, id: EntryId) -> Result<()> {
        {
            let mut guard = self.entries.write().await;
            let entry = guard
                .iter()
                .find(|e| e.id == id)
                .ok_or(UploadError::EntryNotFound(id))?;
            if entry.status != UploadStatus::Uploading {
                return Err(UploadError::invalid_state(format!(
                    "cannot cancel entry in state {:?}",
                    entry.status
                )));
            }

            let next = guard
                .iter()
                .map(|e| {
                    if e.id == id {
                        let mut e = e.clone();
                        e.status = UploadStatus::Pending;
                        e.progress = 0;
                        e.error_message = None;
                        e.attempt += 1;
                        e
                    } else {
                        e.clone()
                    }
                })
                .collect();
            *guard = next;
        }

        if let Some(active) = self.active.lock().await.remove(&id) {
            active.token.cancel();
        }

        debug!(id = %id, "upload cancelled");
        self.emit(QueueEvent::StatusChanged {
            id,
            old: UploadStatus::Uploading,
            new: UploadStatus::Pending,
        });
        self.emit(QueueEvent::Cancelled { id });

        if let Some(entry) = self.entry(id).await {
            self.record_update(&entry).await;
        }

        Ok(())
    }

    /// 无条件清空队列。不取消进行中的传输，它们的结清会落空
    pub async fn clear_all(&self) {
        let ids: Vec<EntryId> = {
            let mut guard = self.entries.write().await;
            let ids = guard.iter().map(|e| e.id).collect();
            *guard = Vec::new();
            ids
        };
        self.sources.write().await.clear();

        debug!(count = ids.len(), "queue cleared");
        self.emit(QueueEvent::Cleared);
        for id in ids {
            self.record_delete(id).await;
        }
    }

    /// 串行上传所有 Pending 条目，前一个结清后才开始下一个。
    /// 单个条目失败不会中断批次
    pub async fn upload_all(&self) -> BatchReport {
        let pending: Vec<EntryId> = self
            .entries
            .read()
            .await
            .iter()
            .filter(|e| e.status == UploadStatus::Pending)
            .map(|e| e.id)
            .collect();

        let mut report = BatchReport {
            attempted: pending.len(),
            ..Default::default()
        };

        for id in pending {
            match self.upload_single(id).await {
                Ok(_) => report.succeeded += 1,
                Err(UploadError::TransferFailed(_)) | Err(UploadError::Internal(_)) => {
                    report.failed += 1
                }
                // 轮到时已不在 Pending（被移除、清空或取消）
                Err(_) => report.skipped += 1,
            }
        }

        self.emit(QueueEvent::BatchFinished(report));
        report
    }

    /// 上传单个条目并等待结清。条目必须处于 Pending 状态
    pub async fn upload_single(&self, id: EntryId) -> Result<UploadedRecord> {
        let attempt = {
            let mut guard = self.entries.write().await;
            let entry = guard
                .iter()
                .find(|e| e.id == id)
                .ok_or(UploadError::EntryNotFound(id))?;
            if entry.status != UploadStatus::Pending {
                return Err(UploadError::invalid_state(format!(
                    "cannot upload entry in state {:?}",
                    entry.status
                )));
            }

            let attempt = entry.attempt + 1;
            let next = guard
                .iter()
                .map(|e| {
                    if e.id == id {
                        let mut e = e.clone();
                        e.status = UploadStatus::Uploading;
                        e.progress = 0;
                        e.error_message = None;
                        e.attempt = attempt;
                        e
                    } else {
                        e.clone()
                    }
                })
                .collect();
            *guard = next;
            attempt
        };

        self.emit(QueueEvent::StatusChanged {
            id,
            old: UploadStatus::Pending,
            new: UploadStatus::Uploading,
        });

        let source = match self.sources.read().await.get(&id).cloned() {
            Some(source) => source,
            None => {
                let err = UploadError::internal(format!("no byte source for entry {id}"));
                self.settle_failure(id, attempt, &err.to_string()).await;
                return Err(err);
            }
        };

        let token = CancellationToken::new();
        self.active.lock().await.insert(
            id,
            ActiveAttempt {
                attempt,
                token: token.clone(),
            },
        );

        let (progress_tx, mut progress_rx) = mpsc::unbounded_channel();
        let forwarder = {
            let controller = self.clone();
            tokio::spawn(async move {
                while let Some(progress) = progress_rx.recv().await {
                    controller.apply_progress(id, attempt, progress).await;
                }
            })
        };

        let result = self.simulator.run(source.as_ref(), progress_tx, token).await;

        // run 返回时发送端已丢弃，转发任务排空剩余进度后退出
        let _ = forwarder.await;

        {
            let mut active = self.active.lock().await;
            if active.get(&id).map(|a| a.attempt) == Some(attempt) {
                active.remove(&id);
            }
        }

        match result {
            Ok(record) => {
                if self.settle_success(id, attempt, &record).await {
                    Ok(record)
                } else {
                    Err(UploadError::Cancelled)
                }
            }
            Err(UploadError::Cancelled) => Err(UploadError::Cancelled),
            Err(err) => {
                if self.settle_failure(id, attempt, &err.to_string()).await {
                    Err(err)
                } else {
                    Err(UploadError::Cancelled)
                }
            }
        }
    }

    /// 应用一次进度回调。代号或状态对不上就丢弃
    async fn apply_progress(&self, id: EntryId, attempt: u64, progress: u8) {
        let mut applied = false;
        {
            let mut guard = self.entries.write().await;
            let next = guard
                .iter()
                .map(|e| {
                    if e.id == id
                        && e.attempt == attempt
                        && e.status == UploadStatus::Uploading
                        && progress >= e.progress
                    {
                        applied = true;
                        let mut e = e.clone();
                        e.progress = progress;
                        e
                    } else {
                        e.clone()
                    }
                })
                .collect();
            *guard = next;
        }

        if applied {
            self.emit(QueueEvent::Progress { id, progress });
        }
    }

    /// 成功结清。返回 false 表示该尝试已被围栏丢弃
    async fn settle_success(&self, id: EntryId, attempt: u64, record: &UploadedRecord) -> bool {
        let mut settled = None;
        {
            let mut guard = self.entries.write().await;
            let next = guard
                .iter()
                .map(|e| {
                    if e.id == id && e.attempt == attempt && e.status == UploadStatus::Uploading {
                        let mut e = e.clone();
                        e.status = UploadStatus::Success;
                        e.progress = 100;
                        e.uploaded_at = Some(record.uploaded_at);
                        e.remote_url = Some(record.url.clone());
                        e.error_message = None;
                        settled = Some(e.clone());
                        e
                    } else {
                        e.clone()
                    }
                })
                .collect();
            *guard = next;
        }

        match settled {
            Some(entry) => {
                debug!(id = %id, "upload completed");
                self.emit(QueueEvent::StatusChanged {
                    id,
                    old: UploadStatus::Uploading,
                    new: UploadStatus::Success,
                });
                self.emit(QueueEvent::Completed {
                    id,
                    url: record.url.clone(),
                });
                self.record_update(&entry).await;
                true
            }
            None => false,
        }
    }

    /// 失败结清。返回 false 表示该尝试已被围栏丢弃
    async fn settle_failure(&self, id: EntryId, attempt: u64, message: &str) -> bool {
        let mut settled = None;
        {
            let mut guard = self.entries.write().await;
            let next = guard
                .iter()
                .map(|e| {
                    if e.id == id && e.attempt == attempt && e.status == UploadStatus::Uploading {
                        let mut e = e.clone();
                        e.status = UploadStatus::Error;
                        e.error_message = Some(message.to_string());
                        settled = Some(e.clone());
                        e
                    } else {
                        e.clone()
                    }
                })
                .collect();
            *guard = next;
        }

        match settled {
            Some(entry) => {
                debug!(id = %id, error = message, "upload failed");
                self.emit(QueueEvent::StatusChanged {
                    id,
                    old: UploadStatus::Uploading,
                    new: UploadStatus::Error,
                });
                self.emit(QueueEvent::Failed {
                    id,
                    error: message.to_string(),
                });
                self.record_update(&entry).await;
                true
            }
            None => false,
        }
    }

    fn emit(&self, event: QueueEvent) {
        let _ = self.event_tx.send(event);
    }

    async fn record_create(&self, entry: &UploadEntry) {
        if let Some(store) = &self.records {
            if let Err(err) = store.create_record(entry).await {
                warn!(id = %entry.id, error = %err, "create_record failed");
            }
        }
    }

    async fn record_update(&self, entry: &UploadEntry) {
        if let Some(store) = &self.records {
            if let Err(err) = store.update_record(entry).await {
                warn!(id = %entry.id, error = %err, "update_record failed");
            }
        }
    }

    async fn record_delete(&self, id: EntryId) {
        if let Some(store) = &self.records {
            if let Err(err) = store.delete_record(id).await {
                warn!(id = %id, error = %err, "delete_record failed");
            }
        }
    }
}
