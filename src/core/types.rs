use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

/// 队列条目唯一标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct EntryId(pub Uuid);

impl EntryId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 条目状态枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum UploadStatus {
    /// 等待上传（在队列中）
    Pending,
    /// 上传中
    Uploading,
    /// 已完成
    Success,
    /// 失败
    Error,
}

impl UploadStatus {
    /// Pending -> Uploading, Uploading -> {Success, Error, Pending}.
    /// Success 和 Error 是终态，只能被移除
    pub fn is_valid_transition(from: UploadStatus, to: UploadStatus) -> bool {
        use UploadStatus::*;

        matches!(
            (from, to),
            (Pending, Uploading) | (Uploading, Success) | (Uploading, Error) | (Uploading, Pending)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, UploadStatus::Success | UploadStatus::Error)
    }
}

/// 上传队列条目
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadEntry {
    /// 条目 ID
    pub id: EntryId,
    /// 文件名
    pub name: String,
    /// 文件大小（字节）
    pub size: u64,
    /// MIME 类型
    pub mime_type: String,
    /// 当前状态
    pub status: UploadStatus,
    /// 进度百分比 0-100
    pub progress: u8,
    /// 内联预览（data URI，仅图片有）
    pub preview: Option<String>,
    /// 错误信息
    pub error_message: Option<String>,
    /// 完成时间
    pub uploaded_at: Option<DateTime<Utc>>,
    /// 存储位置
    pub remote_url: Option<Url>,
    /// 创建时间
    pub created_at: DateTime<Utc>,
    /// 当前传输尝试代号，用于丢弃过期回调
    pub attempt: u64,
}

impl UploadEntry {
    pub fn new(name: impl Into<String>, size: u64, mime_type: impl Into<String>) -> Self {
        Self {
            id: EntryId::new(),
            name: name.into(),
            size,
            mime_type: mime_type.into(),
            status: UploadStatus::Pending,
            progress: 0,
            preview: None,
            error_message: None,
            uploaded_at: None,
            remote_url: None,
            created_at: Utc::now(),
            attempt: 0,
        }
    }
}

/// 一次完成传输的结果记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadedRecord {
    pub id: Uuid,
    pub name: String,
    pub size: u64,
    pub mime_type: String,
    pub uploaded_at: DateTime<Utc>,
    pub url: Url,
}

/// upload_all 的汇总结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    /// 批次开始时选中的待上传条目数
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// 轮到时已不在 Pending 状态的条目数
    pub skipped: usize,
}

/// 队列汇总信息
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub total: usize,
    pub pending: usize,
    pub uploading: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// 所有条目大小之和（字节）
    pub total_size: u64,
}

// 静态断言确保类型是 Send 的
const _: () = {
    fn assert_send<T: Send>() {}
    fn assert_types() {
        assert_send::<UploadEntry>();
        assert_send::<UploadedRecord>();
        assert_send::<BatchReport>();
    }
};
