pub mod config;
pub mod core;
pub mod transfer;
pub mod utils;

// 重新导出核心类型
pub use crate::config::Config;
pub use crate::core::{
    BatchReport, DiskFile, EntryId, EventStream, FileSource, JsonFileStore, MemoryFile,
    MemoryRecordStore, QueueController, QueueEvent, QueueStats, RecordStore, Result, UploadEntry,
    UploadError, UploadStatus, UploadedRecord,
};
pub use crate::transfer::{
    ALLOWED_MIME_TYPES, MAX_FILE_SIZE, SimulatorConfig, TransferSimulator, generate_preview,
    validate,
};
