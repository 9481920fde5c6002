mod errors;
mod events;
mod queue;
mod source;
mod store;
mod types;

pub use errors::{Result, UploadError};
pub use events::{EventStream, QueueEvent};
pub use queue::QueueController;
pub use source::{DiskFile, FileSource, MemoryFile};
pub use store::{JsonFileStore, MemoryRecordStore, RecordStore};
pub use types::{BatchReport, EntryId, QueueStats, UploadEntry, UploadStatus, UploadedRecord};
