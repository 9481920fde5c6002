use crate::core::{FileSource, Result, UploadError};

/// 单文件大小上限（50 MiB）
pub const MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

/// 允许的 MIME 类型：常见图片、文档、压缩包和音视频
pub const ALLOWED_MIME_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
    "application/pdf",
    "text/plain",
    "text/csv",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/zip",
    "application/x-rar-compressed",
    "audio/mpeg",
    "audio/wav",
    "video/mp4",
    "video/quicktime",
];

/// 入队前校验。纯函数，不做 IO。
/// 先查大小，超限一律 TooLarge，与类型无关；再查类型白名单
pub fn validate(file: &dyn FileSource) -> Result<()> {
    if file.size() > MAX_FILE_SIZE {
        return Err(UploadError::TooLarge {
            size: file.size(),
            limit: MAX_FILE_SIZE,
        });
    }

    if !ALLOWED_MIME_TYPES.contains(&file.mime_type()) {
        return Err(UploadError::UnsupportedType(file.mime_type().to_string()));
    }

    Ok(())
}
