/// 文件图标类别，按 MIME 归类，给展示层用
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IconKind {
    Image,
    Video,
    Audio,
    Document,
    Spreadsheet,
    Archive,
    Other,
}

pub fn icon_kind(mime_type: &str) -> IconKind {
    if mime_type.starts_with("image/") {
        IconKind::Image
    } else if mime_type.starts_with("video/") {
        IconKind::Video
    } else if mime_type.starts_with("audio/") {
        IconKind::Audio
    } else if mime_type == "application/pdf" || mime_type.contains("word") {
        IconKind::Document
    } else if mime_type.contains("excel") || mime_type.contains("sheet") {
        IconKind::Spreadsheet
    } else if mime_type.contains("zip") || mime_type.contains("rar") {
        IconKind::Archive
    } else {
        IconKind::Other
    }
}

/// 格式化字节数
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];
    const UNIT_SIZE: f64 = 1024.0;

    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= UNIT_SIZE && unit_index < UNITS.len() - 1 {
        size /= UNIT_SIZE;
        unit_index += 1;
    }

    format!("{:.2} {}", size, UNITS[unit_index])
}
