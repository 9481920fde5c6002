use base64::{Engine as _, engine::general_purpose};

use crate::core::FileSource;

/// 为图片生成内联预览（data URI）。
/// 非图片返回 None；读取失败也当作没有预览，从不报错
pub async fn generate_preview(file: &dyn FileSource) -> Option<String> {
    if !file.mime_type().starts_with("image/") {
        return None;
    }

    match file.read_bytes().await {
        Ok(data) => Some(format!(
            "data:{};base64,{}",
            file.mime_type(),
            general_purpose::STANDARD.encode(&data)
        )),
        Err(_) => None,
    }
}
