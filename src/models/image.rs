//! 上传图片

use std::path::Path;

use bytes::Bytes;

use crate::error::InputError;

/// 未知类型时使用的 Content-Type
pub const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// 一张待上传的图片，只保存在内存里
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadImage {
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

impl UploadImage {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            data: data.into(),
        }
    }

    /// 根据文件名推断 Content-Type，只接受图片
    pub fn from_file(file_name: impl Into<String>, data: impl Into<Bytes>) -> Result<Self, InputError> {
        let file_name = file_name.into();
        let content_type = guess_content_type(&file_name);

        if !content_type.starts_with("image/") {
            return Err(InputError::UnsupportedImage(file_name));
        }

        Ok(Self::new(file_name, content_type, data))
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// 预览标签，例如 `face.jpg (1.2 MB)`
    pub fn preview_label(&self) -> String {
        format!("{} ({})", self.file_name, human_size(self.len()))
    }
}

/// 按扩展名推断 Content-Type
pub fn guess_content_type(file_name: &str) -> &'static str {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    match extension.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("bmp") => "image/bmp",
        _ => FALLBACK_CONTENT_TYPE,
    }
}

fn human_size(bytes: usize) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;

    let size = bytes as f64;
    if size >= MB {
        format!("{:.1} MB", size / MB)
    } else if size >= KB {
        format!("{:.1} KB", size / KB)
    } else {
        format!("{} B", bytes)
    }
}
