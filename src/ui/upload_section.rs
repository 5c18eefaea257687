//! 上传区：两张图片的选择情况

use crate::models::UploadImage;

pub const FACE_LABEL: &str = "Upload Face Image";
pub const TARGET_LABEL: &str = "Upload Target Image";

/// 渲染两个上传槽位
pub fn render(face: Option<&UploadImage>, target: Option<&UploadImage>) -> String {
    [slot(FACE_LABEL, face), slot(TARGET_LABEL, target)].join("\n")
}

fn slot(label: &str, image: Option<&UploadImage>) -> String {
    match image {
        Some(image) => format!("[x] {}: {}", label, image.preview_label()),
        None => format!("[ ] {}: JPG, PNG, WEBP", label),
    }
}
