use std::path::Path;

use futures::future::try_join;
use tokio::fs;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::models::image::UploadImage;

/// 从磁盘读取一张图片
pub async fn load_image(path: &Path) -> AppResult<UploadImage> {
    let data = fs::read(path)
        .await
        .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| "image".to_string());

    let image = UploadImage::from_file(file_name, data)?;
    info!("🖼️ 已加载图片: {}", image.preview_label());

    Ok(image)
}

/// 同时读取人脸图和目标图
pub async fn load_image_pair(
    face_path: &Path,
    target_path: &Path,
) -> AppResult<(UploadImage, UploadImage)> {
    try_join(load_image(face_path), load_image(target_path)).await
}
