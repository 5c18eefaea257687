use std::sync::Arc;

use axum::{
    body::Body,
    extract::{multipart::MultipartRejection, Multipart, Query, State},
    http::{
        header::{CACHE_CONTROL, CONTENT_TYPE, EXPIRES, PRAGMA},
        StatusCode,
    },
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use reqwest::Url;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info};

use crate::error::{error_response, AppError, AppResult, InputError, UpstreamError};
use crate::models::image::{guess_content_type, FALLBACK_CONTENT_TYPE};
use crate::models::UploadImage;
use crate::server::{session, state::GatewayState};

const NO_STORE: &str = "no-store, no-cache, must-revalidate";
const IMMUTABLE: &str = "public, max-age=31536000, immutable";
const DEFAULT_IMAGE_TYPE: &str = "image/jpeg";

#[derive(Deserialize)]
pub struct StatusQuery {
    #[serde(rename = "jobId")]
    job_id: Option<String>,
}

#[derive(Deserialize)]
pub struct ProxyQuery {
    url: Option<String>,
}

pub async fn health_handler() -> impl IntoResponse {
    Json(json!({ "status": "ok", "service": "face-swap-gateway" }))
}

/// 接收两张图片，补上会话令牌后转发给后端
pub async fn publish_handler(
    State(state): State<Arc<GatewayState>>,
    jar: CookieJar,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(CookieJar, Json<Value>), AppError> {
    let multipart = multipart.map_err(|e| upload_error(e.status(), e.body_text()))?;
    let (image1, image2) = read_image_pair(multipart).await?;

    let (session, is_new) = session::resolve(&jar, &state.config.session_cookie_name);
    if is_new {
        info!("🆕 新会话: {}", session);
    } else {
        info!("♻️ 复用会话: {}", session);
    }

    info!("📤 转发到后端: {}publish", state.backend.base_url());
    let data = state.backend.publish(&image1, &image2, &session).await?;

    if let Some(job_id) = data.get("jobId").and_then(Value::as_str) {
        info!("✅ 任务已创建: {}", job_id);
    }

    let jar = jar.add(session::session_cookie(&state.config, &session));
    Ok((jar, Json(data)))
}

/// 查询任务状态，响应禁止任何缓存
pub async fn status_handler(
    State(state): State<Arc<GatewayState>>,
    Query(query): Query<StatusQuery>,
) -> Result<Response, AppError> {
    let job_id = query
        .job_id
        .filter(|id| !id.trim().is_empty())
        .ok_or(InputError::MissingJobId)?;

    info!("🔍 查询任务状态: {}", job_id);
    let data = state.backend.status(&job_id).await?;

    match data.get("status").and_then(Value::as_str) {
        Some("completed") => info!("✅ 任务 {} 已完成", job_id),
        Some(other) => info!("⏳ 任务 {} 仍是 {}", job_id, other),
        None => info!("⏳ 任务 {} 状态未知", job_id),
    }

    Ok((
        [(CACHE_CONTROL, NO_STORE), (PRAGMA, "no-cache"), (EXPIRES, "0")],
        Json(data),
    )
        .into_response())
}

/// 服务端拉取远程图片并以长缓存转发，绕开跨域限制
pub async fn proxy_image_handler(
    State(state): State<Arc<GatewayState>>,
    Query(query): Query<ProxyQuery>,
) -> Response {
    let target = match parse_image_url(query.url) {
        Ok(url) => url,
        Err(e) => return e.into_response(),
    };

    info!("🖼️ 代理图片: {}", target);

    match state.backend.fetch_image(target).await {
        Ok(upstream) => {
            let content_type = upstream
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|value| value.to_str().ok())
                .unwrap_or(DEFAULT_IMAGE_TYPE)
                .to_string();

            (
                [
                    (CONTENT_TYPE, content_type),
                    (CACHE_CONTROL, IMMUTABLE.to_string()),
                ],
                Body::from_stream(upstream.bytes_stream()),
            )
                .into_response()
        }
        Err(err @ AppError::Upstream(UpstreamError::BadResponse { .. })) => {
            info!("⚠️ 远程图片返回 {}", err.status_code());
            err.into_response()
        }
        Err(err) => {
            error!("❌ 图片代理失败: {}", err);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to proxy image")
        }
    }
}

fn parse_image_url(raw: Option<String>) -> Result<Url, AppError> {
    let raw = raw
        .filter(|url| !url.trim().is_empty())
        .ok_or(InputError::MissingImageUrl)?;

    match Url::parse(raw.trim()) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(url),
        _ => Err(InputError::InvalidImageUrl.into()),
    }
}

/// 超过请求体上限时保留 413，其余按格式错误处理
fn upload_error(status: StatusCode, message: String) -> InputError {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        InputError::UploadTooLarge(message)
    } else {
        InputError::MalformedUpload(message)
    }
}

/// 从 multipart 里取出 `image1` / `image2`，其他字段忽略
async fn read_image_pair(mut multipart: Multipart) -> AppResult<(UploadImage, UploadImage)> {
    let mut image1 = None;
    let mut image2 = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| upload_error(e.status(), e.body_text()))?
    {
        let slot = match field.name() {
            Some("image1") => &mut image1,
            Some("image2") => &mut image2,
            _ => continue,
        };

        let file_name = field.file_name().unwrap_or("image.jpg").to_string();
        let content_type = match field.content_type() {
            Some(content_type) if content_type != FALLBACK_CONTENT_TYPE => content_type.to_string(),
            _ => guess_content_type(&file_name).to_string(),
        };

        let data = field
            .bytes()
            .await
            .map_err(|e| upload_error(e.status(), e.body_text()))?;

        if !data.is_empty() {
            *slot = Some(UploadImage::new(file_name, content_type, data));
        }
    }

    match (image1, image2) {
        (Some(image1), Some(image2)) => Ok((image1, image2)),
        _ => Err(InputError::MissingImages.into()),
    }
}
