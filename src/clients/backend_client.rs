/// 换脸后端客户端
///
/// 网关用它把请求转发给外部的换脸服务，以及拉取远程结果图片
use crate::config::Config;
use crate::error::{AppError, AppResult, ConfigError};
use crate::models::{ErrorBody, SessionToken, UploadImage};
use reqwest::header::CACHE_CONTROL;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, Url};
use serde_json::Value;
use tracing::debug;

const PUBLISH_FALLBACK_ERROR: &str = "Backend processing failed";
const STATUS_FALLBACK_ERROR: &str = "Failed to check status";
const IMAGE_FALLBACK_ERROR: &str = "Failed to fetch image";

/// 后端客户端
#[derive(Clone)]
pub struct BackendClient {
    http: Client,
    base_url: Url,
}

impl BackendClient {
    /// 按配置创建，带单次请求超时
    pub fn new(config: &Config) -> AppResult<Self> {
        let http = Client::builder()
            .timeout(config.upstream_timeout())
            .build()
            .map_err(|e| AppError::request_failed("client builder", e))?;

        Self::with_client(http, &config.backend_api_url)
    }

    /// 使用已有的 reqwest 客户端
    pub fn with_client(http: Client, base_url: &str) -> AppResult<Self> {
        let base_url = Url::parse(base_url).map_err(|e| ConfigError::InvalidValue {
            key: "backend_api_url".to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// 提交两张图片和会话令牌，返回后端原始 JSON（`{ jobId, status }`）
    pub async fn publish(
        &self,
        image1: &UploadImage,
        image2: &UploadImage,
        session: &SessionToken,
    ) -> AppResult<Value> {
        let url = self.endpoint(&["publish"]);
        debug!(
            "提交任务到 {}，图片大小: {} / {} 字节",
            url,
            image1.len(),
            image2.len()
        );

        let form = Form::new()
            .part("image1", image_part(image1)?)
            .part("image2", image_part(image2)?)
            .text("sessionId", session.as_str().to_string());

        let response = self
            .http
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::request_failed("publish", e))?;

        read_json(response, "publish", PUBLISH_FALLBACK_ERROR).await
    }

    /// 查询任务状态，返回后端原始 JSON（`{ status, image_url? }`）
    pub async fn status(&self, job_id: &str) -> AppResult<Value> {
        let url = self.endpoint(&["status", job_id]);
        debug!("查询任务状态: {}", url);

        let response = self
            .http
            .get(url)
            .header(CACHE_CONTROL, "no-cache")
            .send()
            .await
            .map_err(|e| AppError::request_failed("status", e))?;

        read_json(response, "status", STATUS_FALLBACK_ERROR).await
    }

    /// 拉取远程图片，成功时返回未读取的响应以便流式转发
    pub async fn fetch_image(&self, url: Url) -> AppResult<Response> {
        debug!("拉取远程图片: {}", url);

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::request_failed("proxy-image", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::bad_response(
                "proxy-image",
                status.as_u16(),
                IMAGE_FALLBACK_ERROR,
            ));
        }

        Ok(response)
    }

    /// 拼接后端地址，每一段都会做路径转义
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

fn image_part(image: &UploadImage) -> AppResult<Part> {
    Part::bytes(image.data.to_vec())
        .file_name(image.file_name.clone())
        .mime_str(&image.content_type)
        .map_err(|e| AppError::request_failed("publish", e))
}

/// 读取 JSON 响应；非 2xx 时取上游的 `error` 字段，缺省用 `fallback`
pub(crate) async fn read_json(
    response: Response,
    endpoint: &str,
    fallback: &str,
) -> AppResult<Value> {
    let status = response.status();

    if !status.is_success() {
        let message = response
            .json::<ErrorBody>()
            .await
            .ok()
            .and_then(|body| body.error)
            .unwrap_or_else(|| fallback.to_string());

        debug!("{} 返回 {}: {}", endpoint, status, message);
        return Err(AppError::bad_response(endpoint, status.as_u16(), message));
    }

    response
        .json::<Value>()
        .await
        .map_err(|e| AppError::invalid_body(endpoint, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> BackendClient {
        BackendClient::with_client(Client::new(), base).unwrap()
    }

    #[test]
    fn endpoint_appends_segments() {
        let backend = client("http://localhost:8000");
        assert_eq!(
            backend.endpoint(&["publish"]).as_str(),
            "http://localhost:8000/publish"
        );
    }

    #[test]
    fn endpoint_keeps_base_path_and_escapes_job_id() {
        let backend = client("http://backend/api/");
        assert_eq!(
            backend.endpoint(&["status", "a b/c"]).as_str(),
            "http://backend/api/status/a%20b%2Fc"
        );
    }

    #[test]
    fn invalid_base_url_is_a_config_error() {
        let err = BackendClient::with_client(Client::new(), "not a url")
            .err()
            .unwrap();
        assert!(matches!(err, AppError::Config(_)));
    }
}
