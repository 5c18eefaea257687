/// 网关客户端
///
/// 终端客户端通过它访问网关的 `/api/*` 接口，相当于网页里的 `fetch`
use std::future::Future;

use bytes::Bytes;
use reqwest::header::CACHE_CONTROL;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Url};
use tracing::debug;

use crate::clients::backend_client::read_json;
use crate::config::Config;
use crate::error::{AppError, AppResult, ConfigError};
use crate::models::{JobId, PublishResponse, StatusResponse, UploadImage};
use crate::ui::image_url;

const PUBLISH_FALLBACK_ERROR: &str = "Failed to publish face swap";
const STATUS_FALLBACK_ERROR: &str = "Failed to check status";
const DOWNLOAD_FALLBACK_ERROR: &str = "Failed to fetch image";

/// 换脸任务接口
///
/// 状态机只依赖这两个能力，测试里可以换成假实现
pub trait FaceSwapApi: Send + Sync {
    /// 提交两张图片，返回任务 ID
    fn publish(
        &self,
        image1: &UploadImage,
        image2: &UploadImage,
    ) -> impl Future<Output = AppResult<PublishResponse>> + Send;

    /// 查询一次任务状态
    fn check_status(&self, job_id: &JobId)
        -> impl Future<Output = AppResult<StatusResponse>> + Send;
}

/// 网关客户端，会话 Cookie 保存在内部的 cookie store 里
pub struct GatewayClient {
    http: Client,
    base_url: Url,
}

impl GatewayClient {
    pub fn new(config: &Config) -> AppResult<Self> {
        let http = Client::builder()
            .cookie_store(true)
            .build()
            .map_err(|e| AppError::request_failed("client builder", e))?;

        Self::with_client(http, &config.gateway_url)
    }

    pub fn with_client(http: Client, base_url: &str) -> AppResult<Self> {
        let base_url = Url::parse(base_url).map_err(|e| ConfigError::InvalidValue {
            key: "gateway_url".to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// 通过网关的图片代理下载结果图
    pub async fn download_result(&self, result_url: &str) -> AppResult<Bytes> {
        let url = image_url::proxy_url(&self.base_url, result_url);
        debug!("下载结果图: {}", url);

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
                DOWNLOAD_FALLBACK_ERROR,
            ));
        }

        response
            .bytes()
            .await
            .map_err(|e| AppError::invalid_body("proxy-image", e))
    }

    fn api_url(&self, endpoint: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(["api", endpoint]);
        }
        url
    }
}

impl FaceSwapApi for GatewayClient {
    async fn publish(
        &self,
        image1: &UploadImage,
        image2: &UploadImage,
    ) -> AppResult<PublishResponse> {
        let form = Form::new()
            .part("image1", form_part(image1)?)
            .part("image2", form_part(image2)?);

        let response = self
            .http
            .post(self.api_url("publish"))
            .header(CACHE_CONTROL, "no-store")
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::request_failed("publish", e))?;

        let body = read_json(response, "publish", PUBLISH_FALLBACK_ERROR).await?;
        serde_json::from_value(body).map_err(|e| {
            AppError::bad_response("publish", 502, format!("Invalid publish response: {e}"))
        })
    }

    async fn check_status(&self, job_id: &JobId) -> AppResult<StatusResponse> {
        let response = self
            .http
            .get(self.api_url("status"))
            .query(&[("jobId", job_id.as_str())])
            .header(CACHE_CONTROL, "no-store")
            .send()
            .await
            .map_err(|e| AppError::request_failed("status", e))?;

        let body = read_json(response, "status", STATUS_FALLBACK_ERROR).await?;
        serde_json::from_value(body).map_err(|e| {
            AppError::bad_response("status", 502, format!("Invalid status response: {e}"))
        })
    }
}

fn form_part(image: &UploadImage) -> AppResult<Part> {
    Part::bytes(image.data.to_vec())
        .file_name(image.file_name.clone())
        .mime_str(&image.content_type)
        .map_err(|e| AppError::request_failed("publish", e))
}
