//! 错误类型
//!
//! 按来源分组：请求参数、上游服务、配置、文件、状态机。
//! 网关对外只返回 `{ "error": "..." }`，所以面向调用方的文案保持英文，
//! 其余仅用于日志的错误沿用中文描述。

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::models::FaceSwapStatus;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 请求参数错误
    #[error(transparent)]
    Input(#[from] InputError),
    /// 上游服务错误
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 状态机拒绝了事件
    #[error(transparent)]
    Transition(#[from] TransitionError),
    /// IO 错误（监听端口等）
    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),
}

/// 请求参数错误，在发起任何网络请求之前返回
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("Both images are required")]
    MissingImages,
    #[error("jobId is required")]
    MissingJobId,
    #[error("Missing url parameter")]
    MissingImageUrl,
    #[error("Invalid url parameter")]
    InvalidImageUrl,
    #[error("Invalid multipart payload: {0}")]
    MalformedUpload(String),
    #[error("Upload too large: {0}")]
    UploadTooLarge(String),
    #[error("Unsupported image type: {0}")]
    UnsupportedImage(String),
}

/// 上游服务错误
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// 上游返回非 2xx，`message` 取自上游的 `error` 字段
    #[error("{message}")]
    BadResponse {
        endpoint: String,
        status: u16,
        message: String,
    },
    /// 网络请求失败
    #[error("请求 {endpoint} 失败: {source}")]
    RequestFailed {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    /// 上游返回 2xx 但响应体无法解析
    #[error("{endpoint} 返回的响应无法解析: {source}")]
    InvalidBody {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("读取配置文件失败 ({path}): {source}")]
    FileReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("配置项 {key} 无效: {reason}")]
    InvalidValue { key: String, reason: String },
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    #[error("文件不存在: {path}")]
    NotFound { path: String },
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// 状态机错误
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Both images are required")]
    MissingImages,
    #[error("cannot apply `{event}` while {from}")]
    InvalidTransition {
        from: FaceSwapStatus,
        event: &'static str,
    },
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建上游非 2xx 响应错误
    pub fn bad_response(
        endpoint: impl Into<String>,
        status: u16,
        message: impl Into<String>,
    ) -> Self {
        AppError::Upstream(UpstreamError::BadResponse {
            endpoint: endpoint.into(),
            status,
            message: message.into(),
        })
    }

    /// 创建网络请求失败错误
    pub fn request_failed(endpoint: impl Into<String>, source: reqwest::Error) -> Self {
        AppError::Upstream(UpstreamError::RequestFailed {
            endpoint: endpoint.into(),
            source,
        })
    }

    /// 创建响应体解析失败错误
    pub fn invalid_body(endpoint: impl Into<String>, source: reqwest::Error) -> Self {
        AppError::Upstream(UpstreamError::InvalidBody {
            endpoint: endpoint.into(),
            source,
        })
    }

    /// 创建文件读取错误
    pub fn file_read_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            return AppError::File(FileError::NotFound { path });
        }
        AppError::File(FileError::ReadFailed { path, source })
    }

    /// 创建文件写入错误
    pub fn file_write_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File(FileError::WriteFailed {
            path: path.into(),
            source,
        })
    }

    /// 网关响应使用的状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Input(InputError::UploadTooLarge(_)) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Input(_) => StatusCode::BAD_REQUEST,
            AppError::Upstream(UpstreamError::BadResponse { status, .. }) => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            AppError::Transition(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 网关响应体里的 `error` 文案，网络层细节不外泄
    pub fn public_message(&self) -> String {
        match self {
            AppError::Input(e) => e.to_string(),
            AppError::Upstream(UpstreamError::BadResponse { message, .. }) => message.clone(),
            AppError::Transition(e) => e.to_string(),
            _ => "Internal server error".to_string(),
        }
    }

    /// 客户端错误面板显示的文案
    pub fn user_message(&self) -> String {
        match self {
            AppError::Upstream(UpstreamError::BadResponse { message, .. }) => message.clone(),
            AppError::Upstream(UpstreamError::RequestFailed { source, .. }) => {
                format!("Could not reach the face swap service: {source}")
            }
            AppError::Upstream(UpstreamError::InvalidBody { .. }) => {
                "Received an invalid response from the face swap service".to_string()
            }
            other => other.to_string(),
        }
    }
}

/// 构造 `{ "error": message }` 响应
pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("❌ 请求处理失败: {}", self);
        }
        error_response(status, self.public_message())
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_errors_map_to_bad_request() {
        let err = AppError::from(InputError::MissingJobId);
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.public_message(), "jobId is required");
    }

    #[test]
    fn oversized_upload_maps_to_payload_too_large() {
        let err = AppError::from(InputError::UploadTooLarge("limit exceeded".to_string()));
        assert_eq!(err.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(err.public_message(), "Upload too large: limit exceeded");
    }

    #[test]
    fn bad_response_keeps_upstream_status_and_message() {
        let err = AppError::bad_response("publish", 429, "Previous job still processing");
        assert_eq!(err.status_code(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(err.public_message(), "Previous job still processing");
        assert_eq!(err.user_message(), "Previous job still processing");
    }

    #[test]
    fn non_http_status_falls_back_to_bad_gateway() {
        let err = AppError::bad_response("status", 42, "weird");
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn internal_errors_hide_details() {
        let err = AppError::from(std::io::Error::other("disk on fire"));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(), "Internal server error");
    }

    #[test]
    fn missing_file_becomes_not_found() {
        let source = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = AppError::file_read_failed("face.jpg", source);
        assert!(matches!(err, AppError::File(FileError::NotFound { .. })));
    }
}
