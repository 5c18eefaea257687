//! 任务相关数据结构
//!
//! 与网关 / 后端交换的 JSON 结构，以及客户端状态标签

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

/// 后端返回的任务 ID，不透明
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 提交接口响应 `{ jobId, status }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishResponse {
    pub job_id: JobId,
    #[serde(default)]
    pub status: String,
}

/// 状态接口响应 `{ status, image_url? }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl StatusResponse {
    pub fn remote_status(&self) -> RemoteJobStatus {
        RemoteJobStatus::parse(&self.status)
    }
}

/// 错误响应 `{ error }`，上游可能不带 `error` 字段
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// 后端上报的任务状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteJobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
    /// 不在已知枚举内（包括后端的 `not_found`）
    Unknown(String),
}

impl RemoteJobStatus {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "queued" => RemoteJobStatus::Queued,
            "processing" => RemoteJobStatus::Processing,
            "completed" => RemoteJobStatus::Completed,
            "failed" => RemoteJobStatus::Failed,
            other => RemoteJobStatus::Unknown(other.to_string()),
        }
    }

    /// 终态之后继续轮询没有意义
    pub fn is_terminal(&self) -> bool {
        matches!(self, RemoteJobStatus::Completed | RemoteJobStatus::Failed)
    }
}

/// 客户端界面状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FaceSwapStatus {
    Idle,
    Uploading,
    Processing,
    Completed,
    Error,
}

impl FaceSwapStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FaceSwapStatus::Idle => "idle",
            FaceSwapStatus::Uploading => "uploading",
            FaceSwapStatus::Processing => "processing",
            FaceSwapStatus::Completed => "completed",
            FaceSwapStatus::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, FaceSwapStatus::Completed | FaceSwapStatus::Error)
    }
}

impl Display for FaceSwapStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
