//! 换脸任务状态机
//!
//! 一个客户端会话只有一个 `FaceSwapState`，只能通过 [`FaceSwapState::apply`] 修改阶段。
//!
//! ```text
//! idle ──Submit──▶ uploading ──Published──▶ processing ──Polled(completed)──▶ completed
//!                      │                      │   ▲
//!                PublishFailed      Polled(failed/未知) │ Polled(processing/queued)
//!                      ▼            PollFailed / TimedOut
//!                    error ◀──────────────────┘
//! 任意状态 ──Reset──▶ idle
//! ```

use crate::error::TransitionError;
use crate::models::{FaceSwapStatus, JobId, RemoteJobStatus, StatusResponse, UploadImage};

/// 后端报告任务失败时给用户的提示
pub const FAILED_JOB_MESSAGE: &str = "Please try different photos.";
/// 后端说完成了却没给结果图
pub const MISSING_RESULT_MESSAGE: &str = "Job completed without a result image";
/// 超过最长轮询时间
pub const TIMEOUT_MESSAGE: &str = "Timed out waiting for the face swap result";

/// 任务阶段，每个变体只携带该阶段有意义的字段
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum JobPhase {
    #[default]
    Idle,
    Uploading,
    Processing {
        job_id: JobId,
    },
    Completed {
        job_id: JobId,
        result_url: String,
    },
    Error {
        job_id: Option<JobId>,
        message: String,
    },
}

impl JobPhase {
    pub fn status(&self) -> FaceSwapStatus {
        match self {
            JobPhase::Idle => FaceSwapStatus::Idle,
            JobPhase::Uploading => FaceSwapStatus::Uploading,
            JobPhase::Processing { .. } => FaceSwapStatus::Processing,
            JobPhase::Completed { .. } => FaceSwapStatus::Completed,
            JobPhase::Error { .. } => FaceSwapStatus::Error,
        }
    }
}

/// 驱动状态机的事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobEvent {
    /// 用户点击提交
    Submit,
    /// 提交成功，拿到任务 ID
    Published(JobId),
    /// 提交失败
    PublishFailed(String),
    /// 收到一次状态查询结果
    Polled(StatusResponse),
    /// 状态查询本身失败
    PollFailed(String),
    /// 超过最长轮询时间
    TimedOut,
    /// 重新开始
    Reset,
}

impl JobEvent {
    pub fn name(&self) -> &'static str {
        match self {
            JobEvent::Submit => "submit",
            JobEvent::Published(_) => "published",
            JobEvent::PublishFailed(_) => "publish_failed",
            JobEvent::Polled(_) => "polled",
            JobEvent::PollFailed(_) => "poll_failed",
            JobEvent::TimedOut => "timed_out",
            JobEvent::Reset => "reset",
        }
    }
}

/// 客户端界面状态：两张图片 + 当前阶段
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FaceSwapState {
    image1: Option<UploadImage>,
    image2: Option<UploadImage>,
    phase: JobPhase,
}

impl FaceSwapState {
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置（或移除）人脸图，不影响阶段
    pub fn set_image1(&mut self, image: Option<UploadImage>) {
        self.image1 = image;
    }

    /// 设置（或移除）目标图，不影响阶段
    pub fn set_image2(&mut self, image: Option<UploadImage>) {
        self.image2 = image;
    }

    pub fn image1(&self) -> Option<&UploadImage> {
        self.image1.as_ref()
    }

    pub fn image2(&self) -> Option<&UploadImage> {
        self.image2.as_ref()
    }

    pub fn phase(&self) -> &JobPhase {
        &self.phase
    }

    pub fn status(&self) -> FaceSwapStatus {
        self.phase.status()
    }

    pub fn job_id(&self) -> Option<&JobId> {
        match &self.phase {
            JobPhase::Processing { job_id } | JobPhase::Completed { job_id, .. } => Some(job_id),
            JobPhase::Error { job_id, .. } => job_id.as_ref(),
            JobPhase::Idle | JobPhase::Uploading => None,
        }
    }

    pub fn result_url(&self) -> Option<&str> {
        match &self.phase {
            JobPhase::Completed { result_url, .. } => Some(result_url),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.phase {
            JobPhase::Error { message, .. } => Some(message),
            _ => None,
        }
    }

    /// 两张图都在且处于空闲时才能提交
    pub fn can_process(&self) -> bool {
        self.image1.is_some() && self.image2.is_some() && self.phase == JobPhase::Idle
    }

    /// 应用一个事件；不合法的事件返回错误且状态不变
    pub fn apply(&mut self, event: JobEvent) -> Result<FaceSwapStatus, TransitionError> {
        let next = match (&self.phase, event) {
            (_, JobEvent::Reset) => {
                self.image1 = None;
                self.image2 = None;
                JobPhase::Idle
            }
            (JobPhase::Idle, JobEvent::Submit) => {
                if self.image1.is_none() || self.image2.is_none() {
                    return Err(TransitionError::MissingImages);
                }
                JobPhase::Uploading
            }
            (JobPhase::Uploading, JobEvent::Published(job_id)) => JobPhase::Processing { job_id },
            (JobPhase::Uploading, JobEvent::PublishFailed(message)) => JobPhase::Error {
                job_id: None,
                message,
            },
            (JobPhase::Processing { job_id }, JobEvent::Polled(response)) => {
                phase_after_poll(job_id, response)
            }
            (JobPhase::Processing { job_id }, JobEvent::PollFailed(message)) => JobPhase::Error {
                job_id: Some(job_id.clone()),
                message,
            },
            (JobPhase::Processing { job_id }, JobEvent::TimedOut) => JobPhase::Error {
                job_id: Some(job_id.clone()),
                message: TIMEOUT_MESSAGE.to_string(),
            },
            (phase, event) => {
                return Err(TransitionError::InvalidTransition {
                    from: phase.status(),
                    event: event.name(),
                })
            }
        };

        self.phase = next;
        Ok(self.phase.status())
    }
}

fn phase_after_poll(job_id: &JobId, response: StatusResponse) -> JobPhase {
    let error = |message: String| JobPhase::Error {
        job_id: Some(job_id.clone()),
        message,
    };

    match response.remote_status() {
        RemoteJobStatus::Queued | RemoteJobStatus::Processing => JobPhase::Processing {
            job_id: job_id.clone(),
        },
        RemoteJobStatus::Completed => match response.image_url {
            Some(result_url) if !result_url.trim().is_empty() => JobPhase::Completed {
                job_id: job_id.clone(),
                result_url,
            },
            _ => error(MISSING_RESULT_MESSAGE.to_string()),
        },
        RemoteJobStatus::Failed => error(FAILED_JOB_MESSAGE.to_string()),
        RemoteJobStatus::Unknown(status) => error(format!("Unexpected status: {}", status)),
    }
}
