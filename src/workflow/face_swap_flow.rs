//! 换脸流程 - 流程层
//!
//! 核心职责：把状态机和网关接口串起来
//!
//! 流程顺序：
//! 1. 选择两张图片
//! 2. 提交 → 拿到任务 ID
//! 3. 立即查询一次，之后按固定间隔轮询，直到终态 / 超时 / 取消
//!
//! - 不持有 HTTP 细节，只依赖 `FaceSwapApi`
//! - 每次状态变化都会推送到 `watch` 通道，展示层订阅即可

use tokio::sync::watch;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::clients::FaceSwapApi;
use crate::error::{AppResult, InputError, TransitionError};
use crate::models::{FaceSwapStatus, JobId, UploadImage};
use crate::utils::logging::truncate_text;
use crate::workflow::face_swap_state::{FaceSwapState, JobEvent, JobPhase};
use crate::workflow::poll_policy::PollPolicy;

/// 换脸流程
pub struct FaceSwapFlow<A: FaceSwapApi> {
    api: A,
    state: FaceSwapState,
    policy: PollPolicy,
    /// 只在 processing 阶段存在
    polling: Option<CancellationToken>,
    updates: watch::Sender<FaceSwapState>,
    verbose_logging: bool,
}

impl<A: FaceSwapApi> FaceSwapFlow<A> {
    /// 创建新的换脸流程
    pub fn new(api: A, policy: PollPolicy) -> Self {
        let (updates, _) = watch::channel(FaceSwapState::new());
        Self {
            api,
            state: FaceSwapState::new(),
            policy,
            polling: None,
            updates,
            verbose_logging: false,
        }
    }

    pub fn with_verbose_logging(mut self, verbose: bool) -> Self {
        self.verbose_logging = verbose;
        self
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn state(&self) -> &FaceSwapState {
        &self.state
    }

    /// 订阅状态变化
    pub fn subscribe(&self) -> watch::Receiver<FaceSwapState> {
        self.updates.subscribe()
    }

    /// 当前轮询的取消令牌，不在 processing 阶段时为 `None`
    pub fn polling_handle(&self) -> Option<CancellationToken> {
        self.polling.clone()
    }

    pub fn set_image1(&mut self, image: Option<UploadImage>) {
        self.state.set_image1(image);
        self.updates.send_replace(self.state.clone());
    }

    pub fn set_image2(&mut self, image: Option<UploadImage>) {
        self.state.set_image2(image);
        self.updates.send_replace(self.state.clone());
    }

    /// 提交两张图片
    ///
    /// 缺图时直接返回参数错误，不会发起请求；
    /// 提交失败会进入 error 阶段并返回 `Ok(FaceSwapStatus::Error)`
    pub async fn submit(&mut self) -> AppResult<FaceSwapStatus> {
        let (Some(image1), Some(image2)) =
            (self.state.image1().cloned(), self.state.image2().cloned())
        else {
            warn!("⚠️ 需要两张图片才能提交");
            return Err(InputError::MissingImages.into());
        };

        self.transition(JobEvent::Submit)?;
        info!(
            "📤 正在提交换脸任务: {} + {}",
            image1.preview_label(),
            image2.preview_label()
        );

        let event = match self.api.publish(&image1, &image2).await {
            Ok(response) => {
                info!("✓ 任务已创建: {}", response.job_id);
                JobEvent::Published(response.job_id)
            }
            Err(e) => {
                error!("❌ 提交失败: {}", e);
                JobEvent::PublishFailed(e.user_message())
            }
        };

        Ok(self.transition(event)?)
    }

    /// 轮询直到终态、超时或被取消
    ///
    /// 每次查询都等上一次返回后再等待下一个间隔，不会有并发的查询
    pub async fn poll_until_settled(&mut self) -> AppResult<FaceSwapStatus> {
        let job_id = match self.state.phase() {
            JobPhase::Processing { job_id } => job_id.clone(),
            other => {
                return Err(TransitionError::InvalidTransition {
                    from: other.status(),
                    event: "poll",
                }
                .into())
            }
        };

        let cancel = self
            .polling
            .get_or_insert_with(CancellationToken::new)
            .clone();
        let deadline = Instant::now() + self.policy.max_duration;
        let mut attempt = 0usize;

        info!(
            "⏳ 开始轮询任务 {} (间隔 {:?})",
            job_id, self.policy.interval
        );

        loop {
            if cancel.is_cancelled() {
                return Ok(self.stop_polling(&job_id));
            }

            attempt += 1;
            let result = self.api.check_status(&job_id).await;

            // 取消后返回的结果直接丢弃
            if cancel.is_cancelled() {
                return Ok(self.stop_polling(&job_id));
            }

            let event = match result {
                Ok(response) => {
                    if self.verbose_logging {
                        debug!(
                            "第 {} 次查询 {}: {} {}",
                            attempt,
                            job_id,
                            response.status,
                            truncate_text(response.image_url.as_deref().unwrap_or(""), 80)
                        );
                    }
                    JobEvent::Polled(response)
                }
                Err(e) => {
                    warn!("⚠️ 查询任务 {} 状态失败: {}", job_id, e);
                    JobEvent::PollFailed(e.user_message())
                }
            };

            let status = self.transition(event)?;
            if status != FaceSwapStatus::Processing {
                return Ok(status);
            }

            if Instant::now() >= deadline {
                warn!(
                    "⚠️ 任务 {} 超过 {:?} 仍未完成，停止轮询",
                    job_id, self.policy.max_duration
                );
                return Ok(self.transition(JobEvent::TimedOut)?);
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    return Ok(self.stop_polling(&job_id));
                }
                _ = sleep(self.policy.interval) => {}
            }
        }
    }

    /// 设置图片、提交并轮询到底
    pub async fn run(&mut self, image1: UploadImage, image2: UploadImage) -> AppResult<FaceSwapStatus> {
        self.set_image1(Some(image1));
        self.set_image2(Some(image2));

        match self.submit().await? {
            FaceSwapStatus::Processing => self.poll_until_settled().await,
            other => Ok(other),
        }
    }

    /// 回到 idle，清空图片、任务、结果和错误
    pub fn reset(&mut self) {
        if let Err(e) = self.transition(JobEvent::Reset) {
            warn!("⚠️ 重置失败: {}", e);
        }
    }

    /// 轮询被取消：阶段不变，丢掉已取消的令牌，下次轮询会换新的
    fn stop_polling(&mut self, job_id: &JobId) -> FaceSwapStatus {
        info!("⏹️ 轮询已取消: {}", job_id);
        self.polling = None;
        self.state.status()
    }

    fn transition(&mut self, event: JobEvent) -> Result<FaceSwapStatus, TransitionError> {
        let from = self.state.status();
        let event_name = event.name();
        let status = self.state.apply(event)?;

        if from != status {
            info!("🔄 {} → {} ({})", from, status, event_name);
        }

        // 取消令牌的生命周期跟 processing 阶段绑定
        if status == FaceSwapStatus::Processing {
            self.polling.get_or_insert_with(CancellationToken::new);
        } else if let Some(token) = self.polling.take() {
            token.cancel();
        }

        self.updates.send_replace(self.state.clone());
        Ok(status)
    }
}

impl<A: FaceSwapApi> Drop for FaceSwapFlow<A> {
    fn drop(&mut self) {
        if let Some(token) = self.polling.take() {
            token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::{PublishResponse, StatusResponse};
    use crate::workflow::face_swap_state::{FAILED_JOB_MESSAGE, TIMEOUT_MESSAGE};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// 按顺序返回预设结果的假接口，同时检查有没有并发查询
    #[derive(Default)]
    struct ScriptedApi {
        publish_result: Mutex<Option<AppResult<PublishResponse>>>,
        statuses: Mutex<VecDeque<AppResult<StatusResponse>>>,
        publish_calls: AtomicUsize,
        status_calls: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl ScriptedApi {
        fn publishing(job_id: &str) -> Self {
            let api = Self::default();
            *api.publish_result.lock().unwrap() = Some(Ok(PublishResponse {
                job_id: JobId::new(job_id),
                status: "processing".to_string(),
            }));
            api
        }

        fn then_status(self, status: &str, image_url: Option<&str>) -> Self {
            self.statuses.lock().unwrap().push_back(Ok(StatusResponse {
                status: status.to_string(),
                image_url: image_url.map(str::to_string),
            }));
            self
        }

        fn then_error(self, error: AppError) -> Self {
            self.statuses.lock().unwrap().push_back(Err(error));
            self
        }
    }

    impl FaceSwapApi for ScriptedApi {
        async fn publish(
            &self,
            _image1: &UploadImage,
            _image2: &UploadImage,
        ) -> AppResult<PublishResponse> {
            self.publish_calls.fetch_add(1, Ordering::SeqCst);
            self.publish_result
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| Err(AppError::bad_response("publish", 500, "no script")))
        }

        async fn check_status(&self, _job_id: &JobId) -> AppResult<StatusResponse> {
            self.status_calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            tokio::time::sleep(Duration::from_millis(50)).await;
            let next = self.statuses.lock().unwrap().pop_front();

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            next.unwrap_or_else(|| {
                Ok(StatusResponse {
                    status: "processing".to_string(),
                    image_url: None,
                })
            })
        }
    }

    fn image(name: &str) -> UploadImage {
        UploadImage::new(name, "image/jpeg", vec![0xFF, 0xD8, 0xFF])
    }

    fn policy() -> PollPolicy {
        PollPolicy::new(Duration::from_secs(2), Duration::from_secs(600))
    }

    #[tokio::test]
    async fn submit_without_images_makes_no_request() {
        let mut flow = FaceSwapFlow::new(ScriptedApi::publishing("abc123"), policy());
        flow.set_image1(Some(image("face.jpg")));

        let err = flow.submit().await.unwrap_err();
        assert!(matches!(err, AppError::Input(InputError::MissingImages)));
        assert_eq!(flow.api().publish_calls.load(Ordering::SeqCst), 0);
        assert_eq!(flow.state().status(), FaceSwapStatus::Idle);
    }

    #[tokio::test]
    async fn submit_moves_to_processing() {
        let mut flow = FaceSwapFlow::new(ScriptedApi::publishing("abc123"), policy());
        flow.set_image1(Some(image("face.jpg")));
        flow.set_image2(Some(image("target.jpg")));

        let status = flow.submit().await.unwrap();
        assert_eq!(status, FaceSwapStatus::Processing);
        assert_eq!(flow.state().job_id().map(JobId::as_str), Some("abc123"));
        assert!(flow.polling_handle().is_some());
    }

    #[tokio::test]
    async fn publish_failure_becomes_error_state() {
        let api = ScriptedApi::default();
        *api.publish_result.lock().unwrap() = Some(Err(AppError::bad_response(
            "publish",
            429,
            "Previous job still processing",
        )));
        let mut flow = FaceSwapFlow::new(api, policy());

        let status = flow.run(image("a.jpg"), image("b.jpg")).await.unwrap();
        assert_eq!(status, FaceSwapStatus::Error);
        assert_eq!(flow.state().error(), Some("Previous job still processing"));
        assert_eq!(flow.api().status_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn polls_sequentially_until_completed() {
        let api = ScriptedApi::publishing("abc123")
            .then_status("processing", None)
            .then_status("queued", None)
            .then_status("completed", Some("https://example/result.jpg"));
        let mut flow = FaceSwapFlow::new(api, policy());

        let status = flow.run(image("a.jpg"), image("b.jpg")).await.unwrap();

        assert_eq!(status, FaceSwapStatus::Completed);
        assert_eq!(flow.state().result_url(), Some("https://example/result.jpg"));
        assert_eq!(flow.api().status_calls.load(Ordering::SeqCst), 3);
        assert_eq!(flow.api().max_in_flight.load(Ordering::SeqCst), 1);
        assert!(flow.polling_handle().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_job_shows_fixed_message() {
        let api = ScriptedApi::publishing("abc123").then_status("failed", None);
        let mut flow = FaceSwapFlow::new(api, policy());

        let status = flow.run(image("a.jpg"), image("b.jpg")).await.unwrap();
        assert_eq!(status, FaceSwapStatus::Error);
        assert_eq!(flow.state().error(), Some(FAILED_JOB_MESSAGE));
    }

    #[tokio::test(start_paused = true)]
    async fn poll_error_stops_without_retry() {
        let api = ScriptedApi::publishing("abc123")
            .then_error(AppError::bad_response("status", 404, "Failed to check status"));
        let mut flow = FaceSwapFlow::new(api, policy());

        let status = flow.run(image("a.jpg"), image("b.jpg")).await.unwrap();
        assert_eq!(status, FaceSwapStatus::Error);
        assert_eq!(flow.state().error(), Some("Failed to check status"));
        assert_eq!(flow.api().status_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn polling_times_out() {
        let api = ScriptedApi::publishing("abc123");
        let policy = PollPolicy::new(Duration::from_secs(2), Duration::from_secs(5));
        let mut flow = FaceSwapFlow::new(api, policy);

        let status = flow.run(image("a.jpg"), image("b.jpg")).await.unwrap();
        assert_eq!(status, FaceSwapStatus::Error);
        assert_eq!(flow.state().error(), Some(TIMEOUT_MESSAGE));
        assert!(flow.api().status_calls.load(Ordering::SeqCst) >= 3);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_polling_in_processing() {
        let mut flow = FaceSwapFlow::new(ScriptedApi::publishing("abc123"), policy());
        flow.set_image1(Some(image("a.jpg")));
        flow.set_image2(Some(image("b.jpg")));
        flow.submit().await.unwrap();

        let handle = flow.polling_handle().unwrap();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            handle.cancel();
        });

        let status = flow.poll_until_settled().await.unwrap();
        assert_eq!(status, FaceSwapStatus::Processing);
        let calls = flow.api().status_calls.load(Ordering::SeqCst);
        assert!((2..=4).contains(&calls), "unexpected call count {calls}");
    }

    #[tokio::test(start_paused = true)]
    async fn polling_resumes_after_cancellation() {
        let api = ScriptedApi::publishing("abc123")
            .then_status("completed", Some("https://example/result.jpg"));
        let mut flow = FaceSwapFlow::new(api, policy());
        flow.set_image1(Some(image("a.jpg")));
        flow.set_image2(Some(image("b.jpg")));
        flow.submit().await.unwrap();

        flow.polling_handle().unwrap().cancel();
        let status = flow.poll_until_settled().await.unwrap();
        assert_eq!(status, FaceSwapStatus::Processing);
        assert_eq!(flow.api().status_calls.load(Ordering::SeqCst), 0);
        assert!(flow.polling_handle().is_none());

        let status = flow.poll_until_settled().await.unwrap();
        assert_eq!(status, FaceSwapStatus::Completed);
        assert_eq!(flow.state().result_url(), Some("https://example/result.jpg"));
        assert_eq!(flow.api().status_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn response_in_flight_at_cancel_is_dropped() {
        let api = ScriptedApi::publishing("abc123")
            .then_status("failed", None)
            .then_status("completed", Some("https://example/result.jpg"));
        let mut flow = FaceSwapFlow::new(api, policy());
        flow.set_image1(Some(image("a.jpg")));
        flow.set_image2(Some(image("b.jpg")));
        flow.submit().await.unwrap();

        let handle = flow.polling_handle().unwrap();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            handle.cancel();
        });

        let status = flow.poll_until_settled().await.unwrap();
        assert_eq!(status, FaceSwapStatus::Processing);
        assert_eq!(flow.state().error(), None);
        assert_eq!(flow.api().status_calls.load(Ordering::SeqCst), 1);

        let status = flow.poll_until_settled().await.unwrap();
        assert_eq!(status, FaceSwapStatus::Completed);
        assert_eq!(flow.api().status_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_clears_state_and_cancels_polling() {
        let mut flow = FaceSwapFlow::new(ScriptedApi::publishing("abc123"), policy());
        let mut updates = flow.subscribe();
        flow.set_image1(Some(image("a.jpg")));
        flow.set_image2(Some(image("b.jpg")));
        flow.submit().await.unwrap();

        let handle = flow.polling_handle().unwrap();
        flow.reset();

        assert!(handle.is_cancelled());
        assert_eq!(flow.state(), &FaceSwapState::new());
        assert!(updates.has_changed().unwrap());
        assert_eq!(*updates.borrow_and_update(), FaceSwapState::new());
    }

    #[tokio::test]
    async fn polling_outside_processing_is_rejected() {
        let mut flow = FaceSwapFlow::new(ScriptedApi::default(), policy());
        let err = flow.poll_until_settled().await.unwrap_err();
        assert!(matches!(err, AppError::Transition(_)));
    }
}
