//! 应用入口 - 编排层
//!
//! ## 职责
//!
//! 1. **网关模式**：打印启动信息，启动转发服务
//! 2. **客户端模式**：读取图片、提交、轮询、渲染、下载结果
//!
//! ## 设计特点
//!
//! - 只做调度和输出，不做状态判断（交给 `workflow`）
//! - 唯一持有 `GatewayClient` 的地方
//! - Ctrl+C 会取消正在进行的轮询

use std::path::PathBuf;

use reqwest::Url;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::clients::GatewayClient;
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::{load_image_pair, FaceSwapStatus};
use crate::server;
use crate::ui;
use crate::utils::logging::{log_client_startup, log_gateway_startup};
use crate::workflow::{FaceSwapFlow, FaceSwapState, PollPolicy};

/// 默认的结果文件名
pub const DEFAULT_RESULT_FILE: &str = "face-swap-result.jpg";

/// 一次换脸请求
#[derive(Debug, Clone)]
pub struct SwapRequest {
    /// 人脸图
    pub face: PathBuf,
    /// 目标图
    pub target: PathBuf,
    /// 结果保存位置，`None` 时只显示地址
    pub output: Option<PathBuf>,
}

/// 换脸结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapOutcome {
    pub status: FaceSwapStatus,
    pub result_url: Option<String>,
    pub error: Option<String>,
    pub saved_to: Option<PathBuf>,
}

/// 应用主结构
pub struct App {
    config: Config,
}

impl App {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// 网关模式
    pub async fn serve(&self) -> AppResult<()> {
        log_gateway_startup(&self.config);
        server::start_server(self.config.clone()).await
    }

    /// 客户端模式：跑完一次完整的换脸流程
    pub async fn swap(&self, request: SwapRequest) -> AppResult<SwapOutcome> {
        log_client_startup(&self.config);

        let (face, target) = load_image_pair(&request.face, &request.target).await?;

        let client = GatewayClient::new(&self.config)?;
        let gateway = client.base_url().clone();
        let mut flow = FaceSwapFlow::new(client, PollPolicy::from_config(&self.config))
            .with_verbose_logging(self.config.verbose_logging);

        let renderer = spawn_renderer(flow.subscribe(), gateway);

        flow.set_image1(Some(face));
        flow.set_image2(Some(target));

        let mut status = flow.submit().await?;
        if status == FaceSwapStatus::Processing {
            // 只在轮询期间用 Ctrl+C 取消
            let interrupt = flow.polling_handle().map(spawn_interrupt_watcher);
            let polled = flow.poll_until_settled().await;
            if let Some(watcher) = interrupt {
                watcher.abort();
            }
            status = polled?;
        }

        let state = flow.state().clone();
        let saved_to = match (state.result_url(), request.output) {
            (Some(result_url), Some(output)) => {
                // 信号处理器注册后不会注销，下载期间自己响应 Ctrl+C
                let bytes = tokio::select! {
                    bytes = flow.api().download_result(result_url) => bytes?,
                    _ = tokio::signal::ctrl_c() => {
                        warn!("收到 Ctrl+C，放弃下载结果");
                        return Err(std::io::Error::new(
                            std::io::ErrorKind::Interrupted,
                            "结果下载被中断",
                        )
                        .into());
                    }
                };
                tokio::fs::write(&output, &bytes)
                    .await
                    .map_err(|e| AppError::file_write_failed(output.display().to_string(), e))?;
                info!("💾 结果已保存至: {} ({} 字节)", output.display(), bytes.len());
                Some(output)
            }
            _ => None,
        };

        // 关闭通道，让渲染任务打印最后一帧后退出
        drop(flow);
        if let Err(e) = renderer.await {
            warn!("渲染任务异常退出: {}", e);
        }

        Ok(SwapOutcome {
            status,
            result_url: state.result_url().map(str::to_string),
            error: state.error().map(str::to_string),
            saved_to,
        })
    }
}

/// 收到 Ctrl+C 时取消轮询
fn spawn_interrupt_watcher(handle: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("收到 Ctrl+C，停止轮询");
            handle.cancel();
        }
    })
}

/// 每次状态变化重画一次页面
fn spawn_renderer(mut updates: watch::Receiver<FaceSwapState>, gateway: Url) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut tick = 0usize;
        while updates.changed().await.is_ok() {
            let frame = ui::render(&updates.borrow_and_update(), Some(&gateway), tick);
            println!("\n{}", frame);
            tick += 1;
        }
    })
}
