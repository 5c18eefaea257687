//! # Face Swap
//!
//! 换脸应用的网关与终端客户端。真正的换脸计算由外部后端完成，本 crate 只负责：
//! 会话发放、请求转发、结果图代理，以及客户端的任务状态机。
//!
//! ## 架构设计
//!
//! ### ① 数据层（Models）
//! - `models/` - 任务 ID、状态响应、上传图片、会话令牌
//!
//! ### ② 客户端层（Clients）
//! - `BackendClient` - 网关访问外部换脸后端
//! - `GatewayClient` - 终端客户端访问网关（实现 `FaceSwapApi`）
//!
//! ### ③ 服务层（Server）
//! - `server/` - axum 网关：`/api/publish`、`/api/status`、`/api/proxy-image`
//!
//! ### ④ 流程层（Workflow）
//! - `FaceSwapState` - idle / uploading / processing / completed / error 五态状态机
//! - `FaceSwapFlow` - 提交 + 固定间隔轮询，可取消、有超时
//!
//! ### ⑤ 展示层（UI）
//! - `ui/` - 上传区、结果区、加载动画的终端渲染
//!
//! ### ⑥ 编排层（Orchestration）
//! - `orchestrator::App` - 网关模式 / 客户端模式入口
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod server;
pub mod ui;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use clients::{BackendClient, FaceSwapApi, GatewayClient};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{FaceSwapStatus, JobId, UploadImage};
pub use orchestrator::{App, SwapOutcome, SwapRequest};
pub use server::{build_router, GatewayState};
pub use workflow::{FaceSwapFlow, FaceSwapState, JobEvent, JobPhase, PollPolicy};
