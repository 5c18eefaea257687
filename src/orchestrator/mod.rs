//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层是整个系统的入口，决定以网关还是客户端身份运行。
//!
//! ## 层次关系
//!
//! ```text
//! orchestrator::App
//!     ├── server (网关：会话 / 转发 / 图片代理)
//!     │       ↓
//!     │   clients::BackendClient (外部换脸后端)
//!     └── workflow::FaceSwapFlow (客户端状态机 + 轮询)
//!             ↓
//!         clients::GatewayClient (调用网关)
//!             ↓
//!         ui (渲染)
//! ```
//!
//! ## 设计原则
//!
//! 1. **向下依赖**：编排层 → workflow / server → clients → models
//! 2. **无业务逻辑**：只做调度和输出，状态判断都在状态机里

pub mod app;

pub use app::{App, SwapOutcome, SwapRequest, DEFAULT_RESULT_FILE};
