//! 网关服务
//!
//! 同源的转发接口，浏览器 / 终端客户端只和这里通信：
//!
//! | 路径 | 方法 | 作用 |
//! |---|---|---|
//! | `/api/publish` | POST | 发放会话并把两张图片转发给后端 |
//! | `/api/status` | GET | 查询任务状态，禁止缓存 |
//! | `/api/proxy-image` | GET | 代理远程结果图，长缓存 |
//! | `/health` | GET | 存活检查 |

pub mod routes;
pub mod session;
pub mod state;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tokio::{net::TcpListener, signal};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::Config;
use crate::error::AppResult;
use routes::{health_handler, proxy_image_handler, publish_handler, status_handler};
pub use state::GatewayState;

/// 组装路由
pub fn build_router(state: Arc<GatewayState>) -> Router {
    Router::new()
        .route("/api/publish", post(publish_handler))
        .route("/api/status", get(status_handler))
        .route("/api/proxy-image", get(proxy_image_handler))
        .route("/health", get(health_handler))
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// 按配置启动网关，收到 Ctrl+C / SIGTERM 后优雅退出
pub async fn start_server(config: Config) -> AppResult<()> {
    info!("正在初始化网关状态...");
    let state = GatewayState::new(config)?;

    let address = state.config.listen_address();
    info!("绑定地址: {}", address);
    let listener = TcpListener::bind(&address).await?;

    serve(listener, state).await
}

/// 在已绑定的端口上提供服务
pub async fn serve(listener: TcpListener, state: Arc<GatewayState>) -> AppResult<()> {
    let address = listener.local_addr()?;
    let app = build_router(state);

    info!("✓ 网关运行中: http://{}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("网关已关闭");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("收到 Ctrl+C，正在关闭"),
            Err(e) => {
                error!("无法监听 Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("收到 SIGTERM，正在关闭");
            }
            Err(e) => {
                error!("无法监听 SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
