/// 日志工具模块
///
/// 初始化 tracing 订阅器，以及启动横幅等输出辅助函数
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::Config;

const DEFAULT_FILTER: &str = "face_swap=info,tower_http=info";
const VERBOSE_FILTER: &str = "face_swap=debug,tower_http=debug";

/// 初始化日志，`RUST_LOG` 优先
///
/// 重复调用不会报错（测试里会多次初始化）
pub fn init(verbose: bool) {
    let fallback = if verbose { VERBOSE_FILTER } else { DEFAULT_FILTER };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}

/// 记录网关启动信息
pub fn log_gateway_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!(
        "🚀 换脸网关启动 - {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("🌐 监听地址: {}", config.listen_address());
    info!("🔗 后端地址: {}", config.backend_api_url);
    info!(
        "🍪 会话 Cookie: {} (有效期 {} 秒, secure={})",
        config.session_cookie_name, config.session_ttl_secs, config.secure_cookies
    );
    info!("{}", "=".repeat(60));
}

/// 记录客户端启动信息
pub fn log_client_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!(
        "🚀 换脸客户端启动 - {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("🌐 网关地址: {}", config.gateway_url);
    info!(
        "⏱️ 轮询间隔: {} 毫秒, 最长等待: {} 秒",
        config.poll_interval_ms, config.max_poll_duration_secs
    );
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度（字符数）
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_by_characters() {
        assert_eq!(truncate_text("换脸结果图片", 2), "换脸...");
        assert_eq!(truncate_text("short", 10), "short");
    }

    #[test]
    fn init_is_idempotent() {
        init(false);
        init(true);
    }
}
