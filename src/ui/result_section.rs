//! 结果区：加载中 / 结果 / 错误面板

use reqwest::Url;

use crate::ui::{image_url, loader};
use crate::workflow::{FaceSwapState, JobPhase};

const FALLBACK_ERROR: &str = "Something went wrong";

/// 渲染结果区，空闲时不显示
///
/// `gateway` 用于给出图片代理的备用地址
pub fn render(state: &FaceSwapState, gateway: Option<&Url>, tick: usize) -> Option<String> {
    let body = match state.phase() {
        JobPhase::Idle => return None,
        JobPhase::Uploading => waiting("Uploading images...", tick),
        JobPhase::Processing { .. } => waiting("Processing face swap...", tick),
        JobPhase::Completed { result_url, .. } => {
            let mut lines = vec![
                "Face swap result:".to_string(),
                format!("  {}", image_url::display_url(result_url)),
            ];
            if let Some(gateway) = gateway {
                lines.push(format!(
                    "  (proxy) {}",
                    image_url::proxy_url(gateway, result_url)
                ));
            }
            lines.push(format!("Download Result: {}", result_url));
            lines.join("\n")
        }
        JobPhase::Error { message, .. } => {
            let message = if message.trim().is_empty() {
                FALLBACK_ERROR
            } else {
                message.as_str()
            };
            format!("Error occurred\n  {}", message)
        }
    };

    Some(format!("Result\n{}", body))
}

fn waiting(message: &str, tick: usize) -> String {
    format!(
        "{}\n  This may take a few seconds",
        loader::render(message, tick)
    )
}
