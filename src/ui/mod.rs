//! 展示层
//!
//! 纯渲染，把 `FaceSwapState` 画成终端文本，不含业务逻辑

pub mod image_url;
pub mod loader;
pub mod result_section;
pub mod upload_section;

use reqwest::Url;

use crate::workflow::FaceSwapState;

/// 渲染整个页面：上传区 + 结果区 + 操作提示
pub fn render(state: &FaceSwapState, gateway: Option<&Url>, tick: usize) -> String {
    let mut sections = vec![upload_section::render(state.image1(), state.image2())];

    if let Some(result) = result_section::render(state, gateway, tick) {
        sections.push(result);
    }

    if state.can_process() {
        sections.push("Ready: Swap Faces".to_string());
    } else if state.status().is_terminal() {
        sections.push("Run again to Start Over".to_string());
    }

    sections.join("\n\n")
}
