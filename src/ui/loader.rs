/// 加载动画帧
const FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// 第 `tick` 帧
pub fn frame(tick: usize) -> &'static str {
    FRAMES[tick % FRAMES.len()]
}

/// 带动画的一行提示
pub fn render(message: &str, tick: usize) -> String {
    format!("{} {}", frame(tick), message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_wrap_around() {
        assert_eq!(frame(0), frame(FRAMES.len()));
        assert_ne!(frame(0), frame(1));
        assert_eq!(render("Processing...", 0), "⠋ Processing...");
    }
}
