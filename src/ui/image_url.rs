//! 结果图地址处理
//!
//! 后端把结果放在 Google Drive 上，分享链接不能直接当图片显示，
//! 这里把它换成缩略图地址；仍然加载不了时走网关的图片代理。

use std::sync::OnceLock;

use regex::Regex;
use reqwest::Url;

/// 缩略图宽度
pub const THUMBNAIL_WIDTH: u32 = 1200;

fn drive_file_id_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"[?&]id=([^&]+)").ok())
        .as_ref()
}

/// 取 Drive 分享链接里的文件 ID
pub fn drive_file_id(url: &str) -> Option<&str> {
    drive_file_id_pattern()?
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// 用于显示的地址：Drive 链接换成缩略图，其他原样返回
pub fn display_url(url: &str) -> String {
    match drive_file_id(url) {
        Some(file_id) => format!(
            "https://drive.google.com/thumbnail?id={}&sz=w{}",
            file_id, THUMBNAIL_WIDTH
        ),
        None => url.to_string(),
    }
}

/// 网关图片代理地址 `/api/proxy-image?url=...`
pub fn proxy_url(gateway: &Url, image_url: &str) -> Url {
    let mut url = gateway.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(["api", "proxy-image"]);
    }
    url.query_pairs_mut().clear().append_pair("url", image_url);
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drive_links_become_thumbnails() {
        let url = "https://drive.google.com/uc?export=view&id=1AbC-xyz";
        assert_eq!(drive_file_id(url), Some("1AbC-xyz"));
        assert_eq!(
            display_url(url),
            "https://drive.google.com/thumbnail?id=1AbC-xyz&sz=w1200"
        );
    }

    #[test]
    fn other_links_are_unchanged() {
        assert_eq!(
            display_url("https://example/result.jpg"),
            "https://example/result.jpg"
        );
    }

    #[test]
    fn proxy_url_encodes_target() {
        let gateway = Url::parse("http://localhost:3000").unwrap();
        let url = proxy_url(&gateway, "https://drive.google.com/uc?id=1&x=2");
        assert_eq!(url.path(), "/api/proxy-image");
        assert_eq!(
            url.query(),
            Some("url=https%3A%2F%2Fdrive.google.com%2Fuc%3Fid%3D1%26x%3D2")
        );
    }
}
