use std::{fmt::Display, path::Path, str::FromStr, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

use crate::error::{AppResult, ConfigError};

/// 程序配置
///
/// 优先级：环境变量 > 配置文件 > 默认值
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    // --- 网关 ---
    /// 监听地址
    pub bind_address: String,
    /// 监听端口
    pub port: u16,
    /// 换脸后端地址
    pub backend_api_url: String,
    /// 会话 Cookie 名称
    pub session_cookie_name: String,
    /// 会话 Cookie 有效期（秒）
    pub session_ttl_secs: u64,
    /// 是否给 Cookie 加 Secure（生产环境开启）
    pub secure_cookies: bool,
    /// 上传请求体上限（字节）
    pub max_upload_bytes: usize,
    /// 访问后端的单次请求超时（秒）
    pub upstream_timeout_secs: u64,
    // --- 客户端 ---
    /// 网关地址
    pub gateway_url: String,
    /// 轮询间隔（毫秒）
    pub poll_interval_ms: u64,
    /// 最长轮询时间（秒）
    pub max_poll_duration_secs: u64,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 3000,
            backend_api_url: "http://localhost:8000".to_string(),
            session_cookie_name: "face_swap_sessionId".to_string(),
            session_ttl_secs: 60 * 60,
            secure_cookies: false,
            max_upload_bytes: 20 * 1024 * 1024,
            upstream_timeout_secs: 60,
            gateway_url: "http://localhost:3000".to_string(),
            poll_interval_ms: 2000,
            max_poll_duration_secs: 600,
            verbose_logging: false,
        }
    }
}

impl Config {
    /// 只从环境变量加载
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// 加载配置文件（可选）并叠加环境变量
    pub fn load(path: Option<&Path>) -> AppResult<Self> {
        let base = match path {
            Some(path) => Self::from_toml_file(path)?,
            None => Self::default(),
        };

        let config = base.with_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// 解析 TOML 配置文件，缺省字段使用默认值
    pub fn from_toml_file(path: &Path) -> AppResult<Self> {
        let path_str = path.display().to_string();
        let content =
            std::fs::read_to_string(path).map_err(|source| ConfigError::FileReadFailed {
                path: path_str.clone(),
                source,
            })?;

        let config = Self::from_toml_str(&content).map_err(|source| {
            ConfigError::TomlParseFailed {
                path: path_str.clone(),
                source,
            }
        })?;

        info!("📄 已加载配置文件: {}", path_str);
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    fn with_env_overrides(self) -> Self {
        Self {
            bind_address: env_or("BIND_ADDRESS", self.bind_address),
            port: env_or("PORT", self.port),
            backend_api_url: env_or("BACKEND_API_URL", self.backend_api_url),
            session_cookie_name: env_or("SESSION_COOKIE_NAME", self.session_cookie_name),
            session_ttl_secs: env_or("SESSION_TTL_SECS", self.session_ttl_secs),
            secure_cookies: env_or("SECURE_COOKIES", self.secure_cookies),
            max_upload_bytes: env_or("MAX_UPLOAD_BYTES", self.max_upload_bytes),
            upstream_timeout_secs: env_or("UPSTREAM_TIMEOUT_SECS", self.upstream_timeout_secs),
            gateway_url: env_or("GATEWAY_URL", self.gateway_url),
            poll_interval_ms: env_or("POLL_INTERVAL_MS", self.poll_interval_ms),
            max_poll_duration_secs: env_or("MAX_POLL_DURATION_SECS", self.max_poll_duration_secs),
            verbose_logging: env_or("VERBOSE_LOGGING", self.verbose_logging),
        }
    }

    /// 检查配置是否可用
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, value) in [
            ("backend_api_url", &self.backend_api_url),
            ("gateway_url", &self.gateway_url),
        ] {
            if !(value.starts_with("http://") || value.starts_with("https://")) {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    reason: format!("'{}' 不是 http(s) 地址", value),
                });
            }
        }

        for (key, value) in [
            ("poll_interval_ms", self.poll_interval_ms),
            ("session_ttl_secs", self.session_ttl_secs),
            ("upstream_timeout_secs", self.upstream_timeout_secs),
        ] {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    reason: "必须大于 0".to_string(),
                });
            }
        }

        if self.session_cookie_name.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "session_cookie_name".to_string(),
                reason: "不能为空".to_string(),
            });
        }

        Ok(())
    }

    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn max_poll_duration(&self) -> Duration {
        Duration::from_secs(self.max_poll_duration_secs)
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }
}

fn env_or<T: FromStr>(key: &str, fallback: T) -> T
where
    T::Err: Display,
{
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|e| {
            warn!("环境变量 {} 的值 '{}' 无效 ({})，使用原值", key, raw, e);
            fallback
        }),
        Err(_) => fallback,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.session_cookie_name, "face_swap_sessionId");
        assert_eq!(config.session_ttl_secs, 3600);
        assert_eq!(config.poll_interval(), Duration::from_secs(2));
    }

    #[test]
    fn toml_fills_missing_fields_with_defaults() {
        let config = Config::from_toml_str(
            r#"
            port = 8080
            backend_api_url = "http://backend:5000"
            secure_cookies = true
            "#,
        )
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.backend_api_url, "http://backend:5000");
        assert!(config.secure_cookies);
        assert_eq!(config.poll_interval_ms, 2000);
        assert_eq!(config.listen_address(), "0.0.0.0:8080");
    }

    #[test]
    fn rejects_zero_poll_interval() {
        let config = Config {
            poll_interval_ms: 0,
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { key, .. }) if key == "poll_interval_ms"
        ));
    }

    #[test]
    fn rejects_non_http_backend() {
        let config = Config {
            backend_api_url: "ftp://backend".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn loads_toml_file_from_disk() {
        let path = std::env::temp_dir().join(format!("face_swap_config_{}.toml", std::process::id()));
        std::fs::write(&path, "port = 9090\npoll_interval_ms = 500\n").unwrap();

        let config = Config::from_toml_file(&path).unwrap();
        assert_eq!(config.port, 9090);
        assert_eq!(config.poll_interval(), Duration::from_millis(500));

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn missing_config_file_reports_path() {
        let err = Config::from_toml_file(Path::new("/nonexistent/face_swap.toml")).unwrap_err();
        assert!(matches!(
            err,
            crate::error::AppError::Config(ConfigError::FileReadFailed { ref path, .. })
                if path == "/nonexistent/face_swap.toml"
        ));
    }

    #[test]
    fn invalid_toml_is_an_error() {
        assert!(Config::from_toml_str("port = \"not a number\"").is_err());
    }
}
