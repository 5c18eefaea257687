//! 匿名会话令牌

use std::fmt::{self, Display};

use uuid::Uuid;

/// 每个客户端一个的会话令牌，网关不校验，只透传给后端
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionToken(String);

impl SessionToken {
    /// 生成新的随机令牌
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// 从 Cookie 值恢复，空值视为不存在
    pub fn from_cookie_value(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.is_empty() {
            None
        } else {
            Some(Self(value.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
