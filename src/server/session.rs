//! 会话发放
//!
//! 第一次提交时生成令牌，写进 HttpOnly Cookie，之后同一个客户端复用

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::config::Config;
use crate::models::SessionToken;

/// 读取请求里的会话令牌，没有就新建；第二个值表示是否新建
pub fn resolve(jar: &CookieJar, cookie_name: &str) -> (SessionToken, bool) {
    match jar
        .get(cookie_name)
        .and_then(|cookie| SessionToken::from_cookie_value(cookie.value()))
    {
        Some(token) => (token, false),
        None => (SessionToken::generate(), true),
    }
}

/// 构造会话 Cookie：HttpOnly、SameSite=Lax、全站路径、固定有效期
pub fn session_cookie(config: &Config, token: &SessionToken) -> Cookie<'static> {
    Cookie::build((config.session_cookie_name.clone(), token.as_str().to_string()))
        .http_only(true)
        .secure(config.secure_cookies)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(
            i64::try_from(config.session_ttl_secs).unwrap_or(i64::MAX),
        ))
        .path("/")
        .build()
}
