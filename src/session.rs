use crate::errors::AppError;
use axum::http::{HeaderMap, HeaderValue, header};

pub const COOKIE_NAME: &str = "network_user";

/// Username named by the identity cookie, if any.
///
/// The cookie holds the bare username with no signature, so a client can
/// claim any identity by setting it. Author-only checks built on this value
/// keep honest clients apart; they do not stop a forged cookie.
pub fn current_user(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == COOKIE_NAME)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub fn require_user(headers: &HeaderMap) -> Result<String, AppError> {
    current_user(headers).ok_or_else(AppError::unauthorized)
}

pub fn login_cookie(username: &str) -> HeaderValue {
    let cookie = format!("{COOKIE_NAME}={username}; Path=/; HttpOnly; SameSite=Lax");
    HeaderValue::from_str(&cookie).unwrap_or_else(|_| logout_cookie())
}

pub fn logout_cookie() -> HeaderValue {
    HeaderValue::from_str(&format!("{COOKIE_NAME}=; Path=/; Max-Age=0"))
        .unwrap_or_else(|_| HeaderValue::from_static("Max-Age=0"))
}
