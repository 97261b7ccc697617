//! Session cookie parsing and formatting

use axum::http::{header, HeaderMap};

use crate::config::SessionConfig;

/// Value of cookie `name` across all `Cookie` headers
pub fn get_cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim_matches('"').to_string())
}

/// `Set-Cookie` value for a session id
pub fn session_cookie(config: &SessionConfig, session_id: &str) -> String {
    let mut cookie = format!(
        "{}={}; HttpOnly; Path=/; SameSite=Lax; Max-Age={}",
        config.cookie_name, session_id, config.ttl_seconds
    );
    if config.secure_cookie {
        cookie.push_str("; Secure");
    }
    cookie
}
