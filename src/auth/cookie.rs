// Refresh-token cookie helpers

use axum::http::{header, HeaderMap};
use chrono::Duration;

pub const REFRESH_COOKIE_NAME: &str = "refreshToken";

/// Attributes shared by every refresh cookie the server emits
#[derive(Debug, Clone)]
pub struct CookiePolicy {
    /// Adds `Secure`; on in production
    pub secure: bool,
    pub path: String,
    pub max_age: Duration,
}

impl CookiePolicy {
    pub fn new(secure: bool, max_age: Duration) -> Self {
        Self {
            secure,
            path: "/api/auth".to_string(),
            max_age,
        }
    }

    fn attributes(&self, max_age_secs: i64) -> String {
        let mut attrs = format!(
            "HttpOnly; SameSite=Strict; Path={}; Max-Age={}",
            self.path, max_age_secs
        );
        if self.secure {
            attrs.push_str("; Secure");
        }
        attrs
    }

    /// `Set-Cookie` value carrying a freshly issued refresh token
    pub fn refresh_cookie(&self, token: &str) -> String {
        format!(
            "{}={}; {}",
            REFRESH_COOKIE_NAME,
            token,
            self.attributes(self.max_age.num_seconds())
        )
    }

    /// `Set-Cookie` value that makes the browser drop the refresh cookie
    pub fn clear_cookie(&self) -> String {
        format!(
            "{}=; {}; Expires=Thu, 01 Jan 1970 00:00:00 GMT",
            REFRESH_COOKIE_NAME,
            self.attributes(0)
        )
    }
}

/// Read a cookie from every `Cookie` header on the request
pub fn get_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn policy(secure: bool) -> CookiePolicy {
        CookiePolicy::new(secure, Duration::days(7))
    }

    #[test]
    fn test_refresh_cookie_flags() {
        let cookie = policy(false).refresh_cookie("abc.def.ghi");
        assert!(cookie.starts_with("refreshToken=abc.def.ghi;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Strict"));
        assert!(cookie.contains("Max-Age=604800"));
        assert!(!cookie.contains("Secure"));

        assert!(policy(true).refresh_cookie("t").contains("; Secure"));
    }

    #[test]
    fn test_clear_cookie_expires_immediately() {
        let cookie = policy(true).clear_cookie();
        assert!(cookie.starts_with("refreshToken=;"));
        assert!(cookie.contains("Max-Age=0"));
        assert!(cookie.contains("HttpOnly"));
    }

    #[test]
    fn test_get_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; refreshToken=tok123; lang=en"),
        );

        assert_eq!(get_cookie(&headers, REFRESH_COOKIE_NAME).as_deref(), Some("tok123"));
        assert_eq!(get_cookie(&headers, "theme").as_deref(), Some("dark"));
        assert!(get_cookie(&headers, "missing").is_none());
    }

    #[test]
    fn test_get_cookie_ignores_empty_value() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("refreshToken="));
        assert!(get_cookie(&headers, REFRESH_COOKIE_NAME).is_none());
        assert!(get_cookie(&HeaderMap::new(), REFRESH_COOKIE_NAME).is_none());
    }
}
