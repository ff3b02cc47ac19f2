//! Refresh-token cookie
//!
//! The refresh token travels in an HttpOnly cookie scoped to `/api/auth`;
//! access tokens never touch cookies.

use std::fmt::Write as _;

use axum::http::{HeaderMap, HeaderValue, header};

pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SameSite {
    Strict,
    #[default]
    Lax,
    None,
}

impl SameSite {
    pub fn as_str(&self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CookieConfig {
    pub name: String,
    pub path: String,
    pub secure: bool,
    pub same_site: SameSite,
    /// `None` makes a session cookie
    pub max_age_secs: Option<i64>,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self::refresh_token(7 * 24 * 3600)
    }
}

impl CookieConfig {
    pub fn refresh_token(max_age_secs: i64) -> Self {
        Self {
            name: REFRESH_TOKEN_COOKIE.to_owned(),
            path: "/api/auth".to_owned(),
            secure: true,
            same_site: SameSite::Strict,
            max_age_secs: Some(max_age_secs),
        }
    }

    /// Drops `Secure` and relaxes SameSite for plain-http development
    pub fn insecure(self) -> Self {
        Self {
            secure: false,
            same_site: SameSite::Lax,
            ..self
        }
    }

    fn render(&self, value: &str, max_age: Option<i64>) -> String {
        let mut out = format!("{}={value}; HttpOnly", self.name);
        if self.secure {
            out.push_str("; Secure");
        }
        let _ = write!(out, "; SameSite={}; Path={}", self.same_site.as_str(), self.path);
        if let Some(secs) = max_age {
            let _ = write!(out, "; Max-Age={secs}");
        }
        out
    }

    pub fn build_set_cookie(&self, value: &str) -> String {
        self.render(value, self.max_age_secs)
    }

    /// Same attributes with an empty value and `Max-Age=0`
    pub fn build_delete_cookie(&self) -> String {
        self.render("", Some(0))
    }

    pub fn set_header(&self, value: &str) -> Option<HeaderValue> {
        HeaderValue::try_from(self.build_set_cookie(value)).ok()
    }

    pub fn delete_header(&self) -> Option<HeaderValue> {
        HeaderValue::try_from(self.build_delete_cookie()).ok()
    }
}

/// First non-empty value of cookie `name` across all `Cookie` headers
pub fn extract_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let pairs = headers
        .get_all(header::COOKIE)
        .into_iter()
        .filter_map(|raw| raw.to_str().ok())
        .flat_map(|raw| raw.split(';'))
        .filter_map(|pair| pair.trim().split_once('='));

    for (key, value) in pairs {
        if key == name && !value.is_empty() {
            return Some(value.to_owned());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cookie_headers(raw: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static(raw));
        headers
    }

    #[test]
    fn test_set_cookie_attributes() {
        let cookie = CookieConfig::refresh_token(3600).build_set_cookie("value123");
        assert_eq!(
            cookie,
            "refresh_token=value123; HttpOnly; Secure; SameSite=Strict; Path=/api/auth; Max-Age=3600"
        );
    }

    #[test]
    fn test_insecure_drops_secure_flag() {
        let cookie = CookieConfig::refresh_token(60).insecure().build_set_cookie("v");
        assert!(!cookie.contains("Secure"));
        assert!(cookie.contains("SameSite=Lax"));
    }

    #[test]
    fn test_delete_cookie_expires_immediately() {
        let cookie = CookieConfig::default().build_delete_cookie();
        assert!(cookie.starts_with("refresh_token=; HttpOnly"));
        assert!(cookie.ends_with("Path=/api/auth; Max-Age=0"));
    }

    #[test]
    fn test_session_cookie_has_no_max_age() {
        let config = CookieConfig {
            max_age_secs: None,
            ..CookieConfig::default()
        };
        assert!(!config.build_set_cookie("v").contains("Max-Age"));
    }

    #[test]
    fn test_extract_cookie() {
        let headers = cookie_headers("foo=bar; refresh_token=abc+/=; other=xyz");
        assert_eq!(
            extract_cookie(&headers, REFRESH_TOKEN_COOKIE).as_deref(),
            Some("abc+/=")
        );
        assert_eq!(extract_cookie(&headers, "foo").as_deref(), Some("bar"));
        assert_eq!(extract_cookie(&headers, "missing"), None);
    }

    #[test]
    fn test_extract_empty_cookie_is_none() {
        let headers = cookie_headers("refresh_token=");
        assert_eq!(extract_cookie(&headers, REFRESH_TOKEN_COOKIE), None);
    }
}
