//! Client identification utilities
//!
//! Derives the client IP and a coarse device classification from request
//! headers. Used for session records and login history.

use axum::http::{HeaderMap, header};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

const MAX_USER_AGENT_LENGTH: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DeviceType {
    #[default]
    Unknown,
    Desktop,
    Mobile,
    Tablet,
    SmartTV,
}

impl DeviceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceType::Unknown => "Unknown",
            DeviceType::Desktop => "Desktop",
            DeviceType::Mobile => "Mobile",
            DeviceType::Tablet => "Tablet",
            DeviceType::SmartTV => "SmartTV",
        }
    }

    /// Lenient parse for stored values; anything unrecognised is `Unknown`
    pub fn parse(s: &str) -> Self {
        match s {
            "Desktop" => DeviceType::Desktop,
            "Mobile" => DeviceType::Mobile,
            "Tablet" => DeviceType::Tablet,
            "SmartTV" => DeviceType::SmartTV,
            _ => DeviceType::Unknown,
        }
    }

    /// Classify a User-Agent string
    pub fn from_user_agent(user_agent: &str) -> Self {
        let ua = user_agent.to_ascii_lowercase();
        if ua.trim().is_empty() {
            return DeviceType::Unknown;
        }

        if ["smart-tv", "smarttv", "googletv", "appletv", "hbbtv", "roku", "webos", "tizen"]
            .iter()
            .any(|m| ua.contains(m))
        {
            return DeviceType::SmartTV;
        }
        // Android tablets omit "mobile"
        if ua.contains("ipad")
            || ua.contains("tablet")
            || (ua.contains("android") && !ua.contains("mobile"))
        {
            return DeviceType::Tablet;
        }
        if ["iphone", "ipod", "mobile", "android", "blackberry", "windows phone"]
            .iter()
            .any(|m| ua.contains(m))
        {
            return DeviceType::Mobile;
        }
        if ["windows", "macintosh", "mac os x", "linux", "x11", "cros"]
            .iter()
            .any(|m| ua.contains(m))
        {
            return DeviceType::Desktop;
        }

        DeviceType::Unknown
    }
}

impl std::fmt::Display for DeviceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What we know about the caller of a request
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    pub ip: Option<IpAddr>,
    /// Truncated User-Agent header
    pub user_agent: Option<String>,
    pub device_type: DeviceType,
}

impl ClientInfo {
    pub fn from_headers(headers: &HeaderMap, direct_ip: Option<IpAddr>) -> Self {
        let user_agent = headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(|ua| ua.chars().take(MAX_USER_AGENT_LENGTH).collect::<String>());

        let device_type = user_agent
            .as_deref()
            .map(DeviceType::from_user_agent)
            .unwrap_or_default();

        Self {
            ip: extract_client_ip(headers, direct_ip),
            user_agent,
            device_type,
        }
    }

    /// Get IP as string (for database storage)
    pub fn ip_string(&self) -> Option<String> {
        self.ip.map(|ip| ip.to_string())
    }
}

/// Extract client IP address from headers
///
/// Checks X-Forwarded-For header first (for reverse proxy setups),
/// then falls back to direct connection IP.
pub fn extract_client_ip(headers: &HeaderMap, direct_ip: Option<IpAddr>) -> Option<IpAddr> {
    // First IP in the list is the original client
    if let Some(xff) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first_ip) = xff.split(',').next() {
            if let Ok(ip) = first_ip.trim().parse::<IpAddr>() {
                return Some(ip);
            }
        }
    }
    direct_ip
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_device_classification() {
        let cases = [
            (
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 Chrome/120.0",
                DeviceType::Desktop,
            ),
            (
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_0) Safari/605.1.15",
                DeviceType::Desktop,
            ),
            (
                "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) Mobile/15E148",
                DeviceType::Mobile,
            ),
            (
                "Mozilla/5.0 (Linux; Android 14; Pixel 8) Chrome/120.0 Mobile Safari/537.36",
                DeviceType::Mobile,
            ),
            (
                "Mozilla/5.0 (Linux; Android 13; SM-X200) Chrome/120.0 Safari/537.36",
                DeviceType::Tablet,
            ),
            (
                "Mozilla/5.0 (iPad; CPU OS 17_0 like Mac OS X) Safari/604.1",
                DeviceType::Tablet,
            ),
            (
                "Mozilla/5.0 (SMART-TV; Linux; Tizen 7.0) SamsungBrowser/5.0",
                DeviceType::SmartTV,
            ),
            ("curl/8.4.0", DeviceType::Unknown),
            ("", DeviceType::Unknown),
        ];

        for (ua, expected) in cases {
            assert_eq!(DeviceType::from_user_agent(ua), expected, "{ua}");
        }
    }

    #[test]
    fn test_device_type_parse() {
        assert_eq!(DeviceType::parse("Tablet"), DeviceType::Tablet);
        assert_eq!(DeviceType::parse("toaster"), DeviceType::Unknown);
        assert_eq!(DeviceType::SmartTV.to_string(), "SmartTV");
    }

    #[test]
    fn test_client_info_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::USER_AGENT,
            HeaderValue::from_static("Mozilla/5.0 (X11; Linux x86_64) Firefox/121.0"),
        );
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.9"));

        let info = ClientInfo::from_headers(&headers, Some("127.0.0.1".parse().unwrap()));
        assert_eq!(info.device_type, DeviceType::Desktop);
        assert_eq!(info.ip_string().as_deref(), Some("203.0.113.9"));
        assert!(info.user_agent.unwrap().contains("Firefox"));
    }

    #[test]
    fn test_client_info_without_user_agent() {
        let info = ClientInfo::from_headers(&HeaderMap::new(), None);
        assert_eq!(info.device_type, DeviceType::Unknown);
        assert!(info.user_agent.is_none());
        assert!(info.ip.is_none());
    }

    #[test]
    fn test_extract_client_ip_xff() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("192.168.1.1, 10.0.0.1"),
        );

        let ip = extract_client_ip(&headers, None);
        assert_eq!(ip, Some("192.168.1.1".parse().unwrap()));
    }

    #[test]
    fn test_extract_client_ip_direct() {
        let headers = HeaderMap::new();
        let direct: IpAddr = "127.0.0.1".parse().unwrap();

        let ip = extract_client_ip(&headers, Some(direct));
        assert_eq!(ip, Some(direct));
    }
}
