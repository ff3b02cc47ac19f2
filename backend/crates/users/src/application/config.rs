//! Application Configuration
//!
//! Configuration for the Users application layer.

use std::time::Duration;

use platform::cookie::CookieConfig;
use platform::crypto::random_bytes;
use platform::jwt::JwtConfig;
use platform::password::PBKDF2_ITERATIONS;

/// Minimum length of the signed-token secret in bytes
pub const MIN_TOKEN_SECRET_LENGTH: usize = 32;

/// Users application configuration
#[derive(Clone)]
pub struct UsersConfig {
    /// Access/refresh token settings
    pub jwt: JwtConfig,
    /// HMAC key for email confirmation and password reset tokens
    pub token_secret: Vec<u8>,
    /// Refuse login until the email address is confirmed
    pub require_confirmed_email: bool,
    /// PBKDF2 work factor for new hashes
    pub password_iterations: u32,
    /// Refresh-token cookie
    pub cookie: CookieConfig,
    /// Base URL used in links sent by email
    pub app_base_url: String,
    pub max_addresses: usize,
    pub max_active_sessions: usize,
    /// Entries returned by the login history endpoint
    pub login_history_limit: u32,
    /// Expired or revoked sessions older than this are deleted
    pub session_retention: Duration,
    pub session_cleanup_interval: Duration,
}

impl std::fmt::Debug for UsersConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UsersConfig")
            .field("jwt", &self.jwt)
            .field("token_secret", &"[REDACTED]")
            .field("require_confirmed_email", &self.require_confirmed_email)
            .field("password_iterations", &self.password_iterations)
            .field("cookie", &self.cookie)
            .field("app_base_url", &self.app_base_url)
            .field("max_addresses", &self.max_addresses)
            .field("max_active_sessions", &self.max_active_sessions)
            .field("login_history_limit", &self.login_history_limit)
            .field("session_retention", &self.session_retention)
            .field("session_cleanup_interval", &self.session_cleanup_interval)
            .finish()
    }
}

impl UsersConfig {
    pub fn new(jwt: JwtConfig, token_secret: Vec<u8>) -> Self {
        let cookie = CookieConfig::refresh_token(jwt.refresh_token_ttl.as_secs() as i64);
        Self {
            jwt,
            token_secret,
            require_confirmed_email: false,
            password_iterations: PBKDF2_ITERATIONS,
            cookie,
            app_base_url: "http://localhost:5173".to_string(),
            max_addresses: crate::domain::entity::address::MAX_ADDRESSES_PER_USER,
            max_active_sessions: crate::domain::entity::session::MAX_ACTIVE_SESSIONS,
            login_history_limit: 10,
            session_retention: Duration::from_secs(30 * 24 * 3600), // 30 days
            session_cleanup_interval: Duration::from_secs(3600),
        }
    }

    /// Random secrets and an insecure cookie (for development)
    pub fn development() -> Self {
        let mut config = Self::new(JwtConfig::development(), random_bytes(MIN_TOKEN_SECRET_LENGTH));
        config.cookie = config.cookie.insecure();
        config
    }

    pub fn validate(&self) -> Result<(), String> {
        self.jwt.validate().map_err(|e| e.to_string())?;
        if self.token_secret.len() < MIN_TOKEN_SECRET_LENGTH {
            return Err(format!(
                "Token secret must be at least {MIN_TOKEN_SECRET_LENGTH} bytes"
            ));
        }
        if self.password_iterations == 0 {
            return Err("Password iterations must be positive".to_string());
        }
        if self.max_addresses == 0 || self.max_active_sessions == 0 {
            return Err("Address and session limits must be positive".to_string());
        }
        Ok(())
    }

    pub fn refresh_cookie_max_age(&self) -> i64 {
        self.jwt.refresh_token_ttl.as_secs() as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_development_config_is_valid() {
        let config = UsersConfig::development();
        assert!(config.validate().is_ok());
        assert!(!config.cookie.secure);
        assert_eq!(config.max_addresses, 10);
        assert_eq!(config.max_active_sessions, 10);
    }

    #[test]
    fn test_short_token_secret_rejected() {
        let mut config = UsersConfig::development();
        config.token_secret = vec![1; 8];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let debug = format!("{:?}", UsersConfig::development());
        assert!(debug.contains("[REDACTED]"));
    }
}
