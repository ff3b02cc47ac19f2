//! JWT access tokens and opaque refresh tokens
//!
//! Access tokens are HS256 JWTs validated with zero clock leeway.
//! Refresh tokens are 64 random bytes (base64); only their SHA-256 hash is
//! ever persisted (see [`crate::crypto::hash_token`]).

use std::time::Duration;

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::crypto::{hash_token, random_bytes, to_base64};

const MIN_SECRET_LENGTH: usize = 32;
const REFRESH_TOKEN_BYTES: usize = 64;

// ============================================================================
// Configuration
// ============================================================================

#[derive(Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"[REDACTED]")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("access_token_ttl", &self.access_token_ttl)
            .field("refresh_token_ttl", &self.refresh_token_ttl)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JwtConfigError {
    #[error("JWT secret must be at least {MIN_SECRET_LENGTH} characters")]
    SecretTooShort,
    #[error("JWT issuer is required")]
    MissingIssuer,
    #[error("JWT audience is required")]
    MissingAudience,
    #[error("Access token lifetime must be positive")]
    InvalidAccessTokenTtl,
    #[error("Refresh token lifetime must exceed the access token lifetime")]
    InvalidRefreshTokenTtl,
}

impl JwtConfig {
    /// 15 minute access tokens, 7 day refresh tokens
    pub fn new(secret: impl Into<String>, issuer: impl Into<String>, audience: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            issuer: issuer.into(),
            audience: audience.into(),
            access_token_ttl: Duration::from_secs(15 * 60),
            refresh_token_ttl: Duration::from_secs(7 * 24 * 3600),
        }
    }

    /// Random secret, local issuer/audience
    pub fn development() -> Self {
        Self::new(to_base64(&random_bytes(48)), "ecommerce-api", "ecommerce-clients")
    }

    pub fn validate(&self) -> Result<(), JwtConfigError> {
        if self.secret.chars().count() < MIN_SECRET_LENGTH {
            return Err(JwtConfigError::SecretTooShort);
        }
        if self.issuer.trim().is_empty() {
            return Err(JwtConfigError::MissingIssuer);
        }
        if self.audience.trim().is_empty() {
            return Err(JwtConfigError::MissingAudience);
        }
        if self.access_token_ttl.is_zero() {
            return Err(JwtConfigError::InvalidAccessTokenTtl);
        }
        if self.refresh_token_ttl <= self.access_token_ttl {
            return Err(JwtConfigError::InvalidRefreshTokenTtl);
        }
        Ok(())
    }
}

// ============================================================================
// Claims
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub email: String,
    /// Unique token id
    pub jti: String,
    /// Session the token was issued for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
    pub iss: String,
    pub aud: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
}

impl Claims {
    pub fn user_id(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.sub).ok()
    }

    pub fn session_id(&self) -> Option<Uuid> {
        self.sid.as_deref().and_then(|s| Uuid::parse_str(s).ok())
    }
}

/// Who the access token is for
#[derive(Debug, Clone)]
pub struct TokenSubject {
    pub user_id: Uuid,
    pub email: String,
    pub session_id: Option<Uuid>,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: String,
    pub jti: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// Plain refresh token (returned to the client once) plus its stored hash
pub struct RefreshToken {
    pub token: String,
    pub hash: String,
}

impl std::fmt::Debug for RefreshToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshToken")
            .field("token", &"[REDACTED]")
            .field("hash", &self.hash)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("Token has expired")]
    Expired,
    #[error("Token is invalid: {0}")]
    Invalid(#[source] jsonwebtoken::errors::Error),
    #[error("Failed to sign token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

// ============================================================================
// Service
// ============================================================================

#[derive(Clone)]
pub struct JwtService {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtService {
    pub fn new(config: JwtConfig) -> Result<Self, JwtConfigError> {
        config.validate()?;
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());
        Ok(Self {
            config,
            encoding_key,
            decoding_key,
        })
    }

    pub fn config(&self) -> &JwtConfig {
        &self.config
    }

    pub fn generate_access_token(&self, subject: &TokenSubject) -> Result<AccessToken, JwtError> {
        self.generate_access_token_at(subject, Utc::now())
    }

    pub fn generate_access_token_at(
        &self,
        subject: &TokenSubject,
        now: DateTime<Utc>,
    ) -> Result<AccessToken, JwtError> {
        let jti = Uuid::new_v4();
        let ttl = chrono::Duration::from_std(self.config.access_token_ttl)
            .unwrap_or_else(|_| chrono::Duration::minutes(15));
        let expires_at = now + ttl;

        let claims = Claims {
            sub: subject.user_id.to_string(),
            email: subject.email.clone(),
            jti: jti.to_string(),
            sid: subject.session_id.map(|s| s.to_string()),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            exp: expires_at.timestamp(),
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
            roles: subject.roles.clone(),
            permissions: subject.permissions.clone(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(JwtError::Signing)?;

        Ok(AccessToken {
            token,
            jti,
            expires_at,
        })
    }

    /// Full validation: signature, issuer, audience, lifetime (no leeway)
    pub fn validate_access_token(&self, token: &str) -> Result<Claims, JwtError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation(true))
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
                _ => JwtError::Invalid(e),
            })
    }

    /// User id from a token that may have expired.
    ///
    /// Signature, issuer and audience are still enforced; only the lifetime
    /// is ignored. Used by the refresh flow.
    pub fn user_id_from_expired_token(&self, token: &str) -> Option<Uuid> {
        decode::<Claims>(token, &self.decoding_key, &self.validation(false))
            .ok()
            .and_then(|data| data.claims.user_id())
    }

    pub fn generate_refresh_token(&self) -> RefreshToken {
        let token = to_base64(&random_bytes(REFRESH_TOKEN_BYTES));
        let hash = hash_token(&token);
        RefreshToken { token, hash }
    }

    pub fn hash_refresh_token(&self, token: &str) -> String {
        hash_token(token)
    }

    pub fn refresh_token_expires_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + chrono::Duration::from_std(self.config.refresh_token_ttl)
            .unwrap_or_else(|_| chrono::Duration::days(7))
    }

    fn validation(&self, check_lifetime: bool) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = check_lifetime;
        validation.validate_nbf = check_lifetime;
        validation.set_issuer(&[self.config.issuer.as_str()]);
        validation.set_audience(&[self.config.audience.as_str()]);
        validation.set_required_spec_claims(&["exp", "sub", "iss", "aud"]);
        validation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> JwtService {
        JwtService::new(JwtConfig::new(
            "an-example-secret-that-is-long-enough-123",
            "issuer",
            "audience",
        ))
        .unwrap()
    }

    fn subject() -> TokenSubject {
        TokenSubject {
            user_id: Uuid::new_v4(),
            email: "ana@example.com".to_string(),
            session_id: Some(Uuid::new_v4()),
            roles: vec!["Customer".to_string()],
            permissions: vec!["orders:create".to_string()],
        }
    }

    #[test]
    fn test_config_validation() {
        let ok = JwtConfig::new("x".repeat(32), "iss", "aud");
        assert!(ok.validate().is_ok());

        let short = JwtConfig::new("short", "iss", "aud");
        assert_eq!(short.validate(), Err(JwtConfigError::SecretTooShort));

        let no_issuer = JwtConfig::new("x".repeat(32), " ", "aud");
        assert_eq!(no_issuer.validate(), Err(JwtConfigError::MissingIssuer));

        let mut bad_ttl = JwtConfig::new("x".repeat(32), "iss", "aud");
        bad_ttl.refresh_token_ttl = bad_ttl.access_token_ttl;
        assert_eq!(
            bad_ttl.validate(),
            Err(JwtConfigError::InvalidRefreshTokenTtl)
        );

        assert!(JwtConfig::development().validate().is_ok());
    }

    #[test]
    fn test_generate_and_validate() {
        let service = service();
        let subject = subject();
        let token = service.generate_access_token(&subject).unwrap();

        let claims = service.validate_access_token(&token.token).unwrap();
        assert_eq!(claims.user_id(), Some(subject.user_id));
        assert_eq!(claims.session_id(), subject.session_id);
        assert_eq!(claims.email, "ana@example.com");
        assert_eq!(claims.roles, vec!["Customer"]);
        assert_eq!(claims.jti, token.jti.to_string());
        assert_eq!(claims.exp - claims.iat, 15 * 60);
    }

    #[test]
    fn test_expired_token() {
        let service = service();
        let subject = subject();
        let issued = Utc::now() - chrono::Duration::hours(1);
        let token = service.generate_access_token_at(&subject, issued).unwrap();

        assert!(matches!(
            service.validate_access_token(&token.token),
            Err(JwtError::Expired)
        ));
        assert_eq!(
            service.user_id_from_expired_token(&token.token),
            Some(subject.user_id)
        );
    }

    #[test]
    fn test_wrong_secret_rejected_even_when_expired() {
        let other = JwtService::new(JwtConfig::new(
            "another-secret-that-is-also-long-enough-9",
            "issuer",
            "audience",
        ))
        .unwrap();
        let issued = Utc::now() - chrono::Duration::hours(1);
        let token = other.generate_access_token_at(&subject(), issued).unwrap();

        let service = service();
        assert!(matches!(
            service.validate_access_token(&token.token),
            Err(JwtError::Invalid(_))
        ));
        assert_eq!(service.user_id_from_expired_token(&token.token), None);
    }

    #[test]
    fn test_wrong_audience_rejected() {
        let mut config = JwtConfig::new("an-example-secret-that-is-long-enough-123", "issuer", "x");
        config.audience = "someone-else".to_string();
        let other = JwtService::new(config).unwrap();
        let token = other.generate_access_token(&subject()).unwrap();

        assert!(service().validate_access_token(&token.token).is_err());
    }

    #[test]
    fn test_refresh_token_generation() {
        let service = service();
        let a = service.generate_refresh_token();
        let b = service.generate_refresh_token();

        assert_ne!(a.token, b.token);
        assert_eq!(crate::crypto::from_base64(&a.token).unwrap().len(), 64);
        assert_eq!(a.hash, hash_token(&a.token));
        assert!(!format!("{:?}", a).contains(&a.token));
    }
}
