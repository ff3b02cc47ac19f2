//! Purpose-scoped signed tokens
//!
//! Stateless tokens for email confirmation and password reset. A token is
//! `{subject}.{expires_unix}.{signature}` where the signature is
//! HMAC-SHA256 over `purpose|subject|expires|stamp` (URL-safe base64).
//!
//! The stamp is the user's security stamp: rotating it invalidates every
//! outstanding token for that user.

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::crypto::{constant_time_eq, from_base64_url, hmac_sha256, to_base64_url};

/// Email confirmation links live for a day
pub const EMAIL_CONFIRMATION_HOURS: i64 = 24;
/// Password reset links live for two hours
pub const PASSWORD_RESET_HOURS: i64 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenPurpose {
    EmailConfirmation,
    PasswordReset,
}

impl TokenPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenPurpose::EmailConfirmation => "email-confirmation",
            TokenPurpose::PasswordReset => "password-reset",
        }
    }

    pub fn lifetime(&self) -> Duration {
        match self {
            TokenPurpose::EmailConfirmation => Duration::hours(EMAIL_CONFIRMATION_HOURS),
            TokenPurpose::PasswordReset => Duration::hours(PASSWORD_RESET_HOURS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("Token is malformed")]
    Malformed,
    #[error("Token has expired")]
    Expired,
    #[error("Token signature is invalid")]
    InvalidSignature,
}

/// Parsed token parts before signature verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenParts {
    pub subject: String,
    pub expires_at: i64,
    signature: Vec<u8>,
}

fn signing_input(purpose: TokenPurpose, subject: &str, expires_at: i64, stamp: &str) -> String {
    format!("{}|{}|{}|{}", purpose.as_str(), subject, expires_at, stamp)
}

pub fn sign(
    secret: &[u8],
    purpose: TokenPurpose,
    subject: &str,
    stamp: &str,
    expires_at: DateTime<Utc>,
) -> String {
    let expires = expires_at.timestamp();
    let mac = hmac_sha256(secret, signing_input(purpose, subject, expires, stamp).as_bytes());
    format!("{}.{}.{}", subject, expires, to_base64_url(&mac))
}

/// Split a token without checking it
pub fn parse(token: &str) -> Result<TokenParts, TokenError> {
    // Subject is a UUID, so it never contains a dot
    let mut parts = token.trim().splitn(3, '.');
    let (Some(subject), Some(expires), Some(signature)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(TokenError::Malformed);
    };
    if subject.is_empty() {
        return Err(TokenError::Malformed);
    }
    let expires_at = expires.parse::<i64>().map_err(|_| TokenError::Malformed)?;
    let signature = from_base64_url(signature).map_err(|_| TokenError::Malformed)?;

    Ok(TokenParts {
        subject: subject.to_string(),
        expires_at,
        signature,
    })
}

pub fn verify(
    secret: &[u8],
    purpose: TokenPurpose,
    token: &str,
    stamp: &str,
    now: DateTime<Utc>,
) -> Result<TokenParts, TokenError> {
    let parts = parse(token)?;

    let expected = hmac_sha256(
        secret,
        signing_input(purpose, &parts.subject, parts.expires_at, stamp).as_bytes(),
    );
    if !constant_time_eq(&expected, &parts.signature) {
        return Err(TokenError::InvalidSignature);
    }
    if parts.expires_at <= now.timestamp() {
        return Err(TokenError::Expired);
    }

    Ok(parts)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";
    const SUBJECT: &str = "0f8fad5b-d9cb-469f-a165-70867728950e";

    #[test]
    fn test_sign_and_verify() {
        let now = Utc::now();
        let token = sign(
            SECRET,
            TokenPurpose::EmailConfirmation,
            SUBJECT,
            "stamp-1",
            now + TokenPurpose::EmailConfirmation.lifetime(),
        );

        let parts = verify(SECRET, TokenPurpose::EmailConfirmation, &token, "stamp-1", now).unwrap();
        assert_eq!(parts.subject, SUBJECT);
    }

    #[test]
    fn test_wrong_purpose_or_stamp_rejected() {
        let now = Utc::now();
        let token = sign(
            SECRET,
            TokenPurpose::PasswordReset,
            SUBJECT,
            "stamp-1",
            now + TokenPurpose::PasswordReset.lifetime(),
        );

        assert_eq!(
            verify(SECRET, TokenPurpose::EmailConfirmation, &token, "stamp-1", now),
            Err(TokenError::InvalidSignature)
        );
        assert_eq!(
            verify(SECRET, TokenPurpose::PasswordReset, &token, "stamp-2", now),
            Err(TokenError::InvalidSignature)
        );
        assert_eq!(
            verify(b"another-secret", TokenPurpose::PasswordReset, &token, "stamp-1", now),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn test_expired() {
        let now = Utc::now();
        let token = sign(
            SECRET,
            TokenPurpose::PasswordReset,
            SUBJECT,
            "stamp",
            now - Duration::seconds(1),
        );
        assert_eq!(
            verify(SECRET, TokenPurpose::PasswordReset, &token, "stamp", now),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn test_tampered_subject_rejected() {
        let now = Utc::now();
        let token = sign(
            SECRET,
            TokenPurpose::PasswordReset,
            SUBJECT,
            "stamp",
            now + TokenPurpose::PasswordReset.lifetime(),
        );
        let tampered = token.replacen('0', "1", 1);
        assert_eq!(
            verify(SECRET, TokenPurpose::PasswordReset, &tampered, "stamp", now),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn test_malformed() {
        assert_eq!(parse(""), Err(TokenError::Malformed));
        assert_eq!(parse("abc"), Err(TokenError::Malformed));
        assert_eq!(parse("abc.notanumber.sig"), Err(TokenError::Malformed));
        assert_eq!(parse(".123.c2ln"), Err(TokenError::Malformed));
        assert_eq!(parse("abc.123.***"), Err(TokenError::Malformed));
    }
}
