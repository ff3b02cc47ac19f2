//! Token helpers shared by the auth use cases

use chrono::{DateTime, Utc};
use kernel::id::UserId;
use platform::jwt::{AccessToken, JwtService, TokenSubject};
use platform::token::TokenPurpose;

use crate::domain::entity::{Session, User};
use crate::domain::repository::UsersStore;
use crate::error::{UsersError, UsersResult};

/// Tokens handed to the client after login or refresh
#[derive(Debug, Clone)]
pub struct AuthTokens {
    pub access_token: String,
    pub access_token_expires_at: DateTime<Utc>,
    /// Plain refresh token; only its hash is stored
    pub refresh_token: String,
    pub refresh_token_expires_at: DateTime<Utc>,
}

pub(crate) fn token_subject(user: &User, session: &Session) -> TokenSubject {
    TokenSubject {
        user_id: user.id.into_uuid(),
        email: user.email.as_str().to_string(),
        session_id: Some(session.id.into_uuid()),
        roles: user.role_codes(),
        permissions: user.permissions(),
    }
}

pub(crate) fn issue_access_token(
    jwt: &JwtService,
    user: &User,
    session: &Session,
    now: DateTime<Utc>,
) -> UsersResult<AccessToken> {
    jwt.generate_access_token_at(&token_subject(user, session), now)
        .map_err(|e| UsersError::Internal(e.to_string()))
}

/// Resolve the user a confirmation or reset token was issued for.
///
/// Any failure (malformed, forged, expired, stale stamp, unknown or deleted
/// user) is reported as `InvalidToken`.
pub(crate) async fn user_for_signed_token<R: UsersStore>(
    repo: &R,
    secret: &[u8],
    purpose: TokenPurpose,
    token: &str,
    now: DateTime<Utc>,
) -> UsersResult<User> {
    let parts = platform::token::parse(token).map_err(|_| UsersError::InvalidToken)?;
    let user_id: UserId = parts.subject.parse().map_err(|_| UsersError::InvalidToken)?;
    let user = repo
        .find_user_by_id(user_id)
        .await?
        .ok_or(UsersError::InvalidToken)?;

    platform::token::verify(secret, purpose, token, &user.security_stamp, now).map_err(|e| {
        tracing::debug!(user_id = %user_id, purpose = purpose.as_str(), error = %e, "Rejected signed token");
        UsersError::InvalidToken
    })?;

    Ok(user)
}
