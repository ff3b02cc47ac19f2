//! Auth Middleware
//!
//! Validates `Authorization: Bearer <jwt>` and stores the caller as a
//! `CurrentUser` request extension. Handlers take `CurrentUser` as an
//! extractor.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{FromRequestParts, State};
use axum::http::{Request, header, request::Parts};
use axum::middleware::Next;
use axum::response::Response;
use kernel::id::{SessionId, UserId};
use platform::jwt::{JwtError, JwtService};

use crate::domain::value_object::permission;
use crate::error::{UsersError, UsersResult};

/// Authenticated caller, taken from the access token claims
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user_id: UserId,
    pub email: String,
    pub session_id: Option<SessionId>,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
}

impl CurrentUser {
    pub fn has_permission(&self, required: &str) -> bool {
        permission::grants(&self.permissions, required)
    }

    pub fn require(&self, required: &str) -> UsersResult<()> {
        if self.has_permission(required) {
            Ok(())
        } else {
            tracing::warn!(user_id = %self.user_id, permission = required, "Permission denied");
            Err(UsersError::Forbidden)
        }
    }
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = UsersError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or(UsersError::Unauthenticated)
    }
}

fn bearer_token(req: &Request<Body>) -> Option<&str> {
    let value = req.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Middleware that requires a valid access token
pub async fn require_auth(
    State(jwt): State<Arc<JwtService>>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, UsersError> {
    let token = bearer_token(&req).ok_or(UsersError::Unauthenticated)?;

    let claims = jwt.validate_access_token(token).map_err(|e| {
        match e {
            JwtError::Expired => tracing::debug!("Access token expired"),
            other => tracing::debug!(error = %other, "Access token rejected"),
        }
        UsersError::Unauthenticated
    })?;

    let user_id = claims
        .user_id()
        .map(UserId::from_uuid)
        .ok_or(UsersError::Unauthenticated)?;
    let current = CurrentUser {
        user_id,
        session_id: claims.session_id().map(SessionId::from_uuid),
        email: claims.email,
        roles: claims.roles,
        permissions: claims.permissions,
    };

    req.extensions_mut().insert(current);
    Ok(next.run(req).await)
}

/// Middleware that requires a permission; must run after `require_auth`
pub async fn require_permission(
    required: &'static str,
    req: Request<Body>,
    next: Next,
) -> Result<Response, UsersError> {
    let current = req
        .extensions()
        .get::<CurrentUser>()
        .ok_or(UsersError::Unauthenticated)?;
    current.require(required)?;
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(authorization: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&request(Some("Bearer abc.def"))), Some("abc.def"));
        assert_eq!(bearer_token(&request(Some("bearer  abc "))), Some("abc"));
        assert_eq!(bearer_token(&request(Some("Basic abc"))), None);
        assert_eq!(bearer_token(&request(Some("Bearer "))), None);
        assert_eq!(bearer_token(&request(None)), None);
    }

    #[test]
    fn test_full_access_satisfies_any_permission() {
        let admin = CurrentUser {
            user_id: UserId::new(),
            email: "root@example.com".into(),
            session_id: None,
            roles: vec!["Admin".into()],
            permissions: vec![permission::admin::FULL_ACCESS.into()],
        };
        assert!(admin.require(permission::users::DELETE).is_ok());

        let customer = CurrentUser {
            permissions: vec![permission::orders::VIEW_OWN.into()],
            ..admin
        };
        assert!(matches!(
            customer.require(permission::users::MANAGE_ROLES),
            Err(UsersError::Forbidden)
        ));
    }
}
