//! Get Current User Use Case

use std::sync::Arc;

use kernel::id::UserId;

use crate::domain::repository::UsersStore;
use crate::error::{UsersError, UsersResult};

/// Profile fields shown alongside the identity
#[derive(Debug, Clone)]
pub struct ProfileSummary {
    pub first_name: String,
    pub last_name: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CurrentUserOutput {
    pub user_id: UserId,
    pub email: String,
    pub email_confirmed: bool,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
    pub profile: Option<ProfileSummary>,
}

/// Get current user use case
pub struct GetCurrentUserUseCase<R>
where
    R: UsersStore,
{
    repo: Arc<R>,
}

impl<R> GetCurrentUserUseCase<R>
where
    R: UsersStore,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    pub async fn execute(&self, user_id: UserId) -> UsersResult<CurrentUserOutput> {
        let user = self
            .repo
            .find_user_by_id(user_id)
            .await?
            .ok_or(UsersError::UserNotFound)?;
        let profile = self
            .repo
            .find_profile_by_user(user_id)
            .await?
            .map(|p| ProfileSummary {
                first_name: p.first_name,
                last_name: p.last_name,
                display_name: p.display_name,
                avatar_url: p.avatar_url,
            });

        Ok(CurrentUserOutput {
            user_id: user.id,
            email: user.email.as_str().to_string(),
            email_confirmed: user.email_confirmed,
            roles: user.role_codes(),
            permissions: user.permissions(),
            profile,
        })
    }
}
