//! Admin Use Cases
//!
//! Role management and account deletion on behalf of another user. The
//! HTTP layer checks `users:manage_roles` / `users:delete` before these run.

use std::sync::Arc;

use chrono::Utc;
use kernel::id::UserId;

use crate::application::profile::delete_account;
use crate::domain::change_set::ChangeSet;
use crate::domain::entity::User;
use crate::domain::repository::UsersStore;
use crate::domain::value_object::role::Role;
use crate::error::{UsersError, UsersResult};

/// Admin use cases
pub struct AdminUseCase<R>
where
    R: UsersStore,
{
    repo: Arc<R>,
}

impl<R> AdminUseCase<R>
where
    R: UsersStore,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    pub async fn roles(&self, user_id: UserId) -> UsersResult<Vec<String>> {
        Ok(self.load(user_id).await?.role_codes())
    }

    pub async fn add_role(
        &self,
        actor: UserId,
        user_id: UserId,
        role: &str,
    ) -> UsersResult<Vec<String>> {
        let role = parse_role(role)?;
        let mut user = self.load(user_id).await?;
        user.add_role(role)?;
        let roles = user.role_codes();
        self.save(user).await?;

        tracing::info!(actor = %actor, user_id = %user_id, role = role.code(), "Role assigned");
        Ok(roles)
    }

    pub async fn remove_role(
        &self,
        actor: UserId,
        user_id: UserId,
        role: &str,
    ) -> UsersResult<Vec<String>> {
        let role = parse_role(role)?;
        let mut user = self.load(user_id).await?;
        user.remove_role(role)?;
        let roles = user.role_codes();
        self.save(user).await?;

        tracing::info!(actor = %actor, user_id = %user_id, role = role.code(), "Role removed");
        Ok(roles)
    }

    pub async fn delete_user(&self, actor: UserId, user_id: UserId) -> UsersResult<()> {
        delete_account(self.repo.as_ref(), user_id, Utc::now()).await?;
        tracing::warn!(actor = %actor, user_id = %user_id, "User deleted by admin");
        Ok(())
    }

    async fn load(&self, user_id: UserId) -> UsersResult<User> {
        self.repo
            .find_user_by_id(user_id)
            .await?
            .ok_or(UsersError::UserNotFound)
    }

    async fn save(&self, user: User) -> UsersResult<()> {
        let mut changes = ChangeSet::new(Utc::now());
        changes.update(user);
        self.repo.commit(changes).await
    }
}

fn parse_role(code: &str) -> UsersResult<Role> {
    Role::from_code(code.trim()).ok_or_else(|| UsersError::UnknownRole(code.to_string()))
}
