//! Profile Use Cases
//!
//! Reads and versioned writes of the signed-in user's profile, plus
//! account deletion.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use kernel::id::UserId;

use crate::domain::change_set::ChangeSet;
use crate::domain::entity::session::REVOKED_ACCOUNT_DELETED;
use crate::domain::entity::{Profile, ProfileChanges};
use crate::domain::repository::UsersStore;
use crate::domain::value_object::{cpf::Cpf, enums::Gender, phone::Phone};
use crate::error::{UsersError, UsersResult, Validator};

/// Partial profile update input; `None` keeps the current value
#[derive(Debug, Clone, Default)]
pub struct UpdateProfileInput {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub display_name: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub cpf: Option<String>,
    pub phone: Option<String>,
    pub preferred_language: Option<String>,
    pub preferred_currency: Option<String>,
    pub newsletter_subscribed: Option<bool>,
}

/// Profile-level action without input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileAction {
    AcceptTerms,
    AcceptPrivacy,
}

/// Profile use cases
pub struct ProfileUseCase<R>
where
    R: UsersStore,
{
    repo: Arc<R>,
}

impl<R> ProfileUseCase<R>
where
    R: UsersStore,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    pub async fn get(&self, user_id: UserId) -> UsersResult<Profile> {
        self.load(user_id).await
    }

    pub async fn update(&self, user_id: UserId, input: UpdateProfileInput) -> UsersResult<Profile> {
        let now = Utc::now();

        let mut v = Validator::new();
        let cpf = match input.cpf.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            Some(raw) => v.check("cpf", Cpf::new(raw)),
            None => None,
        };
        let phone = match input.phone.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
            Some(raw) => v.check("phone", Phone::new(raw)),
            None => None,
        };
        v.finish()?;

        let mut profile = self.load(user_id).await?;

        if let Some(cpf) = &cpf
            && profile.cpf.as_ref() != Some(cpf)
            && self.repo.cpf_exists(cpf, Some(user_id)).await?
        {
            return Err(UsersError::CpfNotUnique);
        }

        profile.update(
            ProfileChanges {
                first_name: input.first_name,
                last_name: input.last_name,
                display_name: input.display_name,
                birth_date: input.birth_date,
                gender: input.gender,
                cpf,
                phone,
                preferred_language: input.preferred_language,
                preferred_currency: input.preferred_currency,
                newsletter_subscribed: input.newsletter_subscribed,
            },
            now.date_naive(),
        )?;

        let updated = self.save(profile, now).await?;
        tracing::info!(user_id = %user_id, version = updated.version, "Profile updated");
        Ok(updated)
    }

    pub async fn update_avatar(&self, user_id: UserId, avatar_url: &str) -> UsersResult<Profile> {
        let now = Utc::now();
        let mut profile = self.load(user_id).await?;
        profile.update_avatar(avatar_url)?;
        self.save(profile, now).await
    }

    pub async fn apply(&self, user_id: UserId, action: ProfileAction) -> UsersResult<Profile> {
        let now = Utc::now();
        let mut profile = self.load(user_id).await?;
        match action {
            ProfileAction::AcceptTerms => profile.accept_terms(now),
            ProfileAction::AcceptPrivacy => profile.accept_privacy(now),
        }
        let profile = self.save(profile, now).await?;
        tracing::info!(user_id = %user_id, action = ?action, "Profile consent recorded");
        Ok(profile)
    }

    /// Soft-delete the profile and user and revoke every session
    pub async fn delete_account(&self, user_id: UserId) -> UsersResult<()> {
        delete_account(self.repo.as_ref(), user_id, Utc::now()).await?;
        tracing::info!(user_id = %user_id, "Account deleted");
        Ok(())
    }

    async fn load(&self, user_id: UserId) -> UsersResult<Profile> {
        self.repo
            .find_profile_by_user(user_id)
            .await?
            .ok_or(UsersError::ProfileNotFound)
    }

    async fn save(&self, profile: Profile, now: DateTime<Utc>) -> UsersResult<Profile> {
        let mut saved = profile.clone();
        saved.updated_at = now;
        saved.loaded_version = saved.version;
        saved.events.clear();

        let mut changes = ChangeSet::new(now);
        changes.update(profile);
        self.repo.commit(changes).await?;
        Ok(saved)
    }
}

/// Shared by self-service and admin deletion
pub(crate) async fn delete_account<R: UsersStore>(
    repo: &R,
    user_id: UserId,
    now: DateTime<Utc>,
) -> UsersResult<()> {
    let user = repo
        .find_user_by_id(user_id)
        .await?
        .ok_or(UsersError::UserNotFound)?;

    let mut changes = ChangeSet::new(now);
    if let Some(profile) = repo.find_profile_by_user(user_id).await? {
        changes.delete(profile);
    }
    for mut session in repo.list_active_sessions(user_id, now).await? {
        session.revoke(REVOKED_ACCOUNT_DELETED, now);
        changes.update(session);
    }
    changes.delete(user);
    repo.commit(changes).await
}
