//! Register User Use Case
//!
//! Creates the user, its profile and default notification preferences in
//! one commit. `ProfileCreated` is staged with them; its handler sends the
//! welcome notification and kicks off email confirmation.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use platform::password::ClearTextPassword;

use crate::application::config::UsersConfig;
use crate::domain::change_set::ChangeSet;
use crate::domain::entity::profile::validate_birth_date;
use crate::domain::entity::{NotificationPreference, Profile, User};
use crate::domain::repository::UsersStore;
use crate::domain::value_object::{cpf::Cpf, email::Email, phone::Phone};
use crate::error::{UsersError, UsersResult, Validator};
use kernel::id::UserId;

/// Register input
#[derive(Debug, Clone, Default)]
pub struct RegisterInput {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub cpf: Option<String>,
    pub phone: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub accept_terms: bool,
    pub newsletter: bool,
}

/// Register output
#[derive(Debug, Clone)]
pub struct RegisterOutput {
    pub user_id: UserId,
    pub email: String,
}

/// Register user use case
pub struct RegisterUserUseCase<R>
where
    R: UsersStore,
{
    repo: Arc<R>,
    config: Arc<UsersConfig>,
}

impl<R> RegisterUserUseCase<R>
where
    R: UsersStore,
{
    pub fn new(repo: Arc<R>, config: Arc<UsersConfig>) -> Self {
        Self { repo, config }
    }

    pub async fn execute(&self, input: RegisterInput) -> UsersResult<RegisterOutput> {
        let now = Utc::now();

        let mut v = Validator::new();
        let email = v.check("email", Email::new(input.email.as_str()));
        for violation in ClearTextPassword::policy_violations(&input.password) {
            v.add("password", violation.to_string());
        }
        v.required("firstName", "First name", &input.first_name, 100);
        v.required("lastName", "Last name", &input.last_name, 100);
        let cpf = match input.cpf.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            Some(raw) => v.check("cpf", Cpf::new(raw)),
            None => None,
        };
        let phone = match input.phone.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
            Some(raw) => v.check("phone", Phone::new(raw)),
            None => None,
        };
        if let Some(birth_date) = input.birth_date {
            validate_birth_date(&mut v, birth_date, now.date_naive());
        }
        v.finish()?;

        let email = email.ok_or_else(|| UsersError::invalid("email", "Invalid email"))?;

        if self.repo.email_exists(&email).await? {
            return Err(UsersError::EmailNotUnique);
        }
        if let Some(cpf) = &cpf
            && self.repo.cpf_exists(cpf, None).await?
        {
            return Err(UsersError::CpfNotUnique);
        }

        let password = ClearTextPassword::new(input.password)
            .map_err(|e| UsersError::invalid("password", e.to_string()))?;
        let password_hash = password.hash_with_iterations(self.config.password_iterations);

        let user = User::register(email, password_hash, now);
        let mut profile = Profile::create(user.id, &input.first_name, &input.last_name, now)?;
        profile.cpf = cpf;
        profile.phone = phone;
        profile.birth_date = input.birth_date;
        profile.newsletter_subscribed = input.newsletter;
        if input.accept_terms {
            profile.accepted_terms_at = Some(now);
            profile.accepted_privacy_at = Some(now);
        }
        let preferences = NotificationPreference::defaults(user.id, now);

        let output = RegisterOutput {
            user_id: user.id,
            email: user.email.as_str().to_string(),
        };

        let mut changes = ChangeSet::new(now);
        changes.insert(user).insert(profile).insert(preferences);
        self.repo.commit(changes).await?;

        tracing::info!(user_id = %output.user_id, "User registered");

        Ok(output)
    }
}
