//! Profile Entity
//!
//! Personal data attached one-to-one to a `User`. Updates are versioned:
//! the unit of work only writes a profile whose stored version still
//! matches the one it was loaded with.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use kernel::id::{ProfileId, UserId};

use crate::domain::event::{ProfileCreated, ProfileDeleted, ProfileUpdated, UsersEvent};
use crate::domain::value_object::{cpf::Cpf, enums::Gender, phone::Phone};
use crate::error::{UsersResult, Validator};

pub const NAME_MAX_LENGTH: usize = 100;
pub const DISPLAY_NAME_MAX_LENGTH: usize = 100;
pub const AVATAR_URL_MAX_LENGTH: usize = 500;
pub const LANGUAGE_MAX_LENGTH: usize = 10;
pub const MINIMUM_AGE: i32 = 18;

pub const DEFAULT_LANGUAGE: &str = "pt-BR";
pub const DEFAULT_CURRENCY: &str = "BRL";

#[derive(Debug, Clone)]
pub struct Profile {
    pub id: ProfileId,
    pub user_id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub gender: Gender,
    pub cpf: Option<Cpf>,
    pub phone: Option<Phone>,
    pub preferred_language: String,
    pub preferred_currency: String,
    pub newsletter_subscribed: bool,
    pub accepted_terms_at: Option<DateTime<Utc>>,
    pub accepted_privacy_at: Option<DateTime<Utc>>,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    /// Version as read from storage
    pub(crate) loaded_version: i32,
    pub(crate) events: Vec<UsersEvent>,
}

/// Partial profile update; `None` keeps the current value
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub display_name: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub cpf: Option<Cpf>,
    pub phone: Option<Phone>,
    pub preferred_language: Option<String>,
    pub preferred_currency: Option<String>,
    pub newsletter_subscribed: Option<bool>,
}

impl Profile {
    pub fn create(
        user_id: UserId,
        first_name: &str,
        last_name: &str,
        now: DateTime<Utc>,
    ) -> UsersResult<Self> {
        let mut v = Validator::new();
        let first_name = v.required("firstName", "First name", first_name, NAME_MAX_LENGTH);
        let last_name = v.required("lastName", "Last name", last_name, NAME_MAX_LENGTH);
        v.finish()?;

        let display_name = format!("{first_name} {last_name}");
        let mut profile = Self {
            id: ProfileId::new(),
            user_id,
            first_name,
            last_name,
            display_name: Some(display_name.clone()),
            avatar_url: None,
            birth_date: None,
            gender: Gender::NotInformed,
            cpf: None,
            phone: None,
            preferred_language: DEFAULT_LANGUAGE.to_string(),
            preferred_currency: DEFAULT_CURRENCY.to_string(),
            newsletter_subscribed: false,
            accepted_terms_at: None,
            accepted_privacy_at: None,
            version: 1,
            created_at: now,
            updated_at: now,
            deleted_at: None,
            loaded_version: 0,
            events: Vec::new(),
        };
        profile.events.push(UsersEvent::ProfileCreated(ProfileCreated {
            profile_id: profile.id,
            user_id,
            first_name: profile.first_name.clone(),
            last_name: profile.last_name.clone(),
            display_name,
        }));
        Ok(profile)
    }

    pub fn update(&mut self, changes: ProfileChanges, today: NaiveDate) -> UsersResult<()> {
        let mut v = Validator::new();
        let first_name = changes
            .first_name
            .as_deref()
            .map(|n| v.required("firstName", "First name", n, NAME_MAX_LENGTH));
        let last_name = changes
            .last_name
            .as_deref()
            .map(|n| v.required("lastName", "Last name", n, NAME_MAX_LENGTH));
        let display_name = v.optional(
            "displayName",
            "Display name",
            changes.display_name.as_deref(),
            DISPLAY_NAME_MAX_LENGTH,
        );
        let language = v.optional(
            "preferredLanguage",
            "Preferred language",
            changes.preferred_language.as_deref(),
            LANGUAGE_MAX_LENGTH,
        );
        let currency = changes.preferred_currency.as_deref().map(str::trim);
        if let Some(currency) = currency
            && !(currency.len() == 3 && currency.chars().all(|c| c.is_ascii_alphabetic()))
        {
            v.add("preferredCurrency", "Currency must be a 3-letter ISO code");
        }
        if let Some(birth_date) = changes.birth_date {
            validate_birth_date(&mut v, birth_date, today);
        }
        v.finish()?;

        if let Some(first_name) = first_name {
            self.first_name = first_name;
        }
        if let Some(last_name) = last_name {
            self.last_name = last_name;
        }
        if let Some(display_name) = display_name {
            self.display_name = Some(display_name);
        }
        if let Some(birth_date) = changes.birth_date {
            self.birth_date = Some(birth_date);
        }
        if let Some(gender) = changes.gender {
            self.gender = gender;
        }
        if let Some(cpf) = changes.cpf {
            self.cpf = Some(cpf);
        }
        if let Some(phone) = changes.phone {
            self.phone = Some(phone);
        }
        if let Some(language) = language {
            self.preferred_language = language;
        }
        if let Some(currency) = currency {
            self.preferred_currency = currency.to_ascii_uppercase();
        }
        if let Some(subscribed) = changes.newsletter_subscribed {
            self.newsletter_subscribed = subscribed;
        }

        self.bump_version();
        Ok(())
    }

    pub fn update_avatar(&mut self, url: &str) -> UsersResult<()> {
        let mut v = Validator::new();
        let url = v.required("avatarUrl", "Avatar URL", url, AVATAR_URL_MAX_LENGTH);
        if v.is_valid() && !(url.starts_with("https://") || url.starts_with("http://")) {
            v.add("avatarUrl", "Avatar URL must be an http or https URL");
        }
        v.finish()?;

        self.avatar_url = Some(url);
        self.bump_version();
        Ok(())
    }

    pub fn accept_terms(&mut self, now: DateTime<Utc>) {
        self.accepted_terms_at = Some(now);
        self.bump_version();
    }

    pub fn accept_privacy(&mut self, now: DateTime<Utc>) {
        self.accepted_privacy_at = Some(now);
        self.bump_version();
    }

    pub fn soft_delete(&mut self, now: DateTime<Utc>) {
        if self.deleted_at.is_some() {
            return;
        }
        self.deleted_at = Some(now);
        self.version += 1;
        self.events.push(UsersEvent::ProfileDeleted(ProfileDeleted {
            profile_id: self.id,
            user_id: self.user_id,
        }));
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Version the stored row must still have for an update to apply
    pub fn expected_version(&self) -> i32 {
        self.loaded_version
    }

    fn bump_version(&mut self) {
        self.version += 1;
        self.events.push(UsersEvent::ProfileUpdated(ProfileUpdated {
            profile_id: self.id,
            user_id: self.user_id,
            version: self.version,
        }));
    }

    pub(crate) fn take_events(&mut self) -> Vec<UsersEvent> {
        std::mem::take(&mut self.events)
    }
}

/// Birth dates must be in the past and at least `MINIMUM_AGE` years ago
pub fn validate_birth_date(v: &mut Validator, birth_date: NaiveDate, today: NaiveDate) {
    if birth_date >= today {
        v.add("birthDate", "Birth date must be in the past");
        return;
    }
    if age_on(birth_date, today) < MINIMUM_AGE {
        v.add("birthDate", format!("You must be at least {MINIMUM_AGE} years old"));
    }
}

/// Whole years between `birth_date` and `today`
pub fn age_on(birth_date: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - birth_date.year();
    if (today.month(), today.day()) < (birth_date.month(), birth_date.day()) {
        age -= 1;
    }
    age
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn profile() -> Profile {
        Profile::create(UserId::new(), " Ana ", "Souza", Utc::now()).unwrap()
    }

    #[test]
    fn test_create_sets_display_name_and_event() {
        let mut p = profile();
        assert_eq!(p.first_name, "Ana");
        assert_eq!(p.display_name.as_deref(), Some("Ana Souza"));
        assert_eq!(p.preferred_language, "pt-BR");
        assert_eq!(p.preferred_currency, "BRL");
        assert_eq!(p.version, 1);

        let events = p.take_events();
        assert!(matches!(&events[..], [UsersEvent::ProfileCreated(e)] if e.display_name == "Ana Souza"));
    }

    #[test]
    fn test_create_requires_names() {
        let err = Profile::create(UserId::new(), "", &"x".repeat(101), Utc::now()).unwrap_err();
        let crate::error::UsersError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_partial_update_keeps_unset_fields() {
        let mut p = profile();
        p.take_events();
        p.update(
            ProfileChanges {
                last_name: Some("Lima".into()),
                preferred_currency: Some("usd".into()),
                ..Default::default()
            },
            date(2026, 1, 1),
        )
        .unwrap();

        assert_eq!(p.first_name, "Ana");
        assert_eq!(p.last_name, "Lima");
        assert_eq!(p.preferred_currency, "USD");
        assert_eq!(p.version, 2);
        let events = p.take_events();
        assert!(matches!(&events[..], [UsersEvent::ProfileUpdated(e)] if e.version == 2));
    }

    #[test]
    fn test_update_rejects_minor() {
        let mut p = profile();
        let result = p.update(
            ProfileChanges {
                birth_date: Some(date(2010, 6, 1)),
                ..Default::default()
            },
            date(2026, 1, 1),
        );
        assert!(result.is_err());
        assert_eq!(p.version, 1);
    }

    #[test]
    fn test_avatar_requires_http_url() {
        let mut p = profile();
        assert!(p.update_avatar("ftp://example.com/a.png").is_err());
        p.update_avatar("https://cdn.example.com/a.png").unwrap();
        assert_eq!(p.avatar_url.as_deref(), Some("https://cdn.example.com/a.png"));
    }

    #[test]
    fn test_soft_delete_is_idempotent() {
        let mut p = profile();
        p.take_events();
        let now = Utc::now();
        p.soft_delete(now);
        p.soft_delete(now);
        assert_eq!(p.deleted_at, Some(now));
        assert_eq!(p.take_events().len(), 1);
    }

    #[test]
    fn test_age_on() {
        assert_eq!(age_on(date(2000, 5, 10), date(2018, 5, 9)), 17);
        assert_eq!(age_on(date(2000, 5, 10), date(2018, 5, 10)), 18);
        assert_eq!(age_on(date(2000, 2, 29), date(2018, 3, 1)), 18);
    }
}
