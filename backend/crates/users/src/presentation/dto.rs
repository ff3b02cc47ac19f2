//! API DTOs (Data Transfer Objects)

use chrono::{DateTime, NaiveDate, Utc};
use kernel::id::{AddressId, NotificationId, SessionId, UserId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::application::{
    AddressInput, AuthTokens, CurrentUserOutput, LoginOutput, ProfileSummary, SessionView,
    UpdateProfileInput,
};
use crate::domain::entity::{
    Address, AddressDraft, LoginHistory, Notification, NotificationPreference,
    PreferenceChanges, Profile,
};
use crate::domain::value_object::DeviceType;
use crate::domain::value_object::enums::{Gender, LoginProvider, NotificationType, ReferenceType};

// ============================================================================
// Registration
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub cpf: Option<String>,
    pub phone: Option<String>,
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub accept_terms: bool,
    #[serde(default)]
    pub newsletter: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub user_id: UserId,
    pub email: String,
}

// ============================================================================
// Login / Refresh / Logout
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    pub device_id: Option<String>,
    pub device_name: Option<String>,
}

/// Login and refresh response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_at: DateTime<Utc>,
    pub refresh_token: String,
    pub refresh_token_expires_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<LoginUserResponse>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginUserResponse {
    pub id: UserId,
    pub email: String,
    pub roles: Vec<String>,
}

impl From<AuthTokens> for TokenResponse {
    fn from(tokens: AuthTokens) -> Self {
        Self {
            access_token: tokens.access_token,
            token_type: "Bearer",
            expires_at: tokens.access_token_expires_at,
            refresh_token: tokens.refresh_token,
            refresh_token_expires_at: tokens.refresh_token_expires_at,
            user: None,
        }
    }
}

impl From<LoginOutput> for TokenResponse {
    fn from(output: LoginOutput) -> Self {
        let user = LoginUserResponse {
            id: output.user_id,
            email: output.email,
            roles: output.roles,
        };
        Self {
            user: Some(user),
            ..Self::from(output.tokens)
        }
    }
}

/// Both fields are optional: the refresh token may come from the cookie
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    #[serde(default)]
    pub access_token: String,
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutRequest {
    pub refresh_token: Option<String>,
}

// ============================================================================
// Email / Password
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRequest {
    pub token: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailRequest {
    pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

// ============================================================================
// Current User
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUserResponse {
    pub id: UserId,
    pub email: String,
    pub email_confirmed: bool,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
    pub profile: Option<ProfileSummaryResponse>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSummaryResponse {
    pub first_name: String,
    pub last_name: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

impl From<ProfileSummary> for ProfileSummaryResponse {
    fn from(p: ProfileSummary) -> Self {
        Self {
            first_name: p.first_name,
            last_name: p.last_name,
            display_name: p.display_name,
            avatar_url: p.avatar_url,
        }
    }
}

impl From<CurrentUserOutput> for CurrentUserResponse {
    fn from(o: CurrentUserOutput) -> Self {
        Self {
            id: o.user_id,
            email: o.email,
            email_confirmed: o.email_confirmed,
            roles: o.roles,
            permissions: o.permissions,
            profile: o.profile.map(Into::into),
        }
    }
}

// ============================================================================
// Profile
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub id: Uuid,
    pub user_id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub gender: Gender,
    pub cpf: Option<String>,
    pub phone: Option<String>,
    pub preferred_language: String,
    pub preferred_currency: String,
    pub newsletter_subscribed: bool,
    pub accepted_terms_at: Option<DateTime<Utc>>,
    pub accepted_privacy_at: Option<DateTime<Utc>>,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Profile> for ProfileResponse {
    fn from(p: Profile) -> Self {
        Self {
            id: p.id.into_uuid(),
            user_id: p.user_id,
            full_name: p.full_name(),
            first_name: p.first_name,
            last_name: p.last_name,
            display_name: p.display_name,
            avatar_url: p.avatar_url,
            birth_date: p.birth_date,
            gender: p.gender,
            cpf: p.cpf.map(|c| c.formatted()),
            phone: p.phone.map(|ph| ph.as_str().to_string()),
            preferred_language: p.preferred_language,
            preferred_currency: p.preferred_currency,
            newsletter_subscribed: p.newsletter_subscribed,
            accepted_terms_at: p.accepted_terms_at,
            accepted_privacy_at: p.accepted_privacy_at,
            version: p.version,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
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

impl From<UpdateProfileRequest> for UpdateProfileInput {
    fn from(r: UpdateProfileRequest) -> Self {
        Self {
            first_name: r.first_name,
            last_name: r.last_name,
            display_name: r.display_name,
            birth_date: r.birth_date,
            gender: r.gender,
            cpf: r.cpf,
            phone: r.phone,
            preferred_language: r.preferred_language,
            preferred_currency: r.preferred_currency,
            newsletter_subscribed: r.newsletter_subscribed,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvatarRequest {
    pub avatar_url: String,
}

// ============================================================================
// Addresses
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressRequest {
    pub label: Option<String>,
    pub recipient_name: Option<String>,
    pub street: String,
    pub number: Option<String>,
    pub complement: Option<String>,
    pub neighborhood: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: Option<String>,
    pub ibge_code: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(default)]
    pub is_default: bool,
}

impl From<AddressRequest> for AddressInput {
    fn from(r: AddressRequest) -> Self {
        Self {
            draft: AddressDraft {
                label: r.label,
                recipient_name: r.recipient_name,
                street: r.street,
                number: r.number,
                complement: r.complement,
                neighborhood: r.neighborhood,
                city: r.city,
                state: r.state,
                postal_code: r.postal_code,
                country: r.country,
                ibge_code: r.ibge_code,
            },
            latitude: r.latitude,
            longitude: r.longitude,
            is_default: r.is_default,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingRequest {
    #[serde(default = "default_true")]
    pub is_billing_address: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressResponse {
    pub id: AddressId,
    pub label: Option<String>,
    pub recipient_name: Option<String>,
    pub street: String,
    pub number: Option<String>,
    pub complement: Option<String>,
    pub neighborhood: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub ibge_code: Option<String>,
    pub is_default: bool,
    pub is_billing_address: bool,
    pub formatted_address: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Address> for AddressResponse {
    fn from(a: Address) -> Self {
        Self {
            formatted_address: a.formatted(),
            id: a.id,
            label: a.label,
            recipient_name: a.recipient_name,
            street: a.street,
            number: a.number,
            complement: a.complement,
            neighborhood: a.neighborhood,
            city: a.city,
            state: a.state.as_str().to_string(),
            postal_code: a.postal_code.as_str().to_string(),
            country: a.country,
            latitude: a.latitude,
            longitude: a.longitude,
            ibge_code: a.ibge_code,
            is_default: a.is_default,
            is_billing_address: a.is_billing_address,
            created_at: a.created_at,
            updated_at: a.updated_at,
        }
    }
}

// ============================================================================
// Sessions / Login History
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub id: SessionId,
    pub device_id: Option<String>,
    pub device_name: Option<String>,
    pub device_type: DeviceType,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub is_current: bool,
    pub expires_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<SessionView> for SessionResponse {
    fn from(view: SessionView) -> Self {
        let s = view.session;
        Self {
            id: s.id,
            device_id: s.device_id,
            device_name: s.device_name,
            device_type: s.device_type,
            ip_address: s.ip_address,
            user_agent: s.user_agent,
            country: s.country,
            city: s.city,
            is_current: view.is_current,
            expires_at: s.expires_at,
            last_activity_at: s.last_activity_at,
            created_at: s.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevokedCountResponse {
    pub revoked: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginHistoryResponse {
    pub id: Uuid,
    pub provider: LoginProvider,
    pub success: bool,
    pub failure_reason: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub device_type: DeviceType,
    pub created_at: DateTime<Utc>,
}

impl From<LoginHistory> for LoginHistoryResponse {
    fn from(h: LoginHistory) -> Self {
        Self {
            id: h.id.into_uuid(),
            provider: h.provider,
            success: h.success,
            failure_reason: h.failure_reason,
            ip_address: h.ip_address,
            user_agent: h.user_agent,
            device_type: h.device_type,
            created_at: h.created_at,
        }
    }
}

// ============================================================================
// Notifications
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationQuery {
    #[serde(default)]
    pub unread_only: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationResponse {
    pub id: NotificationId,
    pub title: String,
    pub message: String,
    pub notification_type: NotificationType,
    pub reference_type: ReferenceType,
    pub reference_id: Option<Uuid>,
    pub action_url: Option<String>,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<Notification> for NotificationResponse {
    fn from(n: Notification) -> Self {
        Self {
            is_read: n.is_read(),
            id: n.id,
            title: n.title,
            message: n.message,
            notification_type: n.notification_type,
            reference_type: n.reference_type,
            reference_id: n.reference_id,
            action_url: n.action_url,
            read_at: n.read_at,
            created_at: n.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnreadCountResponse {
    pub count: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkedCountResponse {
    pub marked: usize,
}

// ============================================================================
// Notification Preferences
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesResponse {
    pub email_enabled: bool,
    pub push_enabled: bool,
    pub sms_enabled: bool,
    pub order_updates: bool,
    pub promotions: bool,
    pub price_drops: bool,
    pub back_in_stock: bool,
    pub newsletter: bool,
    pub updated_at: DateTime<Utc>,
}

impl From<NotificationPreference> for PreferencesResponse {
    fn from(p: NotificationPreference) -> Self {
        Self {
            email_enabled: p.email_enabled,
            push_enabled: p.push_enabled,
            sms_enabled: p.sms_enabled,
            order_updates: p.order_updates,
            promotions: p.promotions,
            price_drops: p.price_drops,
            back_in_stock: p.back_in_stock,
            newsletter: p.newsletter,
            updated_at: p.updated_at,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePreferencesRequest {
    pub email_enabled: Option<bool>,
    pub push_enabled: Option<bool>,
    pub sms_enabled: Option<bool>,
    pub order_updates: Option<bool>,
    pub promotions: Option<bool>,
    pub price_drops: Option<bool>,
    pub back_in_stock: Option<bool>,
    pub newsletter: Option<bool>,
}

impl From<UpdatePreferencesRequest> for PreferenceChanges {
    fn from(r: UpdatePreferencesRequest) -> Self {
        Self {
            email_enabled: r.email_enabled,
            push_enabled: r.push_enabled,
            sms_enabled: r.sms_enabled,
            order_updates: r.order_updates,
            promotions: r.promotions,
            price_drops: r.price_drops,
            back_in_stock: r.back_in_stock,
            newsletter: r.newsletter,
        }
    }
}

// ============================================================================
// Admin
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignRoleRequest {
    pub role: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RolesResponse {
    pub user_id: UserId,
    pub roles: Vec<String>,
}
