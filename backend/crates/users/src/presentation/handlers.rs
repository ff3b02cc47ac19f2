//! HTTP Handlers

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Json;
use axum::extract::{ConnectInfo, FromRequestParts, Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header, request::Parts};
use axum::response::{IntoResponse, Response};
use kernel::id::{AddressId, NotificationId, SessionId, UserId};
use kernel::pagination::PageRequest;
use kernel::response::ApiResponse;
use platform::client::ClientInfo;
use platform::cookie::extract_cookie;
use platform::jwt::JwtService;

use crate::application::{
    AccountMailer, AddressUseCase, AdminUseCase, ChangePasswordInput, ChangePasswordUseCase,
    ConfirmEmailUseCase, ForgotPasswordUseCase, GetCurrentUserUseCase, LoginInput, LoginUseCase,
    LogoutUseCase, NotificationUseCase, PreferencesUseCase, ProfileAction, ProfileUseCase,
    RefreshInput, RefreshTokenUseCase, RegisterInput, RegisterUserUseCase,
    ResendConfirmationUseCase, ResetPasswordInput, ResetPasswordUseCase, SessionUseCase,
    UsersConfig,
};
use crate::domain::repository::UsersStore;
use crate::error::{UsersError, UsersResult};
use crate::presentation::dto::{
    AddressRequest, AddressResponse, AssignRoleRequest, AvatarRequest, BillingRequest,
    ChangePasswordRequest, CurrentUserResponse, EmailRequest, LoginHistoryResponse, LoginRequest,
    LogoutRequest, MarkedCountResponse, NotificationQuery, NotificationResponse,
    PreferencesResponse, ProfileResponse, RefreshRequest, RegisterRequest, RegisterResponse,
    ResetPasswordRequest, RevokedCountResponse, RolesResponse, SessionResponse, TokenRequest,
    TokenResponse, UnreadCountResponse, UpdatePreferencesRequest, UpdateProfileRequest,
};
use crate::presentation::middleware::CurrentUser;

/// Shared state for users handlers
pub struct UsersAppState<R>
where
    R: UsersStore,
{
    pub repo: Arc<R>,
    pub jwt: Arc<JwtService>,
    pub config: Arc<UsersConfig>,
    pub mailer: AccountMailer,
}

impl<R> Clone for UsersAppState<R>
where
    R: UsersStore,
{
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
            jwt: self.jwt.clone(),
            config: self.config.clone(),
            mailer: self.mailer.clone(),
        }
    }
}

/// Client IP and device, from headers and the peer address when known
pub struct Client(pub ClientInfo);

impl<S> FromRequestParts<S> for Client
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|info| info.0.ip());
        Ok(Client(ClientInfo::from_headers(&parts.headers, peer)))
    }
}

fn with_refresh_cookie(config: &UsersConfig, token: &str, mut response: Response) -> Response {
    if let Some(value) = config.cookie.set_header(token) {
        response.headers_mut().insert(header::SET_COOKIE, value);
    }
    response
}

fn refresh_token_from(
    config: &UsersConfig,
    headers: &HeaderMap,
    body: Option<String>,
) -> Option<String> {
    body.filter(|t| !t.trim().is_empty())
        .or_else(|| extract_cookie(headers, &config.cookie.name))
}

// ============================================================================
// Registration / Login
// ============================================================================

/// POST /api/auth/register
pub async fn register<R>(
    State(state): State<UsersAppState<R>>,
    Json(req): Json<RegisterRequest>,
) -> UsersResult<impl IntoResponse>
where
    R: UsersStore,
{
    let use_case = RegisterUserUseCase::new(state.repo.clone(), state.config.clone());
    let output = use_case
        .execute(RegisterInput {
            email: req.email,
            password: req.password,
            first_name: req.first_name,
            last_name: req.last_name,
            cpf: req.cpf,
            phone: req.phone,
            birth_date: req.birth_date,
            accept_terms: req.accept_terms,
            newsletter: req.newsletter,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        ApiResponse::ok(RegisterResponse {
            user_id: output.user_id,
            email: output.email,
        })
        .with_message("Registration successful. Check your email to confirm your account."),
    ))
}

/// POST /api/auth/login
pub async fn login<R>(
    State(state): State<UsersAppState<R>>,
    Client(client): Client,
    Json(req): Json<LoginRequest>,
) -> UsersResult<Response>
where
    R: UsersStore,
{
    let use_case = LoginUseCase::new(state.repo.clone(), state.jwt.clone(), state.config.clone());
    let output = use_case
        .execute(
            LoginInput {
                email: req.email,
                password: req.password,
                device_id: req.device_id,
                device_name: req.device_name,
            },
            client,
        )
        .await?;

    let refresh_token = output.tokens.refresh_token.clone();
    let response = ApiResponse::ok(TokenResponse::from(output)).into_response();
    Ok(with_refresh_cookie(&state.config, &refresh_token, response))
}

/// POST /api/auth/refresh
pub async fn refresh<R>(
    State(state): State<UsersAppState<R>>,
    headers: HeaderMap,
    body: Option<Json<RefreshRequest>>,
) -> UsersResult<Response>
where
    R: UsersStore,
{
    let req = body.map(|Json(r)| r).unwrap_or_default();
    let refresh_token = refresh_token_from(&state.config, &headers, req.refresh_token)
        .ok_or(UsersError::InvalidRefreshToken)?;

    let use_case = RefreshTokenUseCase::new(state.repo.clone(), state.jwt.clone());
    let tokens = use_case
        .execute(RefreshInput {
            access_token: req.access_token,
            refresh_token,
        })
        .await?;

    let refresh_token = tokens.refresh_token.clone();
    let response = ApiResponse::ok(TokenResponse::from(tokens)).into_response();
    Ok(with_refresh_cookie(&state.config, &refresh_token, response))
}

/// POST /api/auth/logout
pub async fn logout<R>(
    State(state): State<UsersAppState<R>>,
    headers: HeaderMap,
    body: Option<Json<LogoutRequest>>,
) -> UsersResult<Response>
where
    R: UsersStore,
{
    let body_token = body.and_then(|Json(r)| r.refresh_token);
    if let Some(token) = refresh_token_from(&state.config, &headers, body_token) {
        let use_case = LogoutUseCase::new(state.repo.clone(), state.jwt.clone());
        use_case.execute(&token).await?;
    }

    let mut response = ApiResponse::message_only("Logged out").into_response();
    if let Some(value) = state.config.cookie.delete_header() {
        response.headers_mut().insert(header::SET_COOKIE, value);
    }
    Ok(response)
}

// ============================================================================
// Email Confirmation / Password
// ============================================================================

/// POST /api/auth/confirm-email
pub async fn confirm_email<R>(
    State(state): State<UsersAppState<R>>,
    Json(req): Json<TokenRequest>,
) -> UsersResult<impl IntoResponse>
where
    R: UsersStore,
{
    ConfirmEmailUseCase::new(state.repo.clone(), state.config.clone())
        .execute(&req.token)
        .await?;
    Ok(ApiResponse::message_only("Email confirmed"))
}

/// POST /api/auth/resend-confirmation
pub async fn resend_confirmation<R>(
    State(state): State<UsersAppState<R>>,
    Json(req): Json<EmailRequest>,
) -> UsersResult<impl IntoResponse>
where
    R: UsersStore,
{
    ResendConfirmationUseCase::new(state.repo.clone(), state.mailer.clone())
        .execute(&req.email)
        .await?;
    Ok(ApiResponse::message_only(
        "If the email is registered, a confirmation link has been sent",
    ))
}

/// POST /api/auth/forgot-password
pub async fn forgot_password<R>(
    State(state): State<UsersAppState<R>>,
    Json(req): Json<EmailRequest>,
) -> UsersResult<impl IntoResponse>
where
    R: UsersStore,
{
    ForgotPasswordUseCase::new(state.repo.clone(), state.mailer.clone())
        .execute(&req.email)
        .await?;
    Ok(ApiResponse::message_only(
        "If the email is registered, a password reset link has been sent",
    ))
}

/// POST /api/auth/reset-password
pub async fn reset_password<R>(
    State(state): State<UsersAppState<R>>,
    Json(req): Json<ResetPasswordRequest>,
) -> UsersResult<impl IntoResponse>
where
    R: UsersStore,
{
    ResetPasswordUseCase::new(state.repo.clone(), state.config.clone())
        .execute(ResetPasswordInput {
            token: req.token,
            new_password: req.new_password,
        })
        .await?;
    Ok(ApiResponse::message_only("Password has been reset"))
}

/// POST /api/auth/change-password
pub async fn change_password<R>(
    State(state): State<UsersAppState<R>>,
    current: CurrentUser,
    Json(req): Json<ChangePasswordRequest>,
) -> UsersResult<impl IntoResponse>
where
    R: UsersStore,
{
    ChangePasswordUseCase::new(state.repo.clone(), state.config.clone())
        .execute(
            current.user_id,
            current.session_id,
            ChangePasswordInput {
                current_password: req.current_password,
                new_password: req.new_password,
            },
        )
        .await?;
    Ok(ApiResponse::message_only("Password changed"))
}

/// GET /api/auth/me
pub async fn me<R>(
    State(state): State<UsersAppState<R>>,
    current: CurrentUser,
) -> UsersResult<impl IntoResponse>
where
    R: UsersStore,
{
    let output = GetCurrentUserUseCase::new(state.repo.clone())
        .execute(current.user_id)
        .await?;
    Ok(ApiResponse::ok(CurrentUserResponse::from(output)))
}

// ============================================================================
// Profile
// ============================================================================

/// GET /api/users/me/profile
pub async fn get_profile<R>(
    State(state): State<UsersAppState<R>>,
    current: CurrentUser,
) -> UsersResult<impl IntoResponse>
where
    R: UsersStore,
{
    let profile = ProfileUseCase::new(state.repo.clone())
        .get(current.user_id)
        .await?;
    Ok(ApiResponse::ok(ProfileResponse::from(profile)))
}

/// PUT /api/users/me/profile
pub async fn update_profile<R>(
    State(state): State<UsersAppState<R>>,
    current: CurrentUser,
    Json(req): Json<UpdateProfileRequest>,
) -> UsersResult<impl IntoResponse>
where
    R: UsersStore,
{
    let profile = ProfileUseCase::new(state.repo.clone())
        .update(current.user_id, req.into())
        .await?;
    Ok(ApiResponse::ok(ProfileResponse::from(profile)).with_message("Profile updated"))
}

/// PUT /api/users/me/profile/avatar
pub async fn update_avatar<R>(
    State(state): State<UsersAppState<R>>,
    current: CurrentUser,
    Json(req): Json<AvatarRequest>,
) -> UsersResult<impl IntoResponse>
where
    R: UsersStore,
{
    let profile = ProfileUseCase::new(state.repo.clone())
        .update_avatar(current.user_id, &req.avatar_url)
        .await?;
    Ok(ApiResponse::ok(ProfileResponse::from(profile)))
}

/// POST /api/users/me/profile/accept-terms
pub async fn accept_terms<R>(
    State(state): State<UsersAppState<R>>,
    current: CurrentUser,
) -> UsersResult<impl IntoResponse>
where
    R: UsersStore,
{
    let profile = ProfileUseCase::new(state.repo.clone())
        .apply(current.user_id, ProfileAction::AcceptTerms)
        .await?;
    Ok(ApiResponse::ok(ProfileResponse::from(profile)))
}

/// POST /api/users/me/profile/accept-privacy
pub async fn accept_privacy<R>(
    State(state): State<UsersAppState<R>>,
    current: CurrentUser,
) -> UsersResult<impl IntoResponse>
where
    R: UsersStore,
{
    let profile = ProfileUseCase::new(state.repo.clone())
        .apply(current.user_id, ProfileAction::AcceptPrivacy)
        .await?;
    Ok(ApiResponse::ok(ProfileResponse::from(profile)))
}

/// DELETE /api/users/me
pub async fn delete_account<R>(
    State(state): State<UsersAppState<R>>,
    current: CurrentUser,
) -> UsersResult<Response>
where
    R: UsersStore,
{
    ProfileUseCase::new(state.repo.clone())
        .delete_account(current.user_id)
        .await?;

    let mut response = ApiResponse::message_only("Account deleted").into_response();
    if let Some(value) = state.config.cookie.delete_header() {
        response.headers_mut().insert(header::SET_COOKIE, value);
    }
    Ok(response)
}

// ============================================================================
// Addresses
// ============================================================================

/// GET /api/users/me/addresses
pub async fn list_addresses<R>(
    State(state): State<UsersAppState<R>>,
    current: CurrentUser,
) -> UsersResult<impl IntoResponse>
where
    R: UsersStore,
{
    let addresses = AddressUseCase::new(state.repo.clone(), state.config.clone())
        .list(current.user_id)
        .await?;
    Ok(ApiResponse::ok(
        addresses
            .into_iter()
            .map(AddressResponse::from)
            .collect::<Vec<_>>(),
    ))
}

/// POST /api/users/me/addresses
pub async fn create_address<R>(
    State(state): State<UsersAppState<R>>,
    current: CurrentUser,
    Json(req): Json<AddressRequest>,
) -> UsersResult<impl IntoResponse>
where
    R: UsersStore,
{
    let address = AddressUseCase::new(state.repo.clone(), state.config.clone())
        .create(current.user_id, req.into())
        .await?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::ok(AddressResponse::from(address)),
    ))
}

/// GET /api/users/me/addresses/{id}
pub async fn get_address<R>(
    State(state): State<UsersAppState<R>>,
    current: CurrentUser,
    Path(address_id): Path<AddressId>,
) -> UsersResult<impl IntoResponse>
where
    R: UsersStore,
{
    let address = AddressUseCase::new(state.repo.clone(), state.config.clone())
        .get(current.user_id, address_id)
        .await?;
    Ok(ApiResponse::ok(AddressResponse::from(address)))
}

/// PUT /api/users/me/addresses/{id}
pub async fn update_address<R>(
    State(state): State<UsersAppState<R>>,
    current: CurrentUser,
    Path(address_id): Path<AddressId>,
    Json(req): Json<AddressRequest>,
) -> UsersResult<impl IntoResponse>
where
    R: UsersStore,
{
    let address = AddressUseCase::new(state.repo.clone(), state.config.clone())
        .update(current.user_id, address_id, req.into())
        .await?;
    Ok(ApiResponse::ok(AddressResponse::from(address)))
}

/// DELETE /api/users/me/addresses/{id}
pub async fn delete_address<R>(
    State(state): State<UsersAppState<R>>,
    current: CurrentUser,
    Path(address_id): Path<AddressId>,
) -> UsersResult<impl IntoResponse>
where
    R: UsersStore,
{
    AddressUseCase::new(state.repo.clone(), state.config.clone())
        .delete(current.user_id, address_id)
        .await?;
    Ok(ApiResponse::message_only("Address deleted"))
}

/// POST /api/users/me/addresses/{id}/default
pub async fn set_default_address<R>(
    State(state): State<UsersAppState<R>>,
    current: CurrentUser,
    Path(address_id): Path<AddressId>,
) -> UsersResult<impl IntoResponse>
where
    R: UsersStore,
{
    let address = AddressUseCase::new(state.repo.clone(), state.config.clone())
        .set_default(current.user_id, address_id)
        .await?;
    Ok(ApiResponse::ok(AddressResponse::from(address)))
}

/// POST /api/users/me/addresses/{id}/billing
pub async fn set_billing_address<R>(
    State(state): State<UsersAppState<R>>,
    current: CurrentUser,
    Path(address_id): Path<AddressId>,
    body: Option<Json<BillingRequest>>,
) -> UsersResult<impl IntoResponse>
where
    R: UsersStore,
{
    let is_billing = body.is_none_or(|Json(r)| r.is_billing_address);
    let address = AddressUseCase::new(state.repo.clone(), state.config.clone())
        .set_billing(current.user_id, address_id, is_billing)
        .await?;
    Ok(ApiResponse::ok(AddressResponse::from(address)))
}

// ============================================================================
// Sessions / Login History
// ============================================================================

/// GET /api/users/me/sessions
pub async fn list_sessions<R>(
    State(state): State<UsersAppState<R>>,
    current: CurrentUser,
) -> UsersResult<impl IntoResponse>
where
    R: UsersStore,
{
    let sessions = SessionUseCase::new(state.repo.clone(), state.config.clone())
        .list(current.user_id, current.session_id)
        .await?;
    Ok(ApiResponse::ok(
        sessions
            .into_iter()
            .map(SessionResponse::from)
            .collect::<Vec<_>>(),
    ))
}

/// DELETE /api/users/me/sessions/{id}
pub async fn revoke_session<R>(
    State(state): State<UsersAppState<R>>,
    current: CurrentUser,
    Path(session_id): Path<SessionId>,
) -> UsersResult<impl IntoResponse>
where
    R: UsersStore,
{
    SessionUseCase::new(state.repo.clone(), state.config.clone())
        .revoke(current.user_id, session_id)
        .await?;
    Ok(ApiResponse::message_only("Session revoked"))
}

/// POST /api/users/me/sessions/revoke-others
pub async fn revoke_other_sessions<R>(
    State(state): State<UsersAppState<R>>,
    current: CurrentUser,
) -> UsersResult<impl IntoResponse>
where
    R: UsersStore,
{
    let revoked = SessionUseCase::new(state.repo.clone(), state.config.clone())
        .revoke_others(current.user_id, current.session_id)
        .await?;
    Ok(ApiResponse::ok(RevokedCountResponse { revoked }))
}

/// GET /api/users/me/login-history
pub async fn login_history<R>(
    State(state): State<UsersAppState<R>>,
    current: CurrentUser,
) -> UsersResult<impl IntoResponse>
where
    R: UsersStore,
{
    let entries = SessionUseCase::new(state.repo.clone(), state.config.clone())
        .login_history(current.user_id)
        .await?;
    Ok(ApiResponse::ok(
        entries
            .into_iter()
            .map(LoginHistoryResponse::from)
            .collect::<Vec<_>>(),
    ))
}

// ============================================================================
// Notifications
// ============================================================================

/// GET /api/users/me/notifications
pub async fn list_notifications<R>(
    State(state): State<UsersAppState<R>>,
    current: CurrentUser,
    Query(page): Query<PageRequest>,
    Query(filter): Query<NotificationQuery>,
) -> UsersResult<impl IntoResponse>
where
    R: UsersStore,
{
    let page = NotificationUseCase::new(state.repo.clone())
        .list(current.user_id, filter.unread_only, page)
        .await?;
    Ok(ApiResponse::ok(page.map(NotificationResponse::from)))
}

/// GET /api/users/me/notifications/unread-count
pub async fn unread_count<R>(
    State(state): State<UsersAppState<R>>,
    current: CurrentUser,
) -> UsersResult<impl IntoResponse>
where
    R: UsersStore,
{
    let count = NotificationUseCase::new(state.repo.clone())
        .unread_count(current.user_id)
        .await?;
    Ok(ApiResponse::ok(UnreadCountResponse { count }))
}

/// POST /api/users/me/notifications/{id}/read
pub async fn mark_notification_read<R>(
    State(state): State<UsersAppState<R>>,
    current: CurrentUser,
    Path(notification_id): Path<NotificationId>,
) -> UsersResult<impl IntoResponse>
where
    R: UsersStore,
{
    NotificationUseCase::new(state.repo.clone())
        .mark_read(current.user_id, notification_id)
        .await?;
    Ok(ApiResponse::message_only("Notification marked as read"))
}

/// POST /api/users/me/notifications/{id}/unread
pub async fn mark_notification_unread<R>(
    State(state): State<UsersAppState<R>>,
    current: CurrentUser,
    Path(notification_id): Path<NotificationId>,
) -> UsersResult<impl IntoResponse>
where
    R: UsersStore,
{
    NotificationUseCase::new(state.repo.clone())
        .mark_unread(current.user_id, notification_id)
        .await?;
    Ok(ApiResponse::message_only("Notification marked as unread"))
}

/// POST /api/users/me/notifications/read-all
pub async fn mark_all_notifications_read<R>(
    State(state): State<UsersAppState<R>>,
    current: CurrentUser,
) -> UsersResult<impl IntoResponse>
where
    R: UsersStore,
{
    let marked = NotificationUseCase::new(state.repo.clone())
        .mark_all_read(current.user_id)
        .await?;
    Ok(ApiResponse::ok(MarkedCountResponse { marked }))
}

// ============================================================================
// Notification Preferences
// ============================================================================

/// GET /api/users/me/notification-preferences
pub async fn get_preferences<R>(
    State(state): State<UsersAppState<R>>,
    current: CurrentUser,
) -> UsersResult<impl IntoResponse>
where
    R: UsersStore,
{
    let preferences = PreferencesUseCase::new(state.repo.clone())
        .get(current.user_id)
        .await?;
    Ok(ApiResponse::ok(PreferencesResponse::from(preferences)))
}

/// PUT /api/users/me/notification-preferences
pub async fn update_preferences<R>(
    State(state): State<UsersAppState<R>>,
    current: CurrentUser,
    Json(req): Json<UpdatePreferencesRequest>,
) -> UsersResult<impl IntoResponse>
where
    R: UsersStore,
{
    let preferences = PreferencesUseCase::new(state.repo.clone())
        .update(current.user_id, req.into())
        .await?;
    Ok(ApiResponse::ok(PreferencesResponse::from(preferences)))
}

// ============================================================================
// Admin
// ============================================================================

/// GET /api/admin/users/{id}/roles
pub async fn get_roles<R>(
    State(state): State<UsersAppState<R>>,
    Path(user_id): Path<UserId>,
) -> UsersResult<impl IntoResponse>
where
    R: UsersStore,
{
    let roles = AdminUseCase::new(state.repo.clone()).roles(user_id).await?;
    Ok(ApiResponse::ok(RolesResponse { user_id, roles }))
}

/// POST /api/admin/users/{id}/roles
pub async fn add_role<R>(
    State(state): State<UsersAppState<R>>,
    current: CurrentUser,
    Path(user_id): Path<UserId>,
    Json(req): Json<AssignRoleRequest>,
) -> UsersResult<impl IntoResponse>
where
    R: UsersStore,
{
    let roles = AdminUseCase::new(state.repo.clone())
        .add_role(current.user_id, user_id, &req.role)
        .await?;
    Ok(ApiResponse::ok(RolesResponse { user_id, roles }))
}

/// DELETE /api/admin/users/{id}/roles/{role}
pub async fn remove_role<R>(
    State(state): State<UsersAppState<R>>,
    current: CurrentUser,
    Path((user_id, role)): Path<(UserId, String)>,
) -> UsersResult<impl IntoResponse>
where
    R: UsersStore,
{
    let roles = AdminUseCase::new(state.repo.clone())
        .remove_role(current.user_id, user_id, &role)
        .await?;
    Ok(ApiResponse::ok(RolesResponse { user_id, roles }))
}

/// DELETE /api/admin/users/{id}
pub async fn delete_user<R>(
    State(state): State<UsersAppState<R>>,
    current: CurrentUser,
    Path(user_id): Path<UserId>,
) -> UsersResult<impl IntoResponse>
where
    R: UsersStore,
{
    AdminUseCase::new(state.repo.clone())
        .delete_user(current.user_id, user_id)
        .await?;
    Ok(ApiResponse::message_only("User deleted"))
}
