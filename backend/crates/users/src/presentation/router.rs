//! Users Router

use axum::{
    Router,
    body::Body,
    http::Request,
    middleware::{self, Next},
    routing::{delete, get, post, put},
};

use crate::domain::repository::UsersStore;
use crate::domain::value_object::permission;
use crate::presentation::handlers::{self, UsersAppState};
use crate::presentation::middleware::{require_auth, require_permission};

/// `/auth` routes; `change-password` and `me` require an access token
pub fn auth_router<R>(state: UsersAppState<R>) -> Router
where
    R: UsersStore,
{
    let protected = Router::new()
        .route("/change-password", post(handlers::change_password::<R>))
        .route("/me", get(handlers::me::<R>))
        .route_layer(middleware::from_fn_with_state(
            state.jwt.clone(),
            require_auth,
        ));

    Router::new()
        .route("/register", post(handlers::register::<R>))
        .route("/login", post(handlers::login::<R>))
        .route("/refresh", post(handlers::refresh::<R>))
        .route("/logout", post(handlers::logout::<R>))
        .route("/confirm-email", post(handlers::confirm_email::<R>))
        .route("/resend-confirmation", post(handlers::resend_confirmation::<R>))
        .route("/forgot-password", post(handlers::forgot_password::<R>))
        .route("/reset-password", post(handlers::reset_password::<R>))
        .merge(protected)
        .with_state(state)
}

/// `/users/me` routes, all authenticated
pub fn me_router<R>(state: UsersAppState<R>) -> Router
where
    R: UsersStore,
{
    Router::new()
        .route("/", delete(handlers::delete_account::<R>))
        // Profile
        .route(
            "/profile",
            get(handlers::get_profile::<R>).put(handlers::update_profile::<R>),
        )
        .route("/profile/avatar", put(handlers::update_avatar::<R>))
        .route("/profile/accept-terms", post(handlers::accept_terms::<R>))
        .route("/profile/accept-privacy", post(handlers::accept_privacy::<R>))
        // Addresses
        .route(
            "/addresses",
            get(handlers::list_addresses::<R>).post(handlers::create_address::<R>),
        )
        .route(
            "/addresses/{id}",
            get(handlers::get_address::<R>)
                .put(handlers::update_address::<R>)
                .delete(handlers::delete_address::<R>),
        )
        .route(
            "/addresses/{id}/default",
            post(handlers::set_default_address::<R>),
        )
        .route(
            "/addresses/{id}/billing",
            post(handlers::set_billing_address::<R>),
        )
        // Sessions
        .route("/sessions", get(handlers::list_sessions::<R>))
        .route("/sessions/{id}", delete(handlers::revoke_session::<R>))
        .route(
            "/sessions/revoke-others",
            post(handlers::revoke_other_sessions::<R>),
        )
        .route("/login-history", get(handlers::login_history::<R>))
        // Notifications
        .route("/notifications", get(handlers::list_notifications::<R>))
        .route(
            "/notifications/unread-count",
            get(handlers::unread_count::<R>),
        )
        .route(
            "/notifications/read-all",
            post(handlers::mark_all_notifications_read::<R>),
        )
        .route(
            "/notifications/{id}/read",
            post(handlers::mark_notification_read::<R>),
        )
        .route(
            "/notifications/{id}/unread",
            post(handlers::mark_notification_unread::<R>),
        )
        // Preferences
        .route(
            "/notification-preferences",
            get(handlers::get_preferences::<R>).put(handlers::update_preferences::<R>),
        )
        .route_layer(middleware::from_fn_with_state(
            state.jwt.clone(),
            require_auth,
        ))
        .with_state(state)
}

/// `/admin` routes, gated by permission
pub fn admin_router<R>(state: UsersAppState<R>) -> Router
where
    R: UsersStore,
{
    let roles = Router::new()
        .route(
            "/users/{id}/roles",
            get(handlers::get_roles::<R>).post(handlers::add_role::<R>),
        )
        .route(
            "/users/{id}/roles/{role}",
            delete(handlers::remove_role::<R>),
        )
        .route_layer(middleware::from_fn(
            |req: Request<Body>, next: Next| async move {
                require_permission(permission::users::MANAGE_ROLES, req, next).await
            },
        ));

    let users = Router::new()
        .route("/users/{id}", delete(handlers::delete_user::<R>))
        .route_layer(middleware::from_fn(
            |req: Request<Body>, next: Next| async move {
                require_permission(permission::users::DELETE, req, next).await
            },
        ));

    roles
        .merge(users)
        .route_layer(middleware::from_fn_with_state(
            state.jwt.clone(),
            require_auth,
        ))
        .with_state(state)
}

/// All users routes: `/auth`, `/users/me` and `/admin`
pub fn users_router<R>(state: UsersAppState<R>) -> Router
where
    R: UsersStore,
{
    Router::new()
        .nest("/auth", auth_router(state.clone()))
        .nest("/users/me", me_router(state.clone()))
        .nest("/admin", admin_router(state))
}
