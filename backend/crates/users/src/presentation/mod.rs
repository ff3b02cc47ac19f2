//! HTTP surface of the users context

pub mod dto;
pub mod handlers;
pub mod middleware;
pub mod router;

pub use handlers::UsersAppState;
pub use middleware::{CurrentUser, require_auth, require_permission};
pub use router::{admin_router, auth_router, me_router, users_router};
