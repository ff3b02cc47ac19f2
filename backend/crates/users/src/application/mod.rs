//! Application Layer
//!
//! Use cases, outbox consumers and background jobs.

pub mod address;
pub mod admin;
pub mod config;
pub mod current_user;
pub mod email;
pub mod email_confirmation;
pub mod event_handlers;
pub mod jobs;
pub mod login;
pub mod logout;
pub mod notification;
pub mod password;
pub mod preferences;
pub mod profile;
pub mod refresh_token;
pub mod register;
pub mod session;
pub(crate) mod tokens;

// Re-exports
pub use address::{AddressInput, AddressUseCase};
pub use admin::AdminUseCase;
pub use config::UsersConfig;
pub use current_user::{CurrentUserOutput, GetCurrentUserUseCase, ProfileSummary};
pub use email::{AccountMailer, EmailMessage, EmailSender, LoggingEmailSender};
pub use email_confirmation::{ConfirmEmailUseCase, ResendConfirmationUseCase};
pub use event_handlers::register_handlers;
pub use jobs::ExpiredSessionCleanupJob;
pub use login::{LoginInput, LoginOutput, LoginUseCase};
pub use logout::LogoutUseCase;
pub use notification::NotificationUseCase;
pub use password::{
    ChangePasswordInput, ChangePasswordUseCase, ForgotPasswordUseCase, ResetPasswordInput,
    ResetPasswordUseCase,
};
pub use preferences::PreferencesUseCase;
pub use profile::{ProfileAction, ProfileUseCase, UpdateProfileInput};
pub use refresh_token::{RefreshInput, RefreshTokenUseCase};
pub use register::{RegisterInput, RegisterOutput, RegisterUserUseCase};
pub use session::{SessionUseCase, SessionView};
pub use tokens::AuthTokens;
