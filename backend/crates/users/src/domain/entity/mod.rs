//! Entity Module

pub mod address;
pub mod login_history;
pub mod notification;
pub mod notification_preference;
pub mod profile;
pub mod session;
pub mod user;

pub use address::{Address, AddressDraft};
pub use login_history::LoginHistory;
pub use notification::{NewNotification, Notification};
pub use notification_preference::{NotificationPreference, PreferenceChanges};
pub use profile::{Profile, ProfileChanges};
pub use session::{Session, SessionDevice};
pub use user::User;
