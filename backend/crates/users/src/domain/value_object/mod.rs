//! Value Object Module

pub mod cpf;
pub mod email;
pub mod enums;
pub mod permission;
pub mod phone;
pub mod postal_code;
pub mod role;
pub mod state_code;

pub use cpf::Cpf;
pub use email::Email;
pub use enums::{Gender, LoginProvider, NotificationType, ReferenceType};
pub use phone::Phone;
pub use platform::client::DeviceType;
pub use postal_code::PostalCode;
pub use role::Role;
pub use state_code::StateCode;
