//! Domain Layer
//!
//! Entities, value objects, domain events and repository traits.

pub mod change_set;
pub mod entity;
pub mod event;
pub mod repository;
pub mod value_object;

pub use change_set::{ChangeSet, Op};
pub use event::UsersEvent;
