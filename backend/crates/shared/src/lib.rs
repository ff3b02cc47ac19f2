//! Kernel
//!
//! Vocabulary every bounded context agrees on: [`error::app_error::AppError`]
//! and its HTTP mapping, typed ids, pagination and the response envelope.
//! Nothing here knows about users or the outbox.

pub mod error {
    pub mod app_error;
    pub mod conversions;
    pub mod kind;
}
pub mod id;
pub mod pagination;
pub mod response;
