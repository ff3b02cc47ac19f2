//! Events that can travel through the outbox

use serde::{Serialize, de::DeserializeOwned};

/// A serializable domain event with a stable type name.
///
/// `EVENT_TYPE` is persisted with every message and used to route it to
/// handlers, so it must not change once messages exist.
pub trait OutboxEvent: Serialize + DeserializeOwned + Send + Sync + 'static {
    const EVENT_TYPE: &'static str;
}
