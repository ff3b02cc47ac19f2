//! Event handlers and the registry that routes messages to them
//!
//! Handlers are written against concrete event types (`EventHandler<E>`).
//! The registry erases the type so messages can be dispatched by their
//! persisted `event_type` string.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::event::OutboxEvent;
use crate::domain::message::OutboxMessage;

#[async_trait]
pub trait EventHandler<E: OutboxEvent>: Send + Sync {
    async fn handle(&self, event: E) -> anyhow::Result<()>;
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("No handler registered for event type '{0}'")]
    UnknownEventType(String),

    #[error("Failed to deserialize '{event_type}' payload: {source}")]
    Deserialize {
        event_type: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Handler {handler} failed: {error:#}")]
    Handler {
        handler: &'static str,
        error: anyhow::Error,
    },
}

impl DispatchError {
    /// Errors that no amount of retrying will fix
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            DispatchError::UnknownEventType(_) | DispatchError::Deserialize { .. }
        )
    }
}

/// Type-erased handler
#[async_trait]
trait DynEventHandler: Send + Sync {
    async fn handle_dyn(&self, payload: &serde_json::Value) -> Result<(), DispatchError>;
}

struct TypedEventHandler<E, H> {
    handler: H,
    _event: PhantomData<fn() -> E>,
}

#[async_trait]
impl<E, H> DynEventHandler for TypedEventHandler<E, H>
where
    E: OutboxEvent,
    H: EventHandler<E> + 'static,
{
    async fn handle_dyn(&self, payload: &serde_json::Value) -> Result<(), DispatchError> {
        let event: E =
            serde_json::from_value(payload.clone()).map_err(|source| DispatchError::Deserialize {
                event_type: E::EVENT_TYPE.to_string(),
                source,
            })?;

        self.handler
            .handle(event)
            .await
            .map_err(|error| DispatchError::Handler {
                handler: std::any::type_name::<H>(),
                error,
            })
    }
}

/// Maps event types to their handlers.
///
/// Built once at startup and shared read-only afterwards. An event type may
/// have several handlers; they run in registration order.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<&'static str, Vec<Arc<dyn DynEventHandler>>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<E, H>(&mut self, handler: H) -> &mut Self
    where
        E: OutboxEvent,
        H: EventHandler<E> + 'static,
    {
        let typed = TypedEventHandler {
            handler,
            _event: PhantomData,
        };
        self.handlers
            .entry(E::EVENT_TYPE)
            .or_default()
            .push(Arc::new(typed));
        self
    }

    pub fn handles(&self, event_type: &str) -> bool {
        self.handlers.contains_key(event_type)
    }

    pub fn handler_count(&self, event_type: &str) -> usize {
        self.handlers.get(event_type).map_or(0, Vec::len)
    }

    pub fn registered_types(&self) -> Vec<&'static str> {
        let mut types: Vec<_> = self.handlers.keys().copied().collect();
        types.sort_unstable();
        types
    }

    /// Run every handler registered for the message's type.
    ///
    /// Stops at the first failure. Handlers must tolerate being invoked
    /// again for the same message when it is retried.
    pub async fn dispatch(&self, message: &OutboxMessage) -> Result<(), DispatchError> {
        let handlers = self
            .handlers
            .get(message.event_type.as_str())
            .ok_or_else(|| DispatchError::UnknownEventType(message.event_type.clone()))?;

        for handler in handlers {
            handler.handle_dyn(&message.payload).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde::{Deserialize, Serialize};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Serialize, Deserialize)]
    struct Greeted {
        name: String,
    }

    impl OutboxEvent for Greeted {
        const EVENT_TYPE: &'static str = "test.greeted";
    }

    struct Counting(Arc<AtomicUsize>);

    #[async_trait]
    impl EventHandler<Greeted> for Counting {
        async fn handle(&self, event: Greeted) -> anyhow::Result<()> {
            assert_eq!(event.name, "ana");
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct Failing;

    #[async_trait]
    impl EventHandler<Greeted> for Failing {
        async fn handle(&self, _event: Greeted) -> anyhow::Result<()> {
            anyhow::bail!("smtp unavailable")
        }
    }

    fn greeted() -> OutboxMessage {
        OutboxMessage::from_event(&Greeted { name: "ana".into() }, Utc::now()).unwrap()
    }

    #[tokio::test]
    async fn dispatches_to_every_handler() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mut registry = HandlerRegistry::new();
        registry
            .register::<Greeted, _>(Counting(hits.clone()))
            .register::<Greeted, _>(Counting(hits.clone()));

        assert_eq!(registry.handler_count(Greeted::EVENT_TYPE), 2);
        registry.dispatch(&greeted()).await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn unknown_event_type_is_permanent() {
        let registry = HandlerRegistry::new();
        let err = registry.dispatch(&greeted()).await.unwrap_err();
        assert!(matches!(err, DispatchError::UnknownEventType(_)));
        assert!(err.is_permanent());
    }

    #[tokio::test]
    async fn bad_payload_is_permanent() {
        let mut registry = HandlerRegistry::new();
        registry.register::<Greeted, _>(Counting(Arc::new(AtomicUsize::new(0))));

        let mut msg = greeted();
        msg.payload = serde_json::json!({ "unexpected": true });
        let err = registry.dispatch(&msg).await.unwrap_err();
        assert!(matches!(err, DispatchError::Deserialize { .. }));
        assert!(err.is_permanent());
    }

    #[tokio::test]
    async fn handler_failure_is_retryable() {
        let mut registry = HandlerRegistry::new();
        registry.register::<Greeted, _>(Failing);

        let err = registry.dispatch(&greeted()).await.unwrap_err();
        assert!(!err.is_permanent());
        assert!(err.to_string().contains("smtp unavailable"));
    }

    #[test]
    fn lists_registered_types() {
        let mut registry = HandlerRegistry::new();
        registry.register::<Greeted, _>(Failing);
        assert!(registry.handles("test.greeted"));
        assert_eq!(registry.registered_types(), vec!["test.greeted"]);
    }
}
