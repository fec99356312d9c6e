//! Event envelope carrying a marshaled context
//!
//! Wraps an event body with metadata and the flat context map, so request
//! metadata survives a queue, log sink or event store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::context::Context;
use crate::error::ContextError;
use crate::registry::ContextRegistry;
use crate::value::ContextValues;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Unique event ID for tracking
    pub event_id: Uuid,

    pub event_type: String,

    /// Raw event body
    pub body: String,

    /// Marshaled context values
    #[serde(default)]
    pub context: ContextValues,

    /// Timestamp when the envelope was created
    pub created_at: DateTime<Utc>,

    /// Number of redeliveries after the first attempt
    #[serde(default)]
    pub retry_count: u32,
}

impl EventEnvelope {
    /// Create a new envelope with an empty context map
    pub fn new(event_type: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            event_type: event_type.into(),
            body: body.into(),
            context: ContextValues::new(),
            created_at: Utc::now(),
            retry_count: 0,
        }
    }

    /// Attach `ctx`, marshaled through `registry`, replacing any earlier map.
    pub fn with_context(mut self, registry: &ContextRegistry, ctx: &Context) -> Self {
        self.context = registry.marshal(ctx);
        tracing::debug!(
            event_id = %self.event_id,
            keys = self.context.len(),
            "Attached context to envelope"
        );
        self
    }

    /// Copy of this envelope for redelivery.
    ///
    /// Keeps the event ID and context so the retry stays correlated with the
    /// original attempt.
    pub fn next_attempt(&self) -> Self {
        let retry = Self {
            retry_count: self.retry_count.saturating_add(1),
            ..self.clone()
        };
        tracing::debug!(
            event_id = %retry.event_id,
            retry_count = retry.retry_count,
            "Envelope scheduled for redelivery"
        );
        retry
    }

    /// Rebuild the carried context through `registry`.
    pub fn context(&self, registry: &ContextRegistry) -> Context {
        registry.unmarshal(&self.context)
    }

    pub fn to_json_bytes(&self) -> Result<Vec<u8>, ContextError> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self, ContextError> {
        let envelope: Self = serde_json::from_slice(bytes)?;
        tracing::debug!(
            event_id = %envelope.event_id,
            event_type = %envelope.event_type,
            "Decoded envelope"
        );
        Ok(envelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespace::{namespace, with_namespace, NamespaceCodec, NAMESPACE_WIRE_KEY};
    use crate::registry::RegistryBuilder;
    use serde_json::json;

    fn registry() -> ContextRegistry {
        let mut builder = RegistryBuilder::new();
        builder.register_codec(NamespaceCodec);
        builder.build()
    }

    #[test]
    fn test_new_envelope_has_empty_context() {
        let envelope = EventEnvelope::new("OrderPlaced", "{}");
        assert!(envelope.context.is_empty());
        assert_eq!(envelope.retry_count, 0);
    }

    #[test]
    fn test_context_survives_json_transport() {
        let registry = registry();
        let ctx = with_namespace(&Context::background(), "tenant-a");

        let envelope = EventEnvelope::new("OrderPlaced", r#"{"order":1}"#).with_context(&registry, &ctx);
        let bytes = envelope.to_json_bytes().unwrap();
        let decoded = EventEnvelope::from_json_bytes(&bytes).unwrap();

        assert_eq!(decoded, envelope);
        assert_eq!(namespace(&decoded.context(&registry)), "tenant-a");
    }

    #[test]
    fn test_context_is_flat_on_the_wire() {
        let registry = registry();
        let ctx = with_namespace(&Context::background(), "tenant-a");
        let envelope = EventEnvelope::new("OrderPlaced", "").with_context(&registry, &ctx);

        let json: serde_json::Value = serde_json::from_slice(&envelope.to_json_bytes().unwrap()).unwrap();
        assert_eq!(json["context"], json!({NAMESPACE_WIRE_KEY: "tenant-a"}));
    }

    #[test]
    fn test_missing_context_field_defaults() {
        let bytes = serde_json::to_vec(&json!({
            "event_id": "67e55044-10b1-426f-9247-bb680e5fe0c8",
            "event_type": "OrderPlaced",
            "body": "",
            "created_at": "2024-01-01T00:00:00Z"
        }))
        .unwrap();

        let envelope = EventEnvelope::from_json_bytes(&bytes).unwrap();
        assert!(envelope.context.is_empty());
        assert!(envelope.context(&registry()).is_empty());
    }

    #[test]
    fn test_next_attempt_keeps_identity_and_context() {
        let registry = registry();
        let ctx = with_namespace(&Context::background(), "tenant-a");
        let envelope = EventEnvelope::new("OrderPlaced", "{}").with_context(&registry, &ctx);

        let retry = envelope.next_attempt().next_attempt();
        assert_eq!(retry.retry_count, 2);
        assert_eq!(retry.event_id, envelope.event_id);
        assert_eq!(retry.context, envelope.context);
        assert_eq!(envelope.retry_count, 0);

        let decoded = EventEnvelope::from_json_bytes(&retry.to_json_bytes().unwrap()).unwrap();
        assert_eq!(decoded.retry_count, 2);
        assert_eq!(namespace(&decoded.context(&registry)), "tenant-a");
    }

    #[test]
    fn test_invalid_json() {
        let result = EventEnvelope::from_json_bytes(b"not json");
        assert!(matches!(result, Err(ContextError::JsonError(_))));
    }
}
