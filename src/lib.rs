//! # ctxwire: Context Propagation for Event-Driven Systems
//!
//! ctxwire converts strongly-typed, request-scoped context values into a flat,
//! string-keyed map that can travel with an event across a queue, log sink or
//! event store, and rebuilds an equivalent context on the receiving side.
//!
//! ## Features
//!
//! - **Immutable context**: [`Context`] bindings are typed by key and never mutated in place
//! - **Ordered registries**: marshalers and unmarshalers run in registration order
//! - **Freeze after startup**: [`RegistryBuilder::build`] yields an immutable, shareable [`ContextRegistry`]
//! - **Process-wide registry**: free functions mirroring the registry for scattered startup code
//! - **Codecs**: [`ContextCodec`] describes both directions of one propagated value
//! - **Envelope**: [`EventEnvelope`] carries the marshaled map as JSON
//!
//! ## Example
//!
//! ```
//! use ctxwire::{Context, RegistryBuilder};
//! use ctxwire::namespace::{namespace, with_namespace, NamespaceCodec};
//!
//! let mut builder = RegistryBuilder::new();
//! builder.register_codec(NamespaceCodec);
//! let registry = builder.build();
//!
//! let ctx = with_namespace(&Context::background(), "tenant-a");
//! let vals = registry.marshal(&ctx);
//!
//! let restored = registry.unmarshal(&vals);
//! assert_eq!(namespace(&restored), "tenant-a");
//! ```

// Core modules
pub mod context;
pub mod value;
pub mod registry;

// Process-wide registry
pub mod global;

pub mod config;
pub mod error;

// Built-in context values
pub mod namespace;

// Transport envelope
pub mod envelope;

#[cfg(test)]
mod test_support;

// Re-export key types
pub use context::{Context, ContextKey};
pub use value::{ContextValues, WireValue};
pub use registry::{
    ContextCodec, ContextMarshaler, ContextRegistry, ContextUnmarshaler, RegistryBuilder,
};
pub use global::{
    configure_global_registry, context_marshaler_count, context_unmarshaler_count,
    marshal_context, register_context_codec, register_context_marshaler,
    register_context_unmarshaler, unmarshal_context,
};
pub use config::RegistryConfig;
pub use error::ContextError;
pub use envelope::EventEnvelope;
