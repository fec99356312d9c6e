//! Built-in context values: namespace and minimum version.
//!
//! Neither is registered automatically. Register [`NamespaceCodec`] and
//! [`MinVersionCodec`] at startup to propagate them.

use crate::context::{Context, ContextKey};
use crate::registry::ContextCodec;
use crate::value::WireValue;

/// Namespace reported when none is set on the context.
pub const DEFAULT_NAMESPACE: &str = "default";

pub const NAMESPACE_WIRE_KEY: &str = "eh_namespace";
pub const MIN_VERSION_WIRE_KEY: &str = "eh_min_version";

struct NamespaceKey;

impl ContextKey for NamespaceKey {
    type Value = String;
    const NAME: &'static str = "namespace";
}

struct MinVersionKey;

impl ContextKey for MinVersionKey {
    type Value = i64;
    const NAME: &'static str = "min_version";
}

pub fn with_namespace(ctx: &Context, namespace: impl Into<String>) -> Context {
    ctx.with_value::<NamespaceKey>(namespace.into())
}

/// Namespace of the context, [`DEFAULT_NAMESPACE`] when unset.
pub fn namespace(ctx: &Context) -> String {
    ctx.value::<NamespaceKey>()
        .cloned()
        .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string())
}

/// Set the minimum aggregate or projection version a reader must observe.
pub fn with_min_version(ctx: &Context, min_version: i64) -> Context {
    ctx.with_value::<MinVersionKey>(min_version)
}

pub fn min_version(ctx: &Context) -> Option<i64> {
    ctx.value::<MinVersionKey>().copied()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NamespaceCodec;

impl ContextCodec for NamespaceCodec {
    fn wire_key(&self) -> &str {
        NAMESPACE_WIRE_KEY
    }

    // Only an explicitly set namespace travels; the default is implied
    fn extract(&self, ctx: &Context) -> Option<WireValue> {
        ctx.value::<NamespaceKey>().cloned().map(WireValue::String)
    }

    fn inject(&self, ctx: &Context, value: &WireValue) -> Option<Context> {
        value.as_str().map(|ns| with_namespace(ctx, ns))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MinVersionCodec;

impl ContextCodec for MinVersionCodec {
    fn wire_key(&self) -> &str {
        MIN_VERSION_WIRE_KEY
    }

    fn extract(&self, ctx: &Context) -> Option<WireValue> {
        min_version(ctx).map(WireValue::Int)
    }

    fn inject(&self, ctx: &Context, value: &WireValue) -> Option<Context> {
        value.as_i64().map(|version| with_min_version(ctx, version))
    }
}
