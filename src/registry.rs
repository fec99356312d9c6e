//! Marshal and unmarshal registries.
//!
//! A [`RegistryBuilder`] accumulates marshal and unmarshal functions during
//! startup. [`RegistryBuilder::build`] freezes them into a [`ContextRegistry`],
//! which is immutable, cheap to clone and safe to share across threads. No
//! registration can happen after the freeze, so every marshal or unmarshal
//! call sees the complete function lists.

use std::sync::Arc;

use crate::config::RegistryConfig;
use crate::context::Context;
use crate::value::{ContextValues, WireValue};

/// Copies the value(s) it recognizes from a context into the output map.
///
/// Implementations must write nothing when their value is absent from the
/// context.
pub trait ContextMarshaler: Send + Sync {
    fn marshal(&self, ctx: &Context, vals: &mut ContextValues);
}

impl<F> ContextMarshaler for F
where
    F: Fn(&Context, &mut ContextValues) + Send + Sync,
{
    fn marshal(&self, ctx: &Context, vals: &mut ContextValues) {
        self(ctx, vals)
    }
}

/// Installs the value(s) it recognizes from a map into a context.
///
/// Implementations must return `ctx` unchanged when their wire key is absent
/// from the map.
pub trait ContextUnmarshaler: Send + Sync {
    fn unmarshal(&self, ctx: Context, vals: &ContextValues) -> Context;
}

impl<F> ContextUnmarshaler for F
where
    F: Fn(Context, &ContextValues) -> Context + Send + Sync,
{
    fn unmarshal(&self, ctx: Context, vals: &ContextValues) -> Context {
        self(ctx, vals)
    }
}

/// One propagated value kind, described by both of its directions.
///
/// Registering a codec installs a marshaler that writes only when
/// [`extract`](ContextCodec::extract) returns a value, and an unmarshaler
/// that calls [`inject`](ContextCodec::inject) only when the wire key is
/// present. The absence rules are therefore enforced by the registry rather
/// than by each implementation.
pub trait ContextCodec: Send + Sync {
    /// Key under which the value travels in the wire map
    fn wire_key(&self) -> &str;

    /// Read the value from the context, `None` when absent.
    fn extract(&self, ctx: &Context) -> Option<WireValue>;

    /// Bind a decoded wire value onto the context.
    ///
    /// Returning `None` (e.g. the wire value has the wrong type) leaves the
    /// context as it was.
    fn inject(&self, ctx: &Context, value: &WireValue) -> Option<Context>;
}

struct CodecMarshaler<C>(Arc<C>);

impl<C: ContextCodec> ContextMarshaler for CodecMarshaler<C> {
    fn marshal(&self, ctx: &Context, vals: &mut ContextValues) {
        if let Some(value) = self.0.extract(ctx) {
            vals.insert(self.0.wire_key().to_string(), value);
        }
    }
}

struct CodecUnmarshaler<C>(Arc<C>);

impl<C: ContextCodec> ContextUnmarshaler for CodecUnmarshaler<C> {
    fn unmarshal(&self, ctx: Context, vals: &ContextValues) -> Context {
        match vals.get(self.0.wire_key()) {
            Some(value) => self.0.inject(&ctx, value).unwrap_or(ctx),
            None => ctx,
        }
    }
}

/// Append-only accumulator for marshal and unmarshal functions.
#[derive(Default)]
pub struct RegistryBuilder {
    config: RegistryConfig,
    marshalers: Vec<Arc<dyn ContextMarshaler>>,
    unmarshalers: Vec<Arc<dyn ContextUnmarshaler>>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Append a marshal function.
    ///
    /// # Example
    ///
    /// ```
    /// use ctxwire::{Context, ContextKey, ContextValues, RegistryBuilder};
    ///
    /// struct TraceKey;
    /// impl ContextKey for TraceKey {
    ///     type Value = String;
    ///     const NAME: &'static str = "trace";
    /// }
    ///
    /// let mut builder = RegistryBuilder::new();
    /// builder.register_marshaler(|ctx: &Context, vals: &mut ContextValues| {
    ///     if let Some(trace) = ctx.value::<TraceKey>() {
    ///         vals.insert("trace_id".to_string(), trace.as_str().into());
    ///     }
    /// });
    /// assert_eq!(builder.marshaler_count(), 1);
    /// ```
    pub fn register_marshaler<M>(&mut self, marshaler: M) -> &mut Self
    where
        M: ContextMarshaler + 'static,
    {
        self.marshalers.push(Arc::new(marshaler));
        self
    }

    /// Append an unmarshal function.
    pub fn register_unmarshaler<U>(&mut self, unmarshaler: U) -> &mut Self
    where
        U: ContextUnmarshaler + 'static,
    {
        self.unmarshalers.push(Arc::new(unmarshaler));
        self
    }

    /// Append both directions of a codec.
    pub fn register_codec<C>(&mut self, codec: C) -> &mut Self
    where
        C: ContextCodec + 'static,
    {
        let codec = Arc::new(codec);
        self.register_marshaler(CodecMarshaler(Arc::clone(&codec)));
        self.register_unmarshaler(CodecUnmarshaler(codec))
    }

    pub fn marshaler_count(&self) -> usize {
        self.marshalers.len()
    }

    pub fn unmarshaler_count(&self) -> usize {
        self.unmarshalers.len()
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub(crate) fn set_config(&mut self, config: RegistryConfig) {
        self.config = config;
    }

    /// Freeze the accumulated functions into a shareable registry.
    pub fn build(self) -> ContextRegistry {
        tracing::debug!(
            marshalers = self.marshalers.len(),
            unmarshalers = self.unmarshalers.len(),
            "Context registry built"
        );

        ContextRegistry {
            config: self.config,
            marshalers: self.marshalers.into(),
            unmarshalers: self.unmarshalers.into(),
        }
    }
}

/// Frozen, ordered marshal and unmarshal function lists.
#[derive(Clone)]
pub struct ContextRegistry {
    config: RegistryConfig,
    marshalers: Arc<[Arc<dyn ContextMarshaler>]>,
    unmarshalers: Arc<[Arc<dyn ContextUnmarshaler>]>,
}

impl ContextRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Registry with no functions: marshal yields `{}`, unmarshal yields the
    /// background context.
    pub fn empty() -> Self {
        RegistryBuilder::new().build()
    }

    /// Convert a context into a fresh flat map.
    ///
    /// Every marshaler runs in registration order against the same output
    /// map, so later marshalers see (and may replace) earlier entries. When
    /// two marshalers write the same wire key, the later one wins.
    pub fn marshal(&self, ctx: &Context) -> ContextValues {
        let mut vals = ContextValues::new();

        for (index, marshaler) in self.marshalers.iter().enumerate() {
            if !self.config.warn_on_key_collision {
                marshaler.marshal(ctx, &mut vals);
                continue;
            }

            // Snapshot only to attribute overwrites; the marshaler still
            // writes into the shared map
            let before = vals.clone();
            marshaler.marshal(ctx, &mut vals);
            for (key, previous) in &before {
                if vals.get(key).is_some_and(|current| current != previous) {
                    tracing::warn!(wire_key = %key, marshaler = index, "Context wire key overwritten");
                }
            }
        }

        tracing::debug!(marshalers = self.marshalers.len(), keys = vals.len(), "Context marshaled");
        vals
    }

    /// Rebuild a context from a map, starting at the background context.
    pub fn unmarshal(&self, vals: &ContextValues) -> Context {
        self.unmarshal_into(Context::background(), vals)
    }

    /// Rebuild a context from a map on top of an existing context.
    ///
    /// Each unmarshaler's output becomes the next one's input.
    pub fn unmarshal_into(&self, base: Context, vals: &ContextValues) -> Context {
        let ctx = self
            .unmarshalers
            .iter()
            .fold(base, |ctx, unmarshaler| unmarshaler.unmarshal(ctx, vals));

        tracing::debug!(unmarshalers = self.unmarshalers.len(), keys = vals.len(), "Context unmarshaled");
        ctx
    }

    pub fn marshaler_count(&self) -> usize {
        self.marshalers.len()
    }

    pub fn unmarshaler_count(&self) -> usize {
        self.unmarshalers.len()
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Reopen the registry for further registration.
    ///
    /// The returned builder shares the registered functions; `self` is
    /// unaffected.
    pub fn to_builder(&self) -> RegistryBuilder {
        RegistryBuilder {
            config: self.config.clone(),
            marshalers: self.marshalers.to_vec(),
            unmarshalers: self.unmarshalers.to_vec(),
        }
    }
}

impl Default for ContextRegistry {
    fn default() -> Self {
        Self::empty()
    }
}
