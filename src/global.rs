//! Process-wide context registry.
//!
//! Free-function counterpart of [`ContextRegistry`] for applications that
//! register marshalers from scattered startup code. Each registration swaps
//! in a new frozen registry under a write lock; conversions clone the current
//! registry under a read lock and release it before any registered function
//! runs. Registered functions may therefore call back into this module,
//! including `marshal_context` and the registration functions.
//!
//! A registration that arrives after the first conversion is logged, or
//! rejected with `strict_registration`. Conversions already in flight keep
//! the registry they started with.
//!
//! Prefer building a [`ContextRegistry`] explicitly when one owner can
//! construct it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{OnceLock, RwLock, RwLockWriteGuard};

use crate::config::RegistryConfig;
use crate::context::Context;
use crate::error::ContextError;
use crate::registry::{
    ContextCodec, ContextMarshaler, ContextRegistry, ContextUnmarshaler, RegistryBuilder,
};
use crate::value::ContextValues;

struct GlobalRegistry {
    registry: RwLock<ContextRegistry>,
    used: AtomicBool,
}

fn global() -> &'static GlobalRegistry {
    static REGISTRY: OnceLock<GlobalRegistry> = OnceLock::new();
    REGISTRY.get_or_init(|| GlobalRegistry {
        registry: RwLock::new(ContextRegistry::empty()),
        used: AtomicBool::new(false),
    })
}

// The registry is replaced wholesale, so a panic while holding the lock
// cannot leave it half-updated.
fn snapshot() -> ContextRegistry {
    global()
        .registry
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone()
}

fn write() -> RwLockWriteGuard<'static, ContextRegistry> {
    global().registry.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn check_late(registry: &ContextRegistry, kind: &'static str) -> Result<(), ContextError> {
    if !global().used.load(Ordering::Acquire) {
        return Ok(());
    }
    if registry.config().strict_registration {
        tracing::error!(kind, "Rejected context registration after first use");
        return Err(ContextError::LateRegistration { kind });
    }
    tracing::warn!(kind, "Context registration after first use");
    Ok(())
}

fn register_with(
    kind: &'static str,
    register: impl FnOnce(&mut RegistryBuilder),
) -> Result<(), ContextError> {
    let mut registry = write();
    check_late(&registry, kind)?;
    let mut builder = registry.to_builder();
    register(&mut builder);
    *registry = builder.build();
    Ok(())
}

/// Replace the process-wide registry policy.
///
/// Registered functions are kept.
pub fn configure_global_registry(config: RegistryConfig) {
    let mut registry = write();
    let mut builder = registry.to_builder();
    builder.set_config(config);
    *registry = builder.build();
}

/// Append a marshal function to the process-wide registry.
pub fn register_context_marshaler<M>(marshaler: M) -> Result<(), ContextError>
where
    M: ContextMarshaler + 'static,
{
    register_with("marshaler", |builder| {
        builder.register_marshaler(marshaler);
    })
}

/// Append an unmarshal function to the process-wide registry.
pub fn register_context_unmarshaler<U>(unmarshaler: U) -> Result<(), ContextError>
where
    U: ContextUnmarshaler + 'static,
{
    register_with("unmarshaler", |builder| {
        builder.register_unmarshaler(unmarshaler);
    })
}

/// Append both directions of a codec to the process-wide registry.
pub fn register_context_codec<C>(codec: C) -> Result<(), ContextError>
where
    C: ContextCodec + 'static,
{
    register_with("codec", |builder| {
        builder.register_codec(codec);
    })
}

/// Marshal `ctx` with every process-wide marshaler.
pub fn marshal_context(ctx: &Context) -> ContextValues {
    global().used.store(true, Ordering::Release);
    snapshot().marshal(ctx)
}

/// Unmarshal `vals` with every process-wide unmarshaler.
pub fn unmarshal_context(vals: &ContextValues) -> Context {
    global().used.store(true, Ordering::Release);
    snapshot().unmarshal(vals)
}

pub fn context_marshaler_count() -> usize {
    snapshot().marshaler_count()
}

pub fn context_unmarshaler_count() -> usize {
    snapshot().unmarshaler_count()
}
