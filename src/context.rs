//! Immutable, chainable request context.
//!
//! A [`Context`] is a linked chain of typed bindings. Binding a value never
//! mutates the receiver: it returns a new context that wraps the parent, so a
//! context can be cloned and handed to concurrent operations freely.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

/// Typed key for a context binding.
///
/// The key type itself is the identity of the binding; two keys never collide
/// even if their values share a type.
///
/// # Example
///
/// ```
/// use ctxwire::{Context, ContextKey};
///
/// struct TenantKey;
///
/// impl ContextKey for TenantKey {
///     type Value = String;
///     const NAME: &'static str = "tenant";
/// }
///
/// let ctx = Context::background().with_value::<TenantKey>("acme".to_string());
/// assert_eq!(ctx.value::<TenantKey>(), Some(&"acme".to_string()));
/// ```
pub trait ContextKey: 'static {
    /// Type of the value stored under this key
    type Value: Clone + Send + Sync + 'static;

    /// Human readable key name, used only for debug output
    const NAME: &'static str;
}

struct Binding {
    key: TypeId,
    name: &'static str,
    value: Box<dyn Any + Send + Sync>,
    parent: Option<Arc<Binding>>,
}

/// Request-scoped carrier of typed key-value bindings.
#[derive(Clone, Default)]
pub struct Context {
    head: Option<Arc<Binding>>,
}

impl Context {
    /// The root context with no bindings.
    pub fn background() -> Self {
        Self { head: None }
    }

    /// Return a new context with `value` bound under `K`.
    ///
    /// The receiver is left untouched. A later binding for the same key
    /// shadows earlier ones.
    pub fn with_value<K: ContextKey>(&self, value: K::Value) -> Self {
        Self {
            head: Some(Arc::new(Binding {
                key: TypeId::of::<K>(),
                name: K::NAME,
                value: Box::new(value),
                parent: self.head.clone(),
            })),
        }
    }

    /// Look up the newest value bound under `K`.
    pub fn value<K: ContextKey>(&self) -> Option<&K::Value> {
        let key = TypeId::of::<K>();
        self.bindings()
            .find(|binding| binding.key == key)
            .and_then(|binding| binding.value.downcast_ref::<K::Value>())
    }

    /// Check whether any value is bound under `K`.
    pub fn contains<K: ContextKey>(&self) -> bool {
        self.value::<K>().is_some()
    }

    /// Number of bindings in the chain, shadowed ones included.
    pub fn len(&self) -> usize {
        self.bindings().count()
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    fn bindings(&self) -> impl Iterator<Item = &Binding> {
        std::iter::successors(self.head.as_deref(), |binding| binding.parent.as_deref())
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("keys", &self.bindings().map(|b| b.name).collect::<Vec<_>>())
            .finish()
    }
}
