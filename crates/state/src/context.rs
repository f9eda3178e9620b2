//! Ambient task-local context — a statically-typed, type-indexed table
//! scoped to the lexical/async extent of `with_context`. No inheritance
//! tree: each context key is identified by its value's `TypeId`.

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use crate::error::{Error, Result};

type AnyMap = HashMap<TypeId, Arc<dyn Any + Send + Sync>>;

tokio::task_local! {
    static CONTEXT: RefCell<AnyMap>;
}

fn current_map() -> AnyMap {
    CONTEXT
        .try_with(|m| m.borrow().clone())
        .unwrap_or_default()
}

/// Install `value` as the ambient context for type `T` for the lexical
/// extent of `body`. An inner `with_context::<T>` shadows an outer one of
/// the same type; values of other types installed by an outer scope remain
/// visible.
pub async fn with_context<T, F, Fut, R>(value: T, body: F) -> R
where
    T: Send + Sync + 'static,
    F: FnOnce() -> Fut,
    Fut: Future<Output = R>,
{
    let mut map = current_map();
    map.insert(TypeId::of::<T>(), Arc::new(value));
    CONTEXT.scope(RefCell::new(map), body()).await
}

/// Read the current ambient value for `T`, or `None` if absent
/// (`OptionalContext` semantics).
pub fn get_context<T: Clone + Send + Sync + 'static>() -> Option<T> {
    CONTEXT
        .try_with(|m| {
            m.borrow()
                .get(&TypeId::of::<T>())
                .and_then(|v| v.downcast_ref::<T>().cloned())
        })
        .unwrap_or(None)
}

/// Read the current ambient value for `T`, or a typed `ContextMissing` error.
pub fn require_context<T: Clone + Send + Sync + 'static>() -> Result<T> {
    get_context::<T>().ok_or_else(|| Error::ContextMissing(std::any::type_name::<T>().to_string()))
}
