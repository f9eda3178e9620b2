//! Delegation stack: the ambient, ordered list of active delegations in
//! the current call chain, used to detect cycles and enforce `maxDepth`
//! before entering the callee.

use std::future::Future;

use sagent_state::{get_context, with_context};

use crate::error::{Error, Result};

/// Default `maxDepth` when a `SubagentDefinition` doesn't override it.
pub const DEFAULT_MAX_DEPTH: usize = 3;

#[derive(Debug, Clone, Default)]
pub struct DelegationStack(Vec<String>);

impl DelegationStack {
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|n| n == name)
    }
}

/// Reads the ambient delegation stack, or an empty one outside any
/// delegation.
pub fn current_stack() -> DelegationStack {
    get_context::<DelegationStack>().unwrap_or_default()
}

/// Checks `name` against the ambient stack for a cycle, and against
/// `max_depth`, then installs the stack with `name` pushed for the
/// extent of `body` — the scope restore on exit pops it back off.
pub async fn enter<F, Fut, R>(name: &str, max_depth: usize, body: F) -> Result<R>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = R>,
{
    let stack = current_stack();
    if stack.contains(name) {
        let mut trace = stack.as_slice().to_vec();
        trace.push(name.to_string());
        return Err(Error::CircularDelegation { stack: trace });
    }
    if stack.len() + 1 > max_depth {
        return Err(Error::DepthExceeded);
    }

    let mut next = stack;
    next.0.push(name.to_string());
    Ok(with_context(next, body).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_entry_succeeds_and_stack_is_visible_inside() {
        let result = enter("alpha", DEFAULT_MAX_DEPTH, || async {
            assert_eq!(current_stack().as_slice(), &["alpha".to_string()]);
            42
        })
        .await
        .unwrap();
        assert_eq!(result, 42);
        assert!(current_stack().is_empty());
    }

    #[tokio::test]
    async fn re_entering_the_same_name_is_a_cycle() {
        let result = enter("alpha", DEFAULT_MAX_DEPTH, || async {
            enter("alpha", DEFAULT_MAX_DEPTH, || async { 1 }).await
        })
        .await
        .unwrap();
        assert!(matches!(result, Err(Error::CircularDelegation { stack }) if stack == vec!["alpha".to_string(), "alpha".to_string()]));
    }

    #[tokio::test]
    async fn depth_limit_is_enforced() {
        let result = enter("a1", 3, || async {
            enter("a2", 3, || async {
                enter("a3", 3, || async { enter("a4", 3, || async { 0usize }).await }).await
            })
            .await
        })
        .await;

        let result = result.unwrap().unwrap().unwrap();
        assert!(matches!(result, Err(Error::DepthExceeded)));
    }
}
