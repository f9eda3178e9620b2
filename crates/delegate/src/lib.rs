//! Sub-agent Registry & Delegate (K): a named `SubagentDefinition` catalog,
//! the ambient delegation stack used for cycle/depth enforcement, and the
//! `Delegate` step and `RegistryInvoker` that draw on it.

pub mod delegate_step;
pub mod error;
pub mod invoker;
pub mod registry;
pub mod stack;

pub use delegate_step::Delegate;
pub use error::{Error, Result};
pub use invoker::{invoke, RegistryInvoker};
pub use registry::{SubagentDefinition, SubagentRegistry, SubagentRegistryBuilder};
pub use stack::{current_stack, enter, DelegationStack, DEFAULT_MAX_DEPTH};
