//! Pattern matcher and permission engine: rule sets, a six-phase evaluator,
//! session memory, and an interactive decision handler.

pub mod error;
pub mod evaluator;
pub mod handler;
pub mod pattern;
pub mod rules;
pub mod session_memory;

pub use error::{Error, Result};
pub use evaluator::{evaluate, resolve};
pub use handler::{NoHandler, PermissionHandler};
pub use pattern::Pattern;
pub use rules::{
    AlwaysDecision, Decision, DefaultAction, InteractiveDecision, PermissionConfiguration,
    PermissionDocument,
};
pub use session_memory::SessionMemory;
