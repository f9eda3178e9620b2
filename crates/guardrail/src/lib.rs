//! Guardrail Layer (H): declarative per-step security policy with
//! hierarchical inheritance, composing directly on top of
//! `sagent-permissions` and `sagent-sandbox`.

pub mod config;
pub mod context;
pub mod evaluator;
pub mod step;

pub use config::{merge, GuardrailBuilder, GuardrailConfig};
pub use context::{current_guardrail, effective_permission_config, effective_sandbox_config, with_guardrail};
pub use evaluator::evaluate;
pub use step::{Guarded, GuardrailExt};
