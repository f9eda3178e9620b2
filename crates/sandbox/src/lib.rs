//! OS process sandbox: policy-driven execution with timeout escalation and
//! bounded, middle-truncated output capture.

pub mod config;
pub mod error;
pub mod executor;
pub mod output;
pub mod platform;

pub use config::{FilePolicy, NetworkPolicy, SandboxConfiguration};
pub use error::{Error, Result};
pub use executor::{check_launch, escalate, execute, ExecutionOutcome};
pub use output::{CapturedOutput, MAX_OUTPUT_BYTES};
pub use platform::{macos_profile, plan, Confinement};
