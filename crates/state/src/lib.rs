//! Ambient State System: reference-counted `Memory`/`Relay` state cells (E)
//! plus task-local ambient context propagation (F).

pub mod context;
pub mod error;
pub mod memory;

pub use context::{get_context, require_context, with_context};
pub use error::{Error, Result};
pub use memory::{Memory, Relay, RelayIntExt, RelaySeqExt, RelaySetExt};
