//! Agent Session (J): lifecycle, transcript, forking, and persistence.
//!
//! Implements stable session routing from inbound metadata, identity linking
//! across channels, owned session state with append-only transcripts, and
//! configurable reset lifecycle.

pub mod agent_session;
pub mod context;
pub mod error;
pub mod identity;
pub mod lifecycle;
pub mod search;
pub mod session_key;
pub mod store;
pub mod transcript;

pub use agent_session::{
    AgentResponse, AgentSession, Entry, SessionConfig, Snapshot, SubagentInvoker, ToolFilter,
};
pub use context::{current_agent, current_session, with_agent, with_session, LanguageModelSession};
pub use error::{Error, Result};
pub use identity::IdentityResolver;
pub use lifecycle::LifecycleManager;
pub use search::{SearchHit, TranscriptIndex};
pub use session_key::{compute_session_key, validate_metadata, SessionKeyValidation};
pub use store::{SessionEntry, SessionStore};
pub use transcript::TranscriptWriter;
