//! Error kinds specific to `AgentSession` orchestration, on top of the
//! shared `sagent_domain::Error` used by the lower-level routing primitives
//! in this crate (`store`, `transcript`, `lifecycle`, `identity`).

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Domain(#[from] sagent_domain::error::Error),

    #[error(transparent)]
    Tool(#[from] sagent_tools::Error),

    #[error("no subagent invoker configured for this session")]
    NoSubagentInvoker,

    #[error("invoking subagent '{0}' failed: {1}")]
    SubagentFailed(String, String),
}

pub type Result<T> = std::result::Result<T, Error>;
