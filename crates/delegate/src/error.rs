/// Errors raised by sub-agent delegation.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("circular delegation: {stack:?}")]
    CircularDelegation { stack: Vec<String> },

    #[error("delegation depth exceeded")]
    DepthExceeded,

    #[error("subagent '{0}' not found")]
    NotFound(String),

    #[error("duplicate subagent name '{0}'")]
    DuplicateName(String),

    #[error(transparent)]
    Session(#[from] sagent_sessions::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
