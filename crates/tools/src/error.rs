#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Permission(#[from] sagent_permissions::Error),

    #[error(transparent)]
    Sandbox(#[from] sagent_sandbox::Error),

    #[error(transparent)]
    Domain(#[from] sagent_domain::Error),

    #[error("tool not found: {0}")]
    ToolNotFound(String),

    #[error("tool '{tool}' execution failed: {cause}")]
    ToolExecutionFailed { tool: String, cause: String },
}

pub type Result<T> = std::result::Result<T, Error>;
