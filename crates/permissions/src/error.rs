#[derive(thiserror::Error, Debug, Clone)]
pub enum Error {
    #[error("permission denied for {tool}: {reason}")]
    PermissionDenied {
        tool: String,
        reason: String,
        rule: Option<String>,
    },

    #[error("invalid permission configuration: {0}")]
    InvalidConfiguration(String),
}

pub type Result<T> = std::result::Result<T, Error>;
