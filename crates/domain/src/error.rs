/// Shared error type used across all sagent crates.
///
/// Component crates (`sagent-step`, `sagent-permissions`, `sagent-sandbox`, …)
/// define their own `Error` enums for domain-specific failure kinds and
/// convert into or out of this one only at the boundary (I/O, JSON, provider
/// calls) — keeping one error type per crate rather than a single
/// workspace-wide enum.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("cancelled: {0}")]
    Cancelled(String),

    #[error("provider {provider}: {message}")]
    Provider { provider: String, message: String },

    #[error("skill not found: {0}")]
    SkillNotFound(String),

    #[error("config: {0}")]
    Config(String),

    #[error("unauthorized: {0}")]
    Auth(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
