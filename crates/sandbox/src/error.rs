#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("sandbox unavailable on this host: {0}")]
    SandboxUnavailable(String),

    #[error("sandbox launch failed: {0}")]
    SandboxLaunchFailed(String),

    #[error("command timed out after {0}s")]
    CommandTimedOut(u64),

    #[error("output exceeded the size limit and was truncated")]
    OutputTooLarge,
}

pub type Result<T> = std::result::Result<T, Error>;
