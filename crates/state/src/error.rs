/// Errors produced by the ambient context and state-cell machinery.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("context missing: {0}")]
    ContextMissing(String),
}

pub type Result<T> = std::result::Result<T, Error>;
