/// Errors raised by the step runtime itself (composition, concurrency,
/// cancellation). Leaf step bodies wrap their own failures in `Other`.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("chain shape mismatch")]
    ChainShapeMismatch,

    #[error("loop exceeded max iterations ({max})")]
    LoopMaxExceeded { max: usize },

    #[error("parallel: all {} sub-steps failed", .0.len())]
    ParallelAllFailed(Vec<String>),

    #[error("race: all sub-steps failed")]
    RaceAllFailed(Vec<String>),

    #[error("race timed out before any sub-step completed")]
    RaceTimeout,

    #[error("cancelled")]
    Cancelled,

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
