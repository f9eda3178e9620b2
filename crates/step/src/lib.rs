//! Core `Step<I,O>` algebra: typed async transformations and the
//! combinators (chain, parallel, race, loop, map, reduce) that compose them.

pub mod agent;
pub mod combinators;
pub mod error;
pub mod step;

pub use agent::Agent;
pub use combinators::{Chain2, Loop, MapStep, Parallel, Race, ReduceStep};
pub use error::{Error, Result};
pub use step::{BoxFuture, BoxStep, Empty, Join, Step, StepExt, Transform, leaf_err};
