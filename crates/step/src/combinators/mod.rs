pub mod chain;
pub mod loop_;
pub mod map;
pub mod parallel;
pub mod race;
pub mod reduce;

pub use chain::Chain2;
pub use loop_::Loop;
pub use map::MapStep;
pub use parallel::Parallel;
pub use race::Race;
pub use reduce::ReduceStep;
