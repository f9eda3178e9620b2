//! `Chain_n` — strict sequential composition. Rather than hand-writing eight
//! distinct `ChainN` structs, `Chain2` generalizes to any n by nesting
//! (`Chain2::new(s1, Chain2::new(s2, s3))` behaves exactly as `Chain3`
//! would); the `chain!` macro builds this nesting from a flat list, which is
//! the idiomatic-Rust rendition of a variadic result builder.

use crate::error::Result;
use crate::step::Step;

pub struct Chain2<A, B> {
    a: A,
    b: B,
}

impl<A, B> Chain2<A, B> {
    pub fn new(a: A, b: B) -> Self {
        Self { a, b }
    }
}

#[async_trait::async_trait]
impl<I, M, O, A, B> Step<I, O> for Chain2<A, B>
where
    I: Send + Sync + 'static,
    M: Send + Sync + 'static,
    O: Send + Sync + 'static,
    A: Step<I, M>,
    B: Step<M, O>,
{
    async fn run(&self, input: I) -> Result<O> {
        let mid = self.a.run(input).await?;
        self.b.run(mid).await
    }
}

/// Build a sequential chain from a flat list of steps:
/// `chain!(s1, s2, s3)` == `Chain2::new(s1, Chain2::new(s2, s3))`.
#[macro_export]
macro_rules! chain {
    ($a:expr, $b:expr $(,)?) => {
        $crate::combinators::chain::Chain2::new($a, $b)
    };
    ($a:expr, $($rest:expr),+ $(,)?) => {
        $crate::combinators::chain::Chain2::new($a, $crate::chain!($($rest),+))
    };
}
