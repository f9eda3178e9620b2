//! `Step<I,O>` — the core algebra: a typed, asynchronous transformation
//! `I -> O`. Steps are values; composition builds a tree whose leaves are
//! primitives (`Transform`, `Empty`, `Join`, generation steps) and whose
//! interior nodes are combinators (chain, parallel, race, loop, map, reduce).

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::Result;

/// A polymorphic async function `I -> O`. `I` and `O` must be safely
/// shareable across task boundaries.
#[async_trait::async_trait]
pub trait Step<I, O>: Send + Sync
where
    I: Send + Sync + 'static,
    O: Send + Sync + 'static,
{
    async fn run(&self, input: I) -> Result<O>;
}

/// A boxed, cloneable handle to a step — used wherever combinators need to
/// hold a heterogeneous collection of sub-steps (`Parallel`, `Race`).
pub type BoxStep<I, O> = Arc<dyn Step<I, O>>;

/// Fluent composition: `a.then(b)` builds a two-stage chain. Chains of more
/// than two stages nest (`a.then(b).then(c)`), or use the `chain!` macro for
/// a flat declarative list.
pub trait StepExt<I, O>: Step<I, O> + Sized + 'static
where
    I: Send + Sync + 'static,
    O: Send + Sync + 'static,
{
    fn then<B, O2>(self, next: B) -> crate::combinators::chain::Chain2<Self, B>
    where
        B: Step<O, O2>,
        O2: Send + Sync + 'static,
    {
        crate::combinators::chain::Chain2::new(self, next)
    }
}

impl<I, O, S> StepExt<I, O> for S
where
    S: Step<I, O> + Sized + 'static,
    I: Send + Sync + 'static,
    O: Send + Sync + 'static,
{
}

/// A pure `I -> O` closure lifted to async. `try_new` accepts a closure that
/// may itself fail.
pub struct Transform<I, O> {
    f: Arc<dyn Fn(I) -> Result<O> + Send + Sync>,
}

impl<I, O> Transform<I, O>
where
    I: Send + Sync + 'static,
    O: Send + Sync + 'static,
{
    pub fn new(f: impl Fn(I) -> O + Send + Sync + 'static) -> Self {
        Self {
            f: Arc::new(move |i| Ok(f(i))),
        }
    }

    pub fn try_new(f: impl Fn(I) -> Result<O> + Send + Sync + 'static) -> Self {
        Self { f: Arc::new(f) }
    }
}

#[async_trait::async_trait]
impl<I, O> Step<I, O> for Transform<I, O>
where
    I: Send + Sync + 'static,
    O: Send + Sync + 'static,
{
    async fn run(&self, input: I) -> Result<O> {
        (self.f)(input)
    }
}

/// Identity on `()`.
pub struct Empty;

#[async_trait::async_trait]
impl Step<(), ()> for Empty {
    async fn run(&self, _input: ()) -> Result<()> {
        Ok(())
    }
}

/// Collapses a tuple input/output pair in a chain context — a no-op marker
/// step used to merge two chain branches back into one typed tuple.
pub struct Join;

#[async_trait::async_trait]
impl<A, B> Step<(A, B), (A, B)> for Join
where
    A: Send + Sync + 'static,
    B: Send + Sync + 'static,
{
    async fn run(&self, input: (A, B)) -> Result<(A, B)> {
        Ok(input)
    }
}

/// Helper so leaf step bodies can lift an arbitrary `std::error::Error`
/// into the step runtime's `Error::Other`.
pub fn leaf_err(e: impl std::fmt::Display) -> crate::error::Error {
    crate::error::Error::Other(e.to_string())
}

/// A boxed future, used by adapters that bridge non-`Step` async code into
/// the step algebra (e.g. generation steps in `sagent-generation`).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
