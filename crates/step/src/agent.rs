//! Agent sugar: a type that names a declaratively-composed `body` step gets
//! a `Step` implementation for free via this blanket impl, rather than
//! hand-writing `run` when the control flow is expressible as a chain.

use crate::error::Result;
use crate::step::Step;

pub trait Agent<I, O>: Send + Sync
where
    I: Send + Sync + 'static,
    O: Send + Sync + 'static,
{
    type Body: Step<I, O>;

    fn body(&self) -> &Self::Body;
}

#[async_trait::async_trait]
impl<I, O, T> Step<I, O> for T
where
    T: Agent<I, O>,
    I: Send + Sync + 'static,
    O: Send + Sync + 'static,
{
    async fn run(&self, input: I) -> Result<O> {
        self.body().run(input).await
    }
}
