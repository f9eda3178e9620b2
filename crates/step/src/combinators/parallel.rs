use std::sync::Arc;

use futures_util::stream::FuturesUnordered;
use futures_util::StreamExt;

use crate::error::{Error, Result};
use crate::step::Step;

/// All sub-steps receive the same input concurrently; returns the successes
/// in completion order. Fails with `ParallelAllFailed` only if every
/// sub-step fails (or there are none).
pub struct Parallel<I, O> {
    steps: Vec<Arc<dyn Step<I, O>>>,
}

impl<I, O> Parallel<I, O> {
    pub fn new(steps: Vec<Arc<dyn Step<I, O>>>) -> Self {
        Self { steps }
    }
}

#[async_trait::async_trait]
impl<I, O> Step<I, Vec<O>> for Parallel<I, O>
where
    I: Clone + Send + Sync + 'static,
    O: Send + Sync + 'static,
{
    async fn run(&self, input: I) -> Result<Vec<O>> {
        if self.steps.is_empty() {
            return Err(Error::ParallelAllFailed(Vec::new()));
        }

        let mut futs = FuturesUnordered::new();
        for step in &self.steps {
            let step = step.clone();
            let input = input.clone();
            futs.push(async move { step.run(input).await });
        }

        let mut successes = Vec::new();
        let mut failures = Vec::new();
        while let Some(result) = futs.next().await {
            match result {
                Ok(o) => successes.push(o),
                Err(e) => failures.push(e.to_string()),
            }
        }

        if successes.is_empty() {
            Err(Error::ParallelAllFailed(failures))
        } else {
            Ok(successes)
        }
    }
}
