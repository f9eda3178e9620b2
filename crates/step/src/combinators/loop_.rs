use std::sync::Arc;

use crate::error::{Error, Result};
use crate::step::Step;

/// Iterates `body` (a `Step<I,I>`) up to `max` times. With an `until`
/// predicate, stops early once it holds and fails with `LoopMaxExceeded` if
/// it never does; without one, always runs exactly `max` times and returns
/// the final value.
pub struct Loop<I> {
    body: Arc<dyn Step<I, I>>,
    max: usize,
    until: Option<Arc<dyn Fn(&I) -> bool + Send + Sync>>,
}

impl<I> Loop<I> {
    pub fn new(max: usize, body: Arc<dyn Step<I, I>>) -> Self {
        Self {
            body,
            max,
            until: None,
        }
    }

    pub fn until(mut self, pred: impl Fn(&I) -> bool + Send + Sync + 'static) -> Self {
        self.until = Some(Arc::new(pred));
        self
    }
}

#[async_trait::async_trait]
impl<I> Step<I, I> for Loop<I>
where
    I: Send + Sync + 'static,
{
    async fn run(&self, input: I) -> Result<I> {
        let mut current = input;
        for _ in 0..self.max {
            current = self.body.run(current).await?;
            if let Some(pred) = &self.until {
                if pred(&current) {
                    return Ok(current);
                }
            }
        }
        if self.until.is_some() {
            Err(Error::LoopMaxExceeded { max: self.max })
        } else {
            Ok(current)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::Transform;

    #[tokio::test]
    async fn stops_early_when_predicate_holds() {
        let body: Arc<dyn Step<i32, i32>> = Arc::new(Transform::new(|v: i32| v + 1));
        let l = Loop::new(10, body).until(|v| *v >= 3);
        assert_eq!(l.run(0).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn fails_when_predicate_never_holds() {
        let body: Arc<dyn Step<i32, i32>> = Arc::new(Transform::new(|v: i32| v + 1));
        let l = Loop::new(3, body).until(|v| *v >= 100);
        match l.run(0).await {
            Err(Error::LoopMaxExceeded { max }) => assert_eq!(max, 3),
            other => panic!("expected LoopMaxExceeded, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn without_predicate_runs_exactly_max_times() {
        let body: Arc<dyn Step<i32, i32>> = Arc::new(Transform::new(|v: i32| v + 1));
        let l = Loop::new(5, body);
        assert_eq!(l.run(0).await.unwrap(), 5);
    }
}
