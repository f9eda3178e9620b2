use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::FuturesUnordered;
use futures_util::StreamExt;

use crate::error::{Error, Result};
use crate::step::Step;

/// Concurrent; returns the first successful `O`. If `timeout` elapses
/// before any step succeeds, fails immediately with `RaceTimeout`. If every
/// step fails before the timeout (or before the full race without one
/// completes), fails with `RaceAllFailed`.
pub struct Race<I, O> {
    steps: Vec<Arc<dyn Step<I, O>>>,
    timeout: Option<Duration>,
}

impl<I, O> Race<I, O> {
    pub fn new(steps: Vec<Arc<dyn Step<I, O>>>) -> Self {
        Self {
            steps,
            timeout: None,
        }
    }

    pub fn with_timeout(steps: Vec<Arc<dyn Step<I, O>>>, timeout: Duration) -> Self {
        Self {
            steps,
            timeout: Some(timeout),
        }
    }
}

#[async_trait::async_trait]
impl<I, O> Step<I, O> for Race<I, O>
where
    I: Clone + Send + Sync + 'static,
    O: Send + Sync + 'static,
{
    async fn run(&self, input: I) -> Result<O> {
        let race_body = async {
            let mut futs = FuturesUnordered::new();
            for step in &self.steps {
                let step = step.clone();
                let input = input.clone();
                futs.push(async move { step.run(input).await });
            }

            let mut failures = Vec::new();
            while let Some(result) = futs.next().await {
                match result {
                    Ok(o) => return Ok(o),
                    Err(e) => failures.push(e.to_string()),
                }
            }
            Err(Error::RaceAllFailed(failures))
        };

        match self.timeout {
            Some(d) => tokio::time::timeout(d, race_body)
                .await
                .unwrap_or(Err(Error::RaceTimeout)),
            None => race_body.await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct DelaySuccess(u64);
    #[async_trait::async_trait]
    impl Step<(), i32> for DelaySuccess {
        async fn run(&self, _input: ()) -> Result<i32> {
            tokio::time::sleep(Duration::from_millis(self.0)).await;
            Ok(1)
        }
    }

    struct DelayFail(u64);
    #[async_trait::async_trait]
    impl Step<(), i32> for DelayFail {
        async fn run(&self, _input: ()) -> Result<i32> {
            tokio::time::sleep(Duration::from_millis(self.0)).await;
            Err(Error::Other("fastFail".into()))
        }
    }

    fn delayed(ms: u64, ok: bool) -> Arc<dyn Step<(), i32>> {
        if ok {
            Arc::new(DelaySuccess(ms))
        } else {
            Arc::new(DelayFail(ms))
        }
    }

    #[tokio::test]
    async fn first_success_wins() {
        let steps: Vec<Arc<dyn Step<(), i32>>> = vec![delayed(5, true)];
        let r = Race::new(steps);
        assert_eq!(r.run(()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn all_fail_reports_race_all_failed() {
        let steps: Vec<Arc<dyn Step<(), i32>>> = vec![delayed(1, false), delayed(1, false)];
        let r = Race::new(steps);
        match r.run(()).await {
            Err(Error::RaceAllFailed(underlying)) => assert_eq!(underlying.len(), 2),
            other => panic!("expected RaceAllFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn zero_timeout_fails_immediately() {
        let steps: Vec<Arc<dyn Step<(), i32>>> = vec![delayed(50, true)];
        let r = Race::with_timeout(steps, Duration::from_millis(0));
        match r.run(()).await {
            Err(Error::RaceTimeout) => {}
            other => panic!("expected RaceTimeout, got {other:?}"),
        }
    }
}
