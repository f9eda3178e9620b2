use std::sync::Arc;

use crate::error::Result;
use crate::step::Step;

/// Left fold, strictly ordered by input index. `body(acc, item, index)`
/// builds the step to run for that fold step.
pub struct ReduceStep<A, Acc> {
    initial: Acc,
    body: Arc<dyn Fn(&Acc, &A, usize) -> Arc<dyn Step<Acc, Acc>> + Send + Sync>,
}

impl<A, Acc> ReduceStep<A, Acc> {
    pub fn new(
        initial: Acc,
        body: impl Fn(&Acc, &A, usize) -> Arc<dyn Step<Acc, Acc>> + Send + Sync + 'static,
    ) -> Self {
        Self {
            initial,
            body: Arc::new(body),
        }
    }
}

#[async_trait::async_trait]
impl<A, Acc> Step<Vec<A>, Acc> for ReduceStep<A, Acc>
where
    A: Send + Sync + 'static,
    Acc: Clone + Send + Sync + 'static,
{
    async fn run(&self, input: Vec<A>) -> Result<Acc> {
        let mut acc = self.initial.clone();
        for (index, item) in input.into_iter().enumerate() {
            let step = (self.body)(&acc, &item, index);
            acc = step.run(acc).await?;
        }
        Ok(acc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::Transform;

    #[tokio::test]
    async fn folds_left_in_order() {
        let r = ReduceStep::new(0_i32, |_acc: &i32, item: &i32, _index: usize| {
            let item = *item;
            Arc::new(Transform::new(move |acc: i32| acc + item)) as Arc<dyn Step<i32, i32>>
        });
        assert_eq!(r.run(vec![1, 2, 3, 4]).await.unwrap(), 10);
    }
}
