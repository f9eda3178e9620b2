use std::sync::Arc;

use crate::error::Result;
use crate::step::Step;

/// Element-wise transformation preserving input order. `body(a, index)`
/// builds the step to run for that element; errors are fatal to the whole
/// map.
pub struct MapStep<A, B> {
    body: Arc<dyn Fn(&A, usize) -> Arc<dyn Step<A, B>> + Send + Sync>,
}

impl<A, B> MapStep<A, B> {
    pub fn new(body: impl Fn(&A, usize) -> Arc<dyn Step<A, B>> + Send + Sync + 'static) -> Self {
        Self {
            body: Arc::new(body),
        }
    }
}

#[async_trait::async_trait]
impl<A, B> Step<Vec<A>, Vec<B>> for MapStep<A, B>
where
    A: Clone + Send + Sync + 'static,
    B: Send + Sync + 'static,
{
    async fn run(&self, input: Vec<A>) -> Result<Vec<B>> {
        let mut out = Vec::with_capacity(input.len());
        for (index, item) in input.into_iter().enumerate() {
            let step = (self.body)(&item, index);
            out.push(step.run(item).await?);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::Transform;

    #[tokio::test]
    async fn maps_each_element_in_order() {
        let m = MapStep::new(|_item: &i32, index: usize| -> Arc<dyn Step<i32, i32>> {
            Arc::new(Transform::new(move |v: i32| v * 10 + index as i32))
        });
        assert_eq!(m.run(vec![1, 2, 3]).await.unwrap(), vec![10, 21, 32]);
    }

    #[tokio::test]
    async fn first_error_is_fatal() {
        let m = MapStep::new(|item: &i32, _index: usize| -> Arc<dyn Step<i32, i32>> {
            if *item == 2 {
                Arc::new(Transform::<i32, i32>::try_new(|_| {
                    Err(crate::error::Error::Other("bad element".into()))
                }))
            } else {
                Arc::new(Transform::new(|v: i32| v))
            }
        });
        assert!(m.run(vec![1, 2, 3]).await.is_err());
    }
}
