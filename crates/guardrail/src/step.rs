//! The `.guardrail { ... }` step modifier: wraps a step so its own
//! [`GuardrailConfig`], merged with whatever is already ambient, is the
//! effective guardrail for the duration of the wrapped step's `run`.

use sagent_step::{Result, Step};

use crate::config::GuardrailConfig;
use crate::context::with_guardrail;

/// A step wrapped with a per-step security policy.
pub struct Guarded<S> {
    inner: S,
    guardrail: GuardrailConfig,
}

impl<S> Guarded<S> {
    pub fn new(inner: S, guardrail: GuardrailConfig) -> Self {
        Self { inner, guardrail }
    }
}

#[async_trait::async_trait]
impl<S, I, O> Step<I, O> for Guarded<S>
where
    S: Step<I, O>,
    I: Send + Sync + 'static,
    O: Send + Sync + 'static,
{
    async fn run(&self, input: I) -> Result<O> {
        let guardrail = self.guardrail.clone();
        with_guardrail(guardrail, move || self.inner.run(input)).await
    }
}

/// Fluent `step.guardrail(cfg)` composition, mirroring `StepExt::then`.
pub trait GuardrailExt<I, O>: Step<I, O> + Sized
where
    I: Send + Sync + 'static,
    O: Send + Sync + 'static,
{
    fn guardrail(self, cfg: GuardrailConfig) -> Guarded<Self> {
        Guarded::new(self, cfg)
    }
}

impl<I, O, S> GuardrailExt<I, O> for S
where
    S: Step<I, O> + Sized,
    I: Send + Sync + 'static,
    O: Send + Sync + 'static,
{
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GuardrailBuilder;
    use crate::context::current_guardrail;
    use sagent_step::Transform;

    #[tokio::test]
    async fn guarded_step_installs_and_restores_guardrail() {
        assert!(current_guardrail().is_none());

        let inner = Transform::<(), ()>::new(|_| {
            let g = current_guardrail().expect("guardrail should be ambient inside the step");
            assert_eq!(g.deny, vec!["Bash(rm:*)".to_string()]);
        });
        let guarded = inner.guardrail(GuardrailBuilder::new().deny("Bash(rm:*)").build());

        guarded.run(()).await.unwrap();

        assert!(current_guardrail().is_none());
    }

    #[tokio::test]
    async fn nested_guarded_steps_merge_policies() {
        let outer_guardrail = GuardrailBuilder::new().allow("Read").build();
        let inner_step = Transform::<(), ()>::new(|_| {
            let g = current_guardrail().unwrap();
            assert_eq!(g.allow, vec!["Read".to_string(), "Write".to_string()]);
        })
        .guardrail(GuardrailBuilder::new().allow("Write").build());

        with_guardrail(outer_guardrail, || inner_step.run(())).await.unwrap();
    }
}
