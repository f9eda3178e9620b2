//! `GenerateText<I>`: a leaf `Step<I, String>` that builds a
//! prompt from its input, sends it through the ambient
//! `LanguageModelSession`'s text-completion interface, and returns the
//! final string — optionally streaming incremental snapshots.

use std::sync::Arc;

use futures_util::StreamExt;
use sagent_domain::stream::StreamEvent;
use sagent_domain::tool::Message;
use sagent_domain::trace::TraceEvent;
use sagent_providers::ChatRequest;
use sagent_sessions::context::{current_agent, current_session, GenerationOptions, Sampling};
use sagent_step::{leaf_err, Result, Step};

use crate::prompt::{Prompt, PromptRepresentable};

/// One incremental snapshot of a streaming text generation.
#[derive(Debug, Clone)]
pub struct TextSnapshot {
    pub content: String,
    pub is_complete: bool,
}

type PromptFn<I> = Arc<dyn Fn(&I) -> Prompt + Send + Sync>;
type StreamCallback = Arc<dyn Fn(TextSnapshot) + Send + Sync>;

pub struct GenerateText<I> {
    prompt_builder: PromptFn<I>,
    on_stream: Option<StreamCallback>,
    options: GenerationOptions,
}

impl<I> GenerateText<I>
where
    I: Send + Sync + 'static,
{
    /// Builds the prompt from an explicit closure over the step's input.
    pub fn new(builder: impl Fn(&I) -> Prompt + Send + Sync + 'static) -> Self {
        Self {
            prompt_builder: Arc::new(builder),
            on_stream: None,
            options: GenerationOptions::default(),
        }
    }

    pub fn on_stream(mut self, callback: impl Fn(TextSnapshot) + Send + Sync + 'static) -> Self {
        self.on_stream = Some(Arc::new(callback));
        self
    }

    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }
}

impl<I> GenerateText<I>
where
    I: PromptRepresentable + Send + Sync + 'static,
{
    /// Derives the prompt directly from `I: PromptRepresentable`, skipping
    /// an explicit builder closure.
    pub fn derived() -> Self {
        Self::new(|i: &I| i.to_prompt())
    }
}

fn apply_options(mut req: ChatRequest, options: &GenerationOptions) -> ChatRequest {
    req.max_tokens = options.max_tokens;
    match options.sampling {
        Some(Sampling::Greedy) => req.temperature = Some(0.0),
        Some(Sampling::TopP(p)) => req.top_p = Some(p),
        None => req.temperature = options.temperature,
    }
    req
}

#[async_trait::async_trait]
impl<I> Step<I, String> for GenerateText<I>
where
    I: Send + Sync + 'static,
{
    async fn run(&self, input: I) -> Result<String> {
        let prompt = (self.prompt_builder)(&input);
        let session = current_session().ok_or_else(|| {
            leaf_err("GenerateText requires an ambient LanguageModelSession (with_session)")
        })?;

        session.push_message(Message::user(prompt.render()));
        let request = apply_options(
            ChatRequest {
                messages: session.request_messages(),
                tools: session.tools().to_vec(),
                ..Default::default()
            },
            &self.options,
        );

        let started = std::time::Instant::now();
        let content = match &self.on_stream {
            None => {
                let response = session.provider().chat(request).await.map_err(leaf_err)?;
                TraceEvent::LlmRequest {
                    provider: session.provider().provider_id().to_string(),
                    model: response.model.clone(),
                    streaming: false,
                    duration_ms: started.elapsed().as_millis() as u64,
                    prompt_tokens: response.usage.as_ref().map(|u| u.prompt_tokens),
                    completion_tokens: response.usage.as_ref().map(|u| u.completion_tokens),
                }
                .emit();
                response.content
            }
            Some(callback) => {
                let mut events = session.provider().chat_stream(request).await.map_err(leaf_err)?;
                let mut acc = String::new();
                loop {
                    if current_agent().is_some_and(|a| a.is_cancelled()) {
                        return Err(sagent_step::Error::Cancelled);
                    }
                    match events.next().await {
                        Some(Ok(StreamEvent::Token { text })) => {
                            acc.push_str(&text);
                            callback(TextSnapshot {
                                content: acc.clone(),
                                is_complete: false,
                            });
                        }
                        Some(Ok(StreamEvent::Done { usage, .. })) => {
                            callback(TextSnapshot {
                                content: acc.clone(),
                                is_complete: true,
                            });
                            TraceEvent::LlmRequest {
                                provider: session.provider().provider_id().to_string(),
                                model: session.provider().provider_id().to_string(),
                                streaming: true,
                                duration_ms: started.elapsed().as_millis() as u64,
                                prompt_tokens: usage.as_ref().map(|u| u.prompt_tokens),
                                completion_tokens: usage.as_ref().map(|u| u.completion_tokens),
                            }
                            .emit();
                            break;
                        }
                        Some(Ok(StreamEvent::Error { message })) => {
                            return Err(leaf_err(message));
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => return Err(leaf_err(e)),
                        None => break,
                    }
                }
                acc
            }
        };

        session.push_message(Message::assistant(content.clone()));
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sagent_providers::{LlmProvider, MockProvider};
    use sagent_sessions::context::{with_session, LanguageModelSession};
    use std::sync::Arc as StdArc;
    use std::sync::Mutex;

    #[tokio::test]
    async fn run_without_ambient_session_errors() {
        let step = GenerateText::<String>::new(|s: &String| Prompt::from_text(s.clone()));
        let err = step.run("hi".to_string()).await.unwrap_err();
        assert!(matches!(err, sagent_step::Error::Other(_)));
    }

    #[tokio::test]
    async fn run_derives_prompt_and_returns_reply() {
        let provider: StdArc<dyn LlmProvider> = StdArc::new(MockProvider::new("test"));
        let session = LanguageModelSession::new(provider, "be terse");
        let step = GenerateText::<String>::derived();

        let result = with_session(session.clone(), || async {
            step.run("hello".to_string()).await
        })
        .await
        .unwrap();

        assert_eq!(result, "echo: hello");
        assert_eq!(session.transcript().len(), 2);
    }

    #[tokio::test]
    async fn streaming_invokes_callback_and_final_snapshot_is_complete() {
        let provider: StdArc<dyn LlmProvider> = StdArc::new(MockProvider::new("test"));
        let session = LanguageModelSession::new(provider, "be terse");
        let seen: StdArc<Mutex<Vec<TextSnapshot>>> = StdArc::new(Mutex::new(Vec::new()));
        let seen2 = seen.clone();

        let step = GenerateText::<String>::derived().on_stream(move |snap| {
            seen2.lock().unwrap().push(snap);
        });

        with_session(session, || async { step.run("a b".to_string()).await })
            .await
            .unwrap();

        let snaps = seen.lock().unwrap();
        assert!(snaps.last().unwrap().is_complete);
    }
}
