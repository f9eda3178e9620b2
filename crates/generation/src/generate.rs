//! `Generate<I,O>`: like `GenerateText`, but `O` is described
//! by a compile-time schema (`Structured`). Streaming yields `O::Partial`
//! snapshots with all fields optional, filling in monotonically.

use std::marker::PhantomData;
use std::sync::Arc;

use futures_util::StreamExt;
use sagent_domain::stream::StreamEvent;
use sagent_domain::tool::Message;
use sagent_domain::trace::TraceEvent;
use sagent_providers::ChatRequest;
use sagent_sessions::context::{current_agent, current_session, GenerationOptions, Sampling};
use sagent_step::{leaf_err, Result, Step};

use crate::prompt::Prompt;
use crate::structured::Structured;

type PromptFn<I> = Arc<dyn Fn(&I) -> Prompt + Send + Sync>;
type PartialCallback<O> = Arc<dyn Fn(&<O as Structured>::Partial) + Send + Sync>;

pub struct Generate<I, O: Structured> {
    prompt_builder: PromptFn<I>,
    on_stream: Option<PartialCallback<O>>,
    options: GenerationOptions,
    _marker: PhantomData<fn() -> O>,
}

impl<I, O> Generate<I, O>
where
    I: Send + Sync + 'static,
    O: Structured,
{
    pub fn new(builder: impl Fn(&I) -> Prompt + Send + Sync + 'static) -> Self {
        Self {
            prompt_builder: Arc::new(builder),
            on_stream: None,
            options: GenerationOptions::default(),
            _marker: PhantomData,
        }
    }

    pub fn on_stream(mut self, callback: impl Fn(&O::Partial) + Send + Sync + 'static) -> Self {
        self.on_stream = Some(Arc::new(callback));
        self
    }

    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }
}

fn schema_instruction(schema: &serde_json::Value) -> String {
    format!(
        "Respond with a single JSON object matching this schema, no surrounding prose:\n{}",
        serde_json::to_string_pretty(schema).unwrap_or_else(|_| schema.to_string())
    )
}

fn apply_options(mut req: ChatRequest, options: &GenerationOptions) -> ChatRequest {
    req.max_tokens = options.max_tokens;
    match options.sampling {
        Some(Sampling::Greedy) => req.temperature = Some(0.0),
        Some(Sampling::TopP(p)) => req.top_p = Some(p),
        None => req.temperature = options.temperature,
    }
    req.json_mode = true;
    req
}

#[async_trait::async_trait]
impl<I, O> Step<I, O> for Generate<I, O>
where
    I: Send + Sync + 'static,
    O: Structured,
{
    async fn run(&self, input: I) -> Result<O> {
        let prompt = (self.prompt_builder)(&input);
        let session = current_session().ok_or_else(|| {
            leaf_err("Generate requires an ambient LanguageModelSession (with_session)")
        })?;

        let schema_note = schema_instruction(&O::json_schema());
        session.push_message(Message::user(format!("{}\n\n{}", prompt.render(), schema_note)));
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
                            // Best-effort: only a structurally complete prefix
                            // parses; partial snapshots are emitted whenever
                            // the accumulated text happens to already do so.
                            if let Ok(partial) = serde_json::from_str::<O::Partial>(&acc) {
                                callback(&partial);
                            }
                        }
                        Some(Ok(StreamEvent::Done { usage, .. })) => {
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
                        Some(Ok(StreamEvent::Error { message })) => return Err(leaf_err(message)),
                        Some(Ok(_)) => {}
                        Some(Err(e)) => return Err(leaf_err(e)),
                        None => break,
                    }
                }
                acc
            }
        };

        let parsed: O = serde_json::from_str(&content).map_err(leaf_err)?;
        session.push_message(Message::assistant(content));
        if let Some(callback) = &self.on_stream {
            if let Ok(full_partial) = serde_json::from_str::<O::Partial>(
                &serde_json::to_string(&parsed).map_err(leaf_err)?,
            ) {
                callback(&full_partial);
            }
        }
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sagent_providers::{LlmProvider, MockProvider};
    use sagent_sessions::context::{with_session, LanguageModelSession};
    use serde::{Deserialize, Serialize};
    use std::sync::Arc as StdArc;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Greeting {
        message: String,
    }

    #[derive(Debug, Default, Deserialize)]
    struct GreetingPartial {
        #[serde(default)]
        message: Option<String>,
    }

    impl Structured for Greeting {
        type Partial = GreetingPartial;

        fn json_schema() -> serde_json::Value {
            serde_json::json!({
                "type": "object",
                "properties": { "message": { "type": "string" } },
                "required": ["message"]
            })
        }
    }

    #[tokio::test]
    async fn run_without_session_errors() {
        let step = Generate::<String, Greeting>::new(|s: &String| Prompt::from_text(s.clone()));
        let err = step.run("hi".to_string()).await.unwrap_err();
        assert!(matches!(err, sagent_step::Error::Other(_)));
    }

    struct FixedJsonProvider {
        capabilities: sagent_domain::capability::LlmCapabilities,
        json: String,
    }

    #[async_trait::async_trait]
    impl LlmProvider for FixedJsonProvider {
        async fn chat(
            &self,
            _req: sagent_providers::ChatRequest,
        ) -> sagent_domain::error::Result<sagent_providers::ChatResponse> {
            Ok(sagent_providers::ChatResponse {
                content: self.json.clone(),
                tool_calls: Vec::new(),
                usage: None,
                model: "fixed".to_string(),
                finish_reason: Some("stop".to_string()),
            })
        }

        async fn chat_stream(
            &self,
            _req: sagent_providers::ChatRequest,
        ) -> sagent_domain::error::Result<
            sagent_domain::stream::BoxStream<'static, sagent_domain::error::Result<sagent_domain::stream::StreamEvent>>,
        > {
            unimplemented!("not exercised by this test")
        }

        async fn embeddings(
            &self,
            _req: sagent_providers::EmbeddingsRequest,
        ) -> sagent_domain::error::Result<sagent_providers::EmbeddingsResponse> {
            unimplemented!("not exercised by this test")
        }

        fn capabilities(&self) -> &sagent_domain::capability::LlmCapabilities {
            &self.capabilities
        }

        fn provider_id(&self) -> &str {
            "fixed"
        }
    }

    #[tokio::test]
    async fn run_parses_provider_json_into_structured_output() {
        let provider: StdArc<dyn LlmProvider> = StdArc::new(FixedJsonProvider {
            capabilities: sagent_domain::capability::LlmCapabilities::default(),
            json: r#"{"message":"hi"}"#.to_string(),
        });
        let session = LanguageModelSession::new(provider, "reply with JSON");
        let step: Generate<String, Greeting> = Generate::new(|s: &String| Prompt::from_text(s.clone()));

        let result = with_session(session, || async { step.run("hi".to_string()).await })
            .await
            .unwrap();

        assert_eq!(
            result,
            Greeting {
                message: "hi".to_string()
            }
        );
    }
}
