//! An in-tree provider for tests and examples. Echoes a deterministic
//! response derived from the last user message instead of calling out to a
//! real vendor API — concrete wire protocols are out of scope for this
//! crate (see `traits::LlmProvider`).

use futures_util::stream;
use sagent_domain::capability::{LlmCapabilities, ToolSupport};
use sagent_domain::error::Result;
use sagent_domain::stream::{BoxStream, StreamEvent, Usage};
use sagent_domain::tool::Role;

fn last_user_text(req: &ChatRequest) -> String {
    req.messages
        .iter()
        .rev()
        .find(|m| m.role == Role::User)
        .map(|m| m.content.extract_all_text())
        .unwrap_or_default()
}

use crate::traits::{ChatRequest, ChatResponse, EmbeddingsRequest, EmbeddingsResponse, LlmProvider};

/// Deterministic stand-in for a real vendor adapter.
///
/// `chat` returns `{prefix}{last user message}`; `embeddings` hashes each
/// input string into a fixed-width vector. Neither makes network calls.
pub struct MockProvider {
    id: String,
    prefix: String,
    capabilities: LlmCapabilities,
}

impl MockProvider {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            prefix: "echo: ".to_string(),
            capabilities: LlmCapabilities {
                supports_tools: ToolSupport::Basic,
                supports_streaming: true,
                supports_json_mode: true,
                supports_vision: false,
                context_window_tokens: Some(128_000),
                max_output_tokens: Some(4_096),
            },
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    fn reply_for(&self, req: &ChatRequest) -> String {
        format!("{}{}", self.prefix, last_user_text(req))
    }
}

#[async_trait::async_trait]
impl LlmProvider for MockProvider {
    async fn chat(&self, req: ChatRequest) -> Result<ChatResponse> {
        let content = self.reply_for(&req);
        let prompt_tokens = req.messages.len() as u32 * 4;
        let completion_tokens = content.split_whitespace().count() as u32;
        Ok(ChatResponse {
            content: content.clone(),
            tool_calls: Vec::new(),
            usage: Some(Usage {
                prompt_tokens,
                completion_tokens,
                total_tokens: prompt_tokens + completion_tokens,
            }),
            model: req.model.unwrap_or_else(|| self.id.clone()),
            finish_reason: Some("stop".to_string()),
        })
    }

    async fn chat_stream(
        &self,
        req: ChatRequest,
    ) -> Result<BoxStream<'static, Result<StreamEvent>>> {
        let content = self.reply_for(&req);
        let mut events: Vec<Result<StreamEvent>> = Vec::new();
        for word in content.split_inclusive(' ') {
            events.push(Ok(StreamEvent::Token {
                text: word.to_string(),
            }));
        }
        events.push(Ok(StreamEvent::Done {
            usage: None,
            finish_reason: Some("stop".to_string()),
        }));
        Ok(Box::pin(stream::iter(events)))
    }

    async fn embeddings(&self, req: EmbeddingsRequest) -> Result<EmbeddingsResponse> {
        let embeddings = req
            .input
            .iter()
            .map(|text| {
                let mut vec = vec![0.0f32; 8];
                for (i, byte) in text.bytes().enumerate() {
                    vec[i % 8] += byte as f32 / 255.0;
                }
                vec
            })
            .collect();
        Ok(EmbeddingsResponse { embeddings })
    }

    fn capabilities(&self) -> &LlmCapabilities {
        &self.capabilities
    }

    fn provider_id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sagent_domain::tool::Message;

    #[tokio::test]
    async fn chat_echoes_last_user_message() {
        let provider = MockProvider::new("mock-1");
        let req = ChatRequest {
            messages: vec![Message::user("hello")],
            ..Default::default()
        };
        let resp = provider.chat(req).await.unwrap();
        assert_eq!(resp.content, "echo: hello");
    }

    #[tokio::test]
    async fn chat_stream_emits_tokens_then_done() {
        let provider = MockProvider::new("mock-1");
        let req = ChatRequest {
            messages: vec![Message::user("a b")],
            ..Default::default()
        };
        let mut stream = provider.chat_stream(req).await.unwrap();
        let mut chunks = Vec::new();
        use futures_util::StreamExt;
        while let Some(ev) = stream.next().await {
            chunks.push(ev.unwrap());
        }
        assert!(matches!(chunks.last().unwrap(), StreamEvent::Done { .. }));
    }
}
