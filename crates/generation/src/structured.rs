//! Structured-output schemas: `O`'s shape is reflected declaratively via a
//! hand-authored JSON Schema (mirroring
//! `sagent_domain::tool::ToolDefinition::parameters`), and a `Partial`
//! sibling type with every field optional backs the streaming
//! "partially generated" view.

use serde::de::DeserializeOwned;

/// Implemented by a type usable as the output of `Generate<I,O>`.
///
/// `Partial` is the type streamed through `on_stream`: the same fields as
/// `Self`, but all optional, filling in monotonically as generation
/// progresses.
pub trait Structured: DeserializeOwned + Send + Sync + 'static {
    type Partial: Default + DeserializeOwned + Send + Sync + 'static;

    /// JSON Schema describing `Self`'s shape, sent to the provider so it
    /// knows what structure to emit.
    fn json_schema() -> serde_json::Value;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Answer {
        text: String,
        confidence: f32,
    }

    #[derive(Debug, Default, Deserialize)]
    struct AnswerPartial {
        text: Option<String>,
        confidence: Option<f32>,
    }

    impl Structured for Answer {
        type Partial = AnswerPartial;

        fn json_schema() -> serde_json::Value {
            serde_json::json!({
                "type": "object",
                "properties": {
                    "text": { "type": "string" },
                    "confidence": { "type": "number" }
                },
                "required": ["text", "confidence"]
            })
        }
    }

    #[test]
    fn schema_round_trips_through_serde_json() {
        let schema = Answer::json_schema();
        assert_eq!(schema["type"], "object");
    }

    #[test]
    fn partial_defaults_to_all_absent() {
        let partial = AnswerPartial::default();
        assert!(partial.text.is_none());
        assert!(partial.confidence.is_none());
    }
}
