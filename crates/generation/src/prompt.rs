//! Prompt / Instructions: an ordered sequence of text segments,
//! assembled by a small segment builder (static strings, conditionals,
//! loops over values) and immutable once built.

/// An assembled prompt. Value semantics; segments render joined by a blank
/// line, mirroring how instructions/prompt text is typically laid out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Prompt {
    segments: Vec<String>,
}

impl Prompt {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            segments: vec![text.into()],
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Joins all segments into the text actually sent to the model.
    pub fn render(&self) -> String {
        self.segments.join("\n\n")
    }

    pub fn is_empty(&self) -> bool {
        self.segments.iter().all(|s| s.is_empty())
    }
}

/// Implemented by input types that can derive their own prompt, so
/// `GenerateText<I>`/`Generate<I,O>` can skip an explicit builder closure.
pub trait PromptRepresentable {
    fn to_prompt(&self) -> Prompt;
}

impl PromptRepresentable for String {
    fn to_prompt(&self) -> Prompt {
        Prompt::from_text(self.clone())
    }
}

impl PromptRepresentable for Prompt {
    fn to_prompt(&self) -> Prompt {
        self.clone()
    }
}

/// Builds a `Prompt` from static strings, conditional segments, and
/// segments derived from an iterable. Consumed by `.build()`; the
/// `Prompt` it returns is immutable.
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    segments: Vec<String>,
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a static segment unconditionally.
    pub fn text(mut self, segment: impl Into<String>) -> Self {
        self.segments.push(segment.into());
        self
    }

    /// Appends a segment only when `condition` holds.
    pub fn when(mut self, condition: bool, segment: impl Into<String>) -> Self {
        if condition {
            self.segments.push(segment.into());
        }
        self
    }

    /// Appends one segment per item, in iteration order.
    pub fn for_each<T>(
        mut self,
        items: impl IntoIterator<Item = T>,
        render: impl Fn(T) -> String,
    ) -> Self {
        for item in items {
            self.segments.push(render(item));
        }
        self
    }

    pub fn build(self) -> Prompt {
        Prompt {
            segments: self.segments,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_assembles_segments_in_order() {
        let prompt = PromptBuilder::new()
            .text("Header")
            .when(false, "skipped")
            .when(true, "kept")
            .for_each(vec!["a", "b"], |s| format!("- {s}"))
            .build();

        assert_eq!(prompt.segments(), &["Header", "kept", "- a", "- b"]);
        assert_eq!(prompt.render(), "Header\n\nkept\n\n- a\n\n- b");
    }

    #[test]
    fn string_derives_its_own_prompt() {
        let prompt = "hello".to_string().to_prompt();
        assert_eq!(prompt.render(), "hello");
    }
}
