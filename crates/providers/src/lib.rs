//! The [`LlmProvider`] trait and capability types consumed by Generation
//! Steps, plus a single in-tree mock/test provider. Concrete wire protocols
//! for real vendors (Anthropic, OpenAI, etc.) are out of scope here — a
//! production deployment supplies its own `LlmProvider` impl and registers
//! it with a [`ProviderRegistry`].

pub mod mock;
pub mod registry;
pub mod traits;

pub use mock::MockProvider;
pub use registry::ProviderRegistry;
pub use traits::{ChatRequest, ChatResponse, EmbeddingsRequest, EmbeddingsResponse, LlmProvider};
