//! Generation Steps (I): `GenerateText`/`Generate` leaf steps that bridge
//! the `Step` algebra (`sagent-step`) to an ambient `LanguageModelSession`
//! (`sagent-sessions::context`), plus the `Prompt`/`Structured` types they
//! build on.

pub mod generate;
pub mod prompt;
pub mod structured;
pub mod text;

pub use generate::Generate;
pub use prompt::{Prompt, PromptBuilder, PromptRepresentable};
pub use structured::Structured;
pub use text::{GenerateText, TextSnapshot};
