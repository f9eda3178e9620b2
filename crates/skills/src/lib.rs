//! Skills Facade (L): progressive-disclosure skill activation with dynamic,
//! reference-counted permission grants.
//!
//! Discovery loads only metadata (`SkillsRegistry::load`); activation reads
//! a skill's full `SKILL.md` body on demand and — when its manifest names
//! `tools` — grants those patterns into a session-scoped permission list for
//! as long as the skill stays active.

pub mod activation;
pub mod loader;
pub mod manifest;
pub mod registry;
pub mod types;

pub use activation::{activate, deactivate, ActivatedSkill, SkillPermissions};
pub use manifest::{ReadinessStatus, SkillManifest, SkillReadiness};
pub use registry::{ReadinessSummary, SkillsRegistry};
pub use types::{RiskTier, SkillEntry};
