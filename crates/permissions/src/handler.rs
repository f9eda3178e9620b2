//! Interactive decision handler, injected per session and never persisted
//! in the configuration itself.

use crate::rules::InteractiveDecision;

#[async_trait::async_trait]
pub trait PermissionHandler: Send + Sync {
    async fn request_decision(
        &self,
        tool_name: &str,
        arg: Option<&str>,
        context: &str,
    ) -> InteractiveDecision;
}

/// A handler for non-interactive transports: every `ask` resolves to
/// `PermissionDenied{reason: "no handler"}`.
pub struct NoHandler;

#[async_trait::async_trait]
impl PermissionHandler for NoHandler {
    async fn request_decision(
        &self,
        _tool_name: &str,
        _arg: Option<&str>,
        _context: &str,
    ) -> InteractiveDecision {
        InteractiveDecision::Cancel
    }
}
