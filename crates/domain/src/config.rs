//! Serde-roundtrippable configuration shared by tool implementations and
//! the session-routing layer. Each nested config struct follows the same
//! `Default` + `#[serde(default = "...")]` per-field idiom as the rest of
//! the workspace.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

fn default_background_ms() -> u64 {
    2_000
}

fn default_timeout_sec() -> u64 {
    300
}

fn default_max_output_chars() -> usize {
    1024 * 1024
}

fn default_cleanup_ms() -> u64 {
    60 * 60 * 1000
}

/// Configuration for the built-in `exec`/`process` tool pair
/// (`sagent-tools::exec`, `sagent-tools::manager`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecConfig {
    /// How long a foreground `exec` waits before auto-backgrounding.
    #[serde(default = "default_background_ms")]
    pub background_ms: u64,
    /// Hard timeout for a single command.
    #[serde(default = "default_timeout_sec")]
    pub timeout_sec: u64,
    /// Output buffer cap before middle-truncation, per process.
    #[serde(default = "default_max_output_chars")]
    pub max_output_chars: usize,
    /// How long a finished session is kept before `cleanup_stale` evicts it.
    #[serde(default = "default_cleanup_ms")]
    pub cleanup_ms: u64,
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            background_ms: default_background_ms(),
            timeout_sec: default_timeout_sec(),
            max_output_chars: default_max_output_chars(),
            cleanup_ms: default_cleanup_ms(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Session routing / identity / lifecycle configuration
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Inbound message metadata used to compute a session key and evaluate
/// identity links (`sagent-sessions::session_key`/`identity`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InboundMetadata {
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default)]
    pub peer_id: Option<String>,
    #[serde(default)]
    pub group_id: Option<String>,
    #[serde(default)]
    pub channel_id: Option<String>,
    #[serde(default)]
    pub thread_id: Option<String>,
    #[serde(default)]
    pub is_direct: bool,
}

/// How a direct-message session key is scoped relative to channel/account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DmScope {
    /// One session per agent, regardless of peer.
    Main,
    /// One session per peer, shared across channels.
    PerPeer,
    /// One session per (channel, peer) pair.
    PerChannelPeer,
    /// One session per (channel, account, peer) triple.
    PerAccountChannelPeer,
}

impl Default for DmScope {
    fn default() -> Self {
        DmScope::PerChannelPeer
    }
}

/// A configured identity link: one canonical identity spanning several raw
/// channel-prefixed peer IDs (`telegram:123`, `discord:987`, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityLink {
    pub canonical: String,
    pub peer_ids: Vec<String>,
}

/// Per-type or per-channel override of the global reset parameters. `None`
/// fields fall back to the next tier down (channel -> type -> global).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResetOverride {
    #[serde(default)]
    pub daily_reset_hour: Option<u8>,
    #[serde(default)]
    pub idle_minutes: Option<u32>,
}

/// Session reset lifecycle configuration: a daily boundary hour and/or an
/// idle timeout, with per-message-type and per-channel overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LifecycleConfig {
    #[serde(default)]
    pub daily_reset_hour: Option<u8>,
    #[serde(default)]
    pub idle_minutes: Option<u32>,
    #[serde(default)]
    pub reset_by_type: HashMap<String, ResetOverride>,
    #[serde(default)]
    pub reset_by_channel: HashMap<String, ResetOverride>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_use_defaults() {
        let cfg: ExecConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.background_ms, 2_000);
        assert_eq!(cfg.timeout_sec, 300);
    }

    #[test]
    fn lifecycle_config_defaults_to_no_overrides() {
        let cfg: LifecycleConfig = serde_json::from_str("{}").unwrap();
        assert!(cfg.daily_reset_hour.is_none());
        assert!(cfg.reset_by_type.is_empty());
    }
}
