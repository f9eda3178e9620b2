//! Sandbox configuration: network/file policy and named presets.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetworkPolicy {
    /// Deny all sockets.
    None,
    /// Permit only loopback.
    Local,
    /// No restriction.
    Unrestricted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilePolicy {
    /// Permit reads under system paths + working dir; deny all writes.
    ReadOnly,
    /// Reads unrestricted; writes only within the working dir and a temp root.
    WorkingDirOnly,
    /// Explicit allow-lists plus system read paths.
    Custom {
        read: Vec<PathBuf>,
        write: Vec<PathBuf>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SandboxConfiguration {
    pub network_policy: NetworkPolicy,
    pub file_policy: FilePolicy,
    pub allow_subprocesses: bool,
    pub timeout_sec: u64,
    pub disabled: bool,
}

impl SandboxConfiguration {
    /// Reads everywhere, writes nowhere, no network, no subprocesses.
    pub fn read_only() -> Self {
        Self {
            network_policy: NetworkPolicy::None,
            file_policy: FilePolicy::ReadOnly,
            allow_subprocesses: false,
            timeout_sec: 120,
            disabled: false,
        }
    }

    /// Working-directory writes, loopback network, subprocesses allowed.
    pub fn standard() -> Self {
        Self {
            network_policy: NetworkPolicy::Local,
            file_policy: FilePolicy::WorkingDirOnly,
            allow_subprocesses: true,
            timeout_sec: 300,
            disabled: false,
        }
    }

    /// Tightest preset: no network, no subprocesses, read-only filesystem.
    pub fn restrictive() -> Self {
        Self {
            network_policy: NetworkPolicy::None,
            file_policy: FilePolicy::ReadOnly,
            allow_subprocesses: false,
            timeout_sec: 60,
            disabled: false,
        }
    }

    /// Standard, but with networking denied.
    pub fn no_network() -> Self {
        Self {
            network_policy: NetworkPolicy::None,
            ..Self::standard()
        }
    }

    /// Transparent pass-through; `execute` skips all enforcement.
    pub fn disabled() -> Self {
        Self {
            network_policy: NetworkPolicy::Unrestricted,
            file_policy: FilePolicy::WorkingDirOnly,
            allow_subprocesses: true,
            timeout_sec: 86400,
            disabled: true,
        }
    }
}

impl Default for SandboxConfiguration {
    fn default() -> Self {
        Self::standard()
    }
}
