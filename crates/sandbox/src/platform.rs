//! Maps `SandboxConfiguration`'s network/file policy onto the host's actual
//! process-sandbox primitive. There is no portable, dependency-free sandboxing
//! API in the ecosystem this crate draws on, so enforcement is platform-gated:
//! macOS gets a generated Seatbelt profile (`sandbox-exec`) covering both
//! network and file policy; Linux gets network-namespace confinement
//! (`unshare --net`) for network policy only. A policy this host cannot
//! actually enforce is refused, never silently permitted.

use std::path::Path;

use tokio::process::Command;

use crate::config::{FilePolicy, NetworkPolicy, SandboxConfiguration};
use crate::error::{Error, Result};

/// How a launch is confined, chosen by [`plan`] for one call to `execute`.
pub enum Confinement {
    /// No wrapping needed: the policy is already satisfied (or
    /// `config.disabled`).
    None,
    /// Re-exec under `unshare --user --map-root-user --net -- <argv>`: a
    /// private network namespace with only loopback configured.
    LinuxNetNamespace,
    /// Re-exec under `sandbox-exec -p <profile> -- <argv>`.
    MacSeatbelt { profile: String },
}

impl Confinement {
    /// Builds the `Command` that launches `exe`/`args` under this
    /// confinement. Both wrappers `exec()` into the target in place, so the
    /// resulting child's pid is the target program's pid, not the wrapper's —
    /// the SIGTERM/SIGINT/SIGKILL escalation in [`crate::executor`] keeps
    /// working unchanged.
    pub fn wrap(&self, exe: &str, args: &[String]) -> Command {
        match self {
            Confinement::None => {
                let mut cmd = Command::new(exe);
                cmd.args(args);
                cmd
            }
            Confinement::LinuxNetNamespace => {
                let mut cmd = Command::new("unshare");
                cmd.args(["--user", "--map-root-user", "--net", "--"]);
                cmd.arg(exe);
                cmd.args(args);
                cmd
            }
            Confinement::MacSeatbelt { profile } => {
                let mut cmd = Command::new("sandbox-exec");
                cmd.args(["-p", profile, "--"]);
                cmd.arg(exe);
                cmd.args(args);
                cmd
            }
        }
    }
}

fn needs_network_confinement(policy: &NetworkPolicy) -> bool {
    !matches!(policy, NetworkPolicy::Unrestricted)
}

fn needs_file_confinement(policy: &FilePolicy) -> bool {
    !matches!(policy, FilePolicy::WorkingDirOnly)
}

/// Builds a Seatbelt profile enforcing `config`'s network and file policy.
/// `cwd` stays readable/writable under every `FilePolicy` — confinement
/// narrows access beyond the working directory, it never excludes it.
pub fn macos_profile(config: &SandboxConfiguration, cwd: &Path) -> String {
    let mut rules = vec!["(version 1)".to_string(), "(allow default)".to_string()];
    let cwd_str = cwd.display().to_string();

    match config.network_policy {
        NetworkPolicy::Unrestricted => {}
        NetworkPolicy::Local => {
            rules.push("(deny network*)".to_string());
            rules.push("(allow network* (local ip \"localhost:*\"))".to_string());
            rules.push("(allow network* (remote ip \"localhost:*\"))".to_string());
        }
        NetworkPolicy::None => {
            rules.push("(deny network*)".to_string());
        }
    }

    match &config.file_policy {
        FilePolicy::WorkingDirOnly => {}
        FilePolicy::ReadOnly => {
            rules.push("(deny file-write*)".to_string());
            rules.push(format!("(allow file-write* (subpath \"{cwd_str}\"))"));
        }
        FilePolicy::Custom { read, write } => {
            rules.push("(deny file-read* (subpath \"/\"))".to_string());
            rules.push(
                "(allow file-read* (subpath \"/usr\") (subpath \"/System\") (subpath \"/Library\") (subpath \"/bin\") (subpath \"/private/etc\"))"
                    .to_string(),
            );
            rules.push(format!("(allow file-read* (subpath \"{cwd_str}\"))"));
            for p in read {
                rules.push(format!("(allow file-read* (subpath \"{}\"))", p.display()));
            }
            rules.push("(deny file-write*)".to_string());
            rules.push(format!("(allow file-write* (subpath \"{cwd_str}\"))"));
            for p in write {
                rules.push(format!("(allow file-write* (subpath \"{}\"))", p.display()));
            }
        }
    }

    rules.join("\n")
}

/// Chooses how to confine a launch under `config`, or refuses with
/// [`Error::SandboxUnavailable`] when this host has no primitive able to
/// honor the requested policy. `config.disabled` and `allow_subprocesses`
/// are the caller's concern (see `executor::check_launch`); this only maps
/// policy to mechanism.
pub fn plan(config: &SandboxConfiguration, cwd: &Path) -> Result<Confinement> {
    if config.disabled {
        return Ok(Confinement::None);
    }

    let network_confined = needs_network_confinement(&config.network_policy);
    let file_confined = needs_file_confinement(&config.file_policy);

    if !network_confined && !file_confined {
        return Ok(Confinement::None);
    }

    if cfg!(target_os = "macos") {
        return Ok(Confinement::MacSeatbelt {
            profile: macos_profile(config, cwd),
        });
    }

    if cfg!(target_os = "linux") {
        if file_confined {
            return Err(Error::SandboxUnavailable(format!(
                "file policy {:?} requires OS-level filesystem confinement; this host only enforces network policy (via network namespaces), not file policy",
                config.file_policy
            )));
        }
        return Ok(Confinement::LinuxNetNamespace);
    }

    Err(Error::SandboxUnavailable(format!(
        "no process-sandbox primitive on this host can enforce network={:?} / file={:?}",
        config.network_policy, config.file_policy
    )))
}
