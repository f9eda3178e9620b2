//! `execute` — spawn a command under a `SandboxConfiguration`, enforcing the
//! launch-refusal checks and the timeout escalation contract.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use sagent_domain::trace::TraceEvent;
use tokio::io::AsyncReadExt;
use tokio::process::Command;

use crate::config::SandboxConfiguration;
use crate::error::{Error, Result};
use crate::output::CapturedOutput;
use crate::platform;

const MAX_TIMEOUT_SEC: u64 = 86_400;
const ESCALATION_STEP: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub timed_out: bool,
}

/// Resolves `exe` against an absolute/relative path or `$PATH`. Returns
/// `None` if it cannot be found on disk, failing the whitelist check.
fn resolve_executable(exe: &str) -> Option<PathBuf> {
    let candidate = Path::new(exe);
    if candidate.is_absolute() || candidate.components().count() > 1 {
        return candidate.is_file().then(|| candidate.to_path_buf());
    }
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(exe))
        .find(|p| p.is_file())
}

/// The §4.3 launch-refusal checks, usable standalone by callers (like the
/// `Bash` tool) that drive their own `Command` rather than calling
/// [`execute`] outright.
pub fn check_launch(exe: &str, cwd: &Path, config: &SandboxConfiguration, timeout: Duration) -> Result<()> {
    if !config.disabled {
        resolve_executable(exe)
            .ok_or_else(|| Error::SandboxLaunchFailed(format!("'{exe}' is not on a resolved whitelist path")))?;
    }

    if !cwd.is_dir() {
        return Err(Error::SandboxLaunchFailed(format!(
            "working directory {} does not exist",
            cwd.display()
        )));
    }

    let timeout_sec = timeout.as_secs();
    if timeout_sec == 0 || timeout_sec > MAX_TIMEOUT_SEC {
        return Err(Error::SandboxLaunchFailed(format!(
            "timeout {timeout_sec}s is out of bounds (0, {MAX_TIMEOUT_SEC}]"
        )));
    }

    Ok(())
}

pub async fn execute(
    exe: &str,
    args: &[String],
    cwd: &Path,
    config: &SandboxConfiguration,
    timeout: Duration,
) -> Result<ExecutionOutcome> {
    check_launch(exe, cwd, config, timeout)?;
    let timeout_sec = timeout.as_secs();

    let started = std::time::Instant::now();
    let confinement = platform::plan(config, cwd)?;
    let mut cmd = confinement.wrap(exe, args);
    cmd.current_dir(cwd);
    cmd.stdout(std::process::Stdio::piped());
    cmd.stderr(std::process::Stdio::piped());
    cmd.stdin(std::process::Stdio::null());

    let mut child = cmd
        .spawn()
        .map_err(|e| Error::SandboxLaunchFailed(e.to_string()))?;

    let stdout_buf = Arc::new(Mutex::new(CapturedOutput::new()));
    let stderr_buf = Arc::new(Mutex::new(CapturedOutput::new()));

    let stdout_pipe = child.stdout.take();
    let stderr_pipe = child.stderr.take();

    let stdout_task = spawn_drain(stdout_pipe, stdout_buf.clone());
    let stderr_task = spawn_drain(stderr_pipe, stderr_buf.clone());

    let (exit_code, timed_out) = tokio::select! {
        result = child.wait() => {
            (result.ok().and_then(|s| s.code()), false)
        }
        _ = tokio::time::sleep(timeout) => {
            escalate(&mut child).await;
            (None, true)
        }
    };

    let _ = stdout_task.await;
    let _ = stderr_task.await;

    let stdout = Arc::try_unwrap(stdout_buf)
        .expect("drain task has completed and dropped its buffer handle")
        .into_inner()
        .finish();
    let stderr = Arc::try_unwrap(stderr_buf)
        .expect("drain task has completed and dropped its buffer handle")
        .into_inner()
        .finish();

    let duration_ms = started.elapsed().as_millis() as u64;
    let truncated = stdout.len() >= crate::output::MAX_OUTPUT_BYTES
        || stderr.len() >= crate::output::MAX_OUTPUT_BYTES;
    TraceEvent::SandboxExecuted {
        exe: exe.to_string(),
        exit_code,
        duration_ms,
        truncated,
    }
    .emit();

    if timed_out {
        return Err(Error::CommandTimedOut(timeout_sec));
    }

    Ok(ExecutionOutcome {
        stdout,
        stderr,
        exit_code,
        timed_out,
    })
}

fn spawn_drain(
    pipe: Option<impl tokio::io::AsyncRead + Unpin + Send + 'static>,
    buf: Arc<Mutex<CapturedOutput>>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if let Some(mut pipe) = pipe {
            let mut chunk = [0u8; 8192];
            loop {
                match pipe.read(&mut chunk).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => buf.lock().push(&chunk[..n]),
                }
            }
        }
    })
}

/// `SIGTERM` -> 500ms -> `SIGINT` -> 500ms -> `SIGKILL`.
pub async fn escalate(child: &mut tokio::process::Child) {
    #[cfg(unix)]
    {
        if let Some(pid) = child.id() {
            send_signal(pid, libc::SIGTERM);
            if wait_or_timeout(child, ESCALATION_STEP).await {
                return;
            }
            send_signal(pid, libc::SIGINT);
            if wait_or_timeout(child, ESCALATION_STEP).await {
                return;
            }
        }
    }
    let _ = child.kill().await;
}

#[cfg(unix)]
fn send_signal(pid: u32, sig: i32) {
    unsafe {
        libc::kill(pid as i32, sig);
    }
}

async fn wait_or_timeout(child: &mut tokio::process::Child, dur: Duration) -> bool {
    tokio::select! {
        _ = child.wait() => true,
        _ = tokio::time::sleep(dur) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NetworkPolicy;

    /// `standard()` but `Unrestricted`, so these generic capture/refusal/
    /// timeout tests never exercise the namespace-wrapping path in
    /// `platform::plan` — that path is covered by `platform`'s own tests.
    fn unrestricted_config() -> SandboxConfiguration {
        SandboxConfiguration {
            network_policy: NetworkPolicy::Unrestricted,
            ..SandboxConfiguration::standard()
        }
    }

    #[tokio::test]
    async fn refuses_unresolvable_executable() {
        let cfg = unrestricted_config();
        let cwd = std::env::current_dir().unwrap();
        let err = execute(
            "definitely-not-a-real-binary-xyz",
            &[],
            &cwd,
            &cfg,
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::SandboxLaunchFailed(_)));
    }

    #[tokio::test]
    async fn refuses_missing_cwd() {
        let cfg = unrestricted_config();
        let err = execute(
            "true",
            &[],
            Path::new("/no/such/directory/at/all"),
            &cfg,
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::SandboxLaunchFailed(_)));
    }

    #[tokio::test]
    async fn refuses_out_of_bounds_timeout() {
        let cfg = unrestricted_config();
        let cwd = std::env::current_dir().unwrap();
        let err = execute("true", &[], &cwd, &cfg, Duration::from_secs(0))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::SandboxLaunchFailed(_)));
    }

    #[tokio::test]
    async fn runs_a_simple_command_and_captures_output() {
        let cfg = unrestricted_config();
        let cwd = std::env::current_dir().unwrap();
        let outcome = execute(
            "echo",
            &["hello".to_string()],
            &cwd,
            &cfg,
            Duration::from_secs(5),
        )
        .await
        .unwrap();
        assert_eq!(outcome.exit_code, Some(0));
        assert!(outcome.stdout.contains("hello"));
        assert!(!outcome.timed_out);
    }

    #[tokio::test]
    async fn timeout_is_reported() {
        let cfg = unrestricted_config();
        let cwd = std::env::current_dir().unwrap();
        let err = execute(
            "sleep",
            &["5".to_string()],
            &cwd,
            &cfg,
            Duration::from_millis(200),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::CommandTimedOut(_)));
    }

    /// `standard()`'s `Local` network policy confines real launches on
    /// Linux via a network namespace. Skips rather than fails if this host
    /// can't create unprivileged user namespaces — that's a host capability,
    /// not something this test should assert either way.
    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn standard_preset_confines_network_on_linux_when_namespaces_are_available() {
        let cfg = SandboxConfiguration::standard();
        let cwd = std::env::current_dir().unwrap();
        let outcome = execute("echo", &["confined".to_string()], &cwd, &cfg, Duration::from_secs(5)).await;
        match outcome {
            Ok(o) => {
                assert_eq!(o.exit_code, Some(0));
                assert!(o.stdout.contains("confined"));
            }
            Err(Error::SandboxLaunchFailed(_)) => {
                // Unprivileged user namespaces unavailable on this host;
                // the refusal itself is the contract under test elsewhere.
            }
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    /// A file policy stricter than `WorkingDirOnly` is real confinement on
    /// macOS and a documented refusal everywhere else — never a silent
    /// pass-through.
    #[cfg(not(target_os = "macos"))]
    #[tokio::test]
    async fn file_confinement_is_refused_rather_than_ignored_off_macos() {
        let cfg = SandboxConfiguration::read_only();
        let cwd = std::env::current_dir().unwrap();
        let err = execute("echo", &["hi".to_string()], &cwd, &cfg, Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::SandboxUnavailable(_)));
    }
}
