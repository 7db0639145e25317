//! Process-backed sandbox: one fresh interpreter per invocation.

use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::debug;

use super::error::{SandboxFailure, SandboxResult};
use super::policy::ImportPolicy;
use super::prelude::{EXIT_RESOURCE, EXIT_SYNTAX, RUNNER_SOURCE};
use super::{CodeSandbox, SandboxInvocation, SandboxOutput};
use crate::metrics::METRICS;

/// Configuration for sandboxed code execution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SandboxConfig {
    /// Interpreter executable, resolved through `PATH`.
    pub interpreter: String,
    /// Wall-clock budget for one invocation (milliseconds).
    pub timeout_ms: u64,
    /// Largest accepted stdout, in bytes.
    pub max_output_bytes: usize,
    /// Address-space limit applied inside the interpreter (0 = none).
    pub memory_limit_mb: u64,
    /// Modules snippets may not import.
    pub imports: ImportPolicy,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            interpreter: "python3".to_string(),
            timeout_ms: 10_000,
            max_output_bytes: 64 * 1024,
            memory_limit_mb: 512,
            imports: ImportPolicy::default(),
        }
    }
}

/// Runs snippets in a short-lived Python process.
///
/// Each call gets its own interpreter, temporary working directory, and
/// cleared environment, so nothing a snippet defines or writes is visible to
/// the next call. One instance can be shared across concurrent cases.
#[derive(Debug, Clone)]
pub struct ProcessSandbox {
    config: SandboxConfig,
}

impl ProcessSandbox {
    pub fn new(config: SandboxConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    async fn execute(&self, code: &str) -> SandboxResult<SandboxOutput> {
        let started = Instant::now();

        self.config.imports.check(code)?;

        let workdir = tempfile::Builder::new()
            .prefix("numeval-sandbox-")
            .tempdir()
            .map_err(|e| SandboxFailure::resource(format!("create sandbox directory: {e}")))?;
        let runner_path = workdir.path().join("runner.py");
        let snippet_path = workdir.path().join("snippet.py");
        tokio::fs::write(&runner_path, RUNNER_SOURCE)
            .await
            .map_err(|e| SandboxFailure::resource(format!("write runner: {e}")))?;
        tokio::fs::write(&snippet_path, code)
            .await
            .map_err(|e| SandboxFailure::resource(format!("write snippet: {e}")))?;

        let mut command = Command::new(&self.config.interpreter);
        command
            .arg("-I")
            .arg("-B")
            .arg(&runner_path)
            .arg(&snippet_path)
            .arg(self.config.imports.as_arg())
            .arg(self.config.memory_limit_mb.to_string())
            .current_dir(workdir.path())
            .env_clear()
            .env("PATH", std::env::var_os("PATH").unwrap_or_default())
            .env("LANG", "C.UTF-8")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        #[cfg(unix)]
        command.process_group(0);

        let mut child = command.spawn().map_err(|e| {
            SandboxFailure::resource(format!(
                "failed to start interpreter '{}': {e}",
                self.config.interpreter
            ))
        })?;
        let _group = ProcessGroup::new(child.id());

        let stdout_pipe = child
            .stdout
            .take()
            .ok_or_else(|| SandboxFailure::resource("interpreter stdout not captured"))?;
        let stderr_pipe = child
            .stderr
            .take()
            .ok_or_else(|| SandboxFailure::resource("interpreter stderr not captured"))?;

        // Returning from here in any way kills the whole group.
        let cap = self.config.max_output_bytes;
        let limit = Duration::from_millis(self.config.timeout_ms);
        let collected = tokio::time::timeout(limit, async {
            let (stdout, stderr) = tokio::try_join!(
                read_capped(stdout_pipe, cap, "stdout"),
                read_capped(stderr_pipe, cap, "stderr"),
            )?;
            let status = child
                .wait()
                .await
                .map_err(|e| SandboxFailure::resource(format!("wait for interpreter: {e}")))?;
            Ok::<_, SandboxFailure>((status, stdout, stderr))
        })
        .await;
        let (status, stdout_bytes, stderr_bytes) = match collected {
            Ok(result) => result?,
            Err(_elapsed) => return Err(SandboxFailure::timeout(self.config.timeout_ms)),
        };

        let duration_ms = started.elapsed().as_millis() as u64;
        let stdout = String::from_utf8_lossy(&stdout_bytes).to_string();
        let stderr = String::from_utf8_lossy(&stderr_bytes).to_string();
        debug!(
            exit_code = ?status.code(),
            duration_ms,
            stdout_bytes = stdout_bytes.len(),
            "sandbox process exited"
        );

        match status.code() {
            Some(0) => Ok(SandboxOutput {
                stdout,
                duration_ms,
            }),
            Some(EXIT_SYNTAX) => Err(SandboxFailure::syntax(last_lines(&stderr, 5))),
            Some(EXIT_RESOURCE) => Err(SandboxFailure::resource(last_lines(&stderr, 5))),
            Some(code) => Err(SandboxFailure::runtime(format!(
                "exit code {code}: {}",
                last_lines(&stderr, 8)
            ))),
            None => Err(SandboxFailure::resource(
                "interpreter terminated by signal (resource limit exceeded)",
            )),
        }
    }
}

#[async_trait]
impl CodeSandbox for ProcessSandbox {
    async fn run(&self, invocation: &SandboxInvocation) -> SandboxResult<SandboxOutput> {
        METRICS.inc_sandbox_invocations();
        let result = self.execute(&invocation.code).await;
        if result.is_err() {
            METRICS.inc_sandbox_failures();
        }
        result
    }
}

/// Read a pipe to EOF, failing as soon as it yields more than `cap` bytes.
async fn read_capped<R>(pipe: R, cap: usize, stream: &str) -> SandboxResult<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    let mut limited = pipe.take((cap as u64).saturating_add(1));
    limited
        .read_to_end(&mut buf)
        .await
        .map_err(|e| SandboxFailure::resource(format!("read {stream}: {e}")))?;
    if buf.len() > cap {
        return Err(SandboxFailure::resource(format!(
            "{stream} exceeds the {cap} byte limit"
        )));
    }
    Ok(buf)
}

/// Kills the snippet's process group when dropped, so nothing it forked
/// outlives the invocation.
struct ProcessGroup {
    #[cfg_attr(not(unix), allow(dead_code))]
    leader: Option<u32>,
}

impl ProcessGroup {
    fn new(leader: Option<u32>) -> Self {
        Self { leader }
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        #[cfg(unix)]
        if let Some(pid) = self.leader {
            use nix::sys::signal::{killpg, Signal};
            use nix::unistd::Pid;

            match killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
                Ok(()) | Err(nix::errno::Errno::ESRCH) => {}
                Err(e) => debug!(pid, error = %e, "failed to kill sandbox process group"),
            }
        }
    }
}

/// The final `n` lines of `text`, trimmed.
fn last_lines(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.trim_end().lines().collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].join("\n")
}
