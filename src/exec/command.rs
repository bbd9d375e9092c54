// src/exec/command.rs

use std::path::Path;
use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::process::Command;
use tracing::debug;

/// Captured result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `-1` when the process was killed by a signal.
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }

    /// stdout followed by stderr, for tools that report on either.
    pub fn combined(&self) -> String {
        format!("{}{}", self.stdout, self.stderr)
    }
}

/// Run `program` with `args` in `cwd` and wait for it to exit.
///
/// Only failing to start the process is an error; a non-zero exit is
/// reported through [`CommandOutput::code`].
pub async fn run_command(program: &str, args: &[&str], cwd: &Path) -> Result<CommandOutput> {
    debug!(program, ?args, cwd = ?cwd, "running command");

    let output = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .with_context(|| format!("spawning `{program}`"))?;

    let result = CommandOutput {
        code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    };

    for line in result.stdout.lines() {
        debug!(program, "stdout: {}", line);
    }
    for line in result.stderr.lines() {
        debug!(program, "stderr: {}", line);
    }
    debug!(program, exit_code = result.code, "command exited");

    Ok(result)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_output_and_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let out = run_command("sh", &["-c", "echo out; echo err >&2; exit 3"], dir.path())
            .await
            .unwrap();
        assert_eq!(out.code, 3);
        assert!(!out.success());
        assert_eq!(out.stdout.trim(), "out");
        assert_eq!(out.stderr.trim(), "err");
        assert!(out.combined().contains("out"));
    }

    #[tokio::test]
    async fn missing_program_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = run_command("definitely-not-a-real-binary-xyz", &[], dir.path()).await;
        assert!(result.is_err());
    }
}
