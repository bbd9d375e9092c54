// src/exec/glab.rs

use std::path::PathBuf;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::errors::{MinipipeError, Result};
use crate::exec::backend::{BoxFuture, CiRemote, PipelineStatus};
use crate::exec::command::run_command;

const RUNNING: &str = "Pipeline State: running";
const FAILED_MARKER: &str = "(failed)";
const COLUMN_SEPARATOR: &str = "\t\t";
const NO_OPEN_MR: &str = "No open merge requests match your search";

static PIPELINE_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"https?://\S+").expect("valid pipeline url regex"));

/// [`CiRemote`] backed by the GitLab CLI (`glab`).
#[derive(Debug, Clone)]
pub struct GlabCli {
    workdir: PathBuf,
}

impl GlabCli {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
        }
    }
}

impl CiRemote for GlabCli {
    fn ensure_ready(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let output = run_command("glab", &["auth", "status"], &self.workdir)
                .await
                .map_err(|err| {
                    MinipipeError::Remote(format!("glab (GitLab CLI) is not available: {err:#}"))
                })?;
            check_auth_status(&output.stderr)
        })
    }

    fn pipeline_status<'a>(&'a self, reference: &'a str) -> BoxFuture<'a, Result<PipelineStatus>> {
        Box::pin(async move {
            info!(reference, "reading pipeline status");
            let branch = format!("--branch={reference}");
            let output = run_command("glab", &["ci", "status", branch.as_str()], &self.workdir).await?;
            if !output.success() && output.stdout.trim().is_empty() {
                return Err(MinipipeError::Remote(format!(
                    "`glab ci status {branch}` failed: {}",
                    output.stderr.trim()
                )));
            }
            let status = parse_pipeline_status(&output.stdout);
            debug!(?status, "pipeline status");
            Ok(status)
        })
    }

    fn has_open_merge_request<'a>(&'a self, branch: &'a str) -> BoxFuture<'a, Result<bool>> {
        Box::pin(async move {
            let source = format!("--source-branch={branch}");
            let output = run_command("glab", &["mr", "list", source.as_str()], &self.workdir).await?;
            Ok(!output.stdout.contains(NO_OPEN_MR))
        })
    }

    fn run_pipeline<'a>(&'a self, branch: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            warn!(branch, "no open merge request for this branch, starting a pipeline");
            let output = run_command("glab", &["ci", "run", "-b", branch], &self.workdir).await?;
            if !output.success() {
                return Err(MinipipeError::Remote(format!(
                    "cannot start a pipeline for '{branch}', please run it manually: {}",
                    output.stderr.trim()
                )));
            }
            debug!("{}", output.stdout.trim());
            Ok(())
        })
    }
}

/// Interpret `glab auth status` stderr.
///
/// A missing binary shows up as a shell-style "not found"; a failed check
/// is a line starting with `x`.
fn check_auth_status(stderr: &str) -> Result<()> {
    if stderr.contains("No such file or directory") || stderr.contains("not found") {
        return Err(MinipipeError::Remote(
            "glab (GitLab CLI) is missing, install it and retry".to_string(),
        ));
    }
    if stderr.lines().any(|line| line.trim().starts_with('x')) {
        return Err(MinipipeError::Remote(
            "glab is not logged in, see https://gitlab.com/gitlab-org/cli#authentication"
                .to_string(),
        ));
    }
    Ok(())
}

/// Parse `glab ci status` output.
///
/// Failed jobs are the lines marked `(failed)`; the job name is the second
/// tab-separated column.
pub fn parse_pipeline_status(stdout: &str) -> PipelineStatus {
    let failed_jobs = stdout
        .lines()
        .filter(|line| line.contains(FAILED_MARKER) && line.contains(COLUMN_SEPARATOR))
        .filter_map(|line| line.split(COLUMN_SEPARATOR).nth(1))
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect();

    let url = stdout
        .lines()
        .find_map(|line| PIPELINE_URL.find(line))
        .map(|m| m.as_str().to_string());

    PipelineStatus {
        running: stdout.contains(RUNNING),
        failed_jobs,
        url,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATUS: &str = "(success) • 00m 40s\t\tcompile\n\
(failed) • 01m 02s\t\tpkg: [f2]\n\
(failed) • 00m 10s\t\tlint \n\
(skipped) • 00m 00s\t\tdeploy\n\
\n\
https://gitlab.com/group/project/-/pipelines/123456\n\
SHA: abcdef\n\
Pipeline State: failed\n";

    #[test]
    fn parses_failed_jobs_and_url() {
        let status = parse_pipeline_status(STATUS);
        assert_eq!(status.failed_jobs, vec!["pkg: [f2]", "lint"]);
        assert_eq!(
            status.url.as_deref(),
            Some("https://gitlab.com/group/project/-/pipelines/123456")
        );
        assert!(!status.running);
    }

    #[test]
    fn detects_running_pipeline() {
        let status = parse_pipeline_status("Pipeline State: running\n");
        assert!(status.running);
        assert!(status.failed_jobs.is_empty());
        assert_eq!(status.url, None);
    }

    #[test]
    fn auth_status() {
        assert!(check_auth_status("gitlab.com\n  ✓ Logged in to gitlab.com as dev\n").is_ok());
        assert!(matches!(
            check_auth_status("gitlab.com\n  x gitlab.com: api call failed\n"),
            Err(MinipipeError::Remote(msg)) if msg.contains("not logged in")
        ));
        assert!(matches!(
            check_auth_status("sh: glab: not found"),
            Err(MinipipeError::Remote(msg)) if msg.contains("missing")
        ));
    }
}
