// src/exec/git.rs

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::errors::{MinipipeError, Result};
use crate::exec::backend::{BoxFuture, VersionControl};
use crate::exec::command::{run_command, CommandOutput};

const NOTHING_TO_STASH: &str = "No local changes to save";

/// [`VersionControl`] backed by the `git` binary.
#[derive(Debug, Clone)]
pub struct GitCli {
    workdir: PathBuf,
}

impl GitCli {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
        }
    }

    async fn git(&self, args: &[&str]) -> Result<CommandOutput> {
        let output = run_command("git", args, &self.workdir).await?;
        if !output.success() {
            return Err(MinipipeError::Vcs(format!(
                "`git {}` exited with {}: {}",
                args.join(" "),
                output.code,
                output.stderr.trim()
            )));
        }
        Ok(output)
    }
}

impl VersionControl for GitCli {
    fn head_commit(&self) -> BoxFuture<'_, Result<String>> {
        Box::pin(async move {
            let output = self.git(&["rev-parse", "HEAD"]).await?;
            Ok(output.stdout.trim().to_string())
        })
    }

    fn current_branch(&self) -> BoxFuture<'_, Result<String>> {
        Box::pin(async move {
            let output = self.git(&["rev-parse", "--abbrev-ref", "HEAD"]).await?;
            Ok(output.stdout.trim().to_string())
        })
    }

    fn stash(&self) -> BoxFuture<'_, Result<bool>> {
        Box::pin(async move {
            let output = self.git(&["stash"]).await?;
            if output.combined().contains(NOTHING_TO_STASH) {
                debug!("nothing to stash");
                return Ok(false);
            }
            info!("{}", output.stdout.trim());
            Ok(true)
        })
    }

    fn stash_pop(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            self.git(&["stash", "pop"]).await?;
            Ok(())
        })
    }

    fn add<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let path = path.to_string_lossy().into_owned();
            self.git(&["add", path.as_str()]).await?;
            Ok(())
        })
    }

    fn commit<'a>(&'a self, message: &'a str, no_verify: bool) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let mut args = vec!["commit", "-m", message];
            if no_verify {
                args.push("--no-verify");
            }
            self.git(&args).await?;
            Ok(())
        })
    }

    fn force_push<'a>(&'a self, remote: &'a str, branch: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.git(&["push", "-f", remote, branch]).await.map_err(|err| {
                MinipipeError::Vcs(format!(
                    "{err}; to start from a new branch, read its failed jobs with `--failed-from {branch}`"
                ))
            })?;
            info!(remote, branch, "pushed");
            Ok(())
        })
    }

    fn reset_hard<'a>(&'a self, commit: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.git(&["reset", "--hard", commit]).await?;
            Ok(())
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;

    async fn repo() -> Option<(tempfile::TempDir, GitCli)> {
        let dir = tempfile::tempdir().unwrap();
        let git = GitCli::new(dir.path());
        // Skip when git is not available.
        git.git(&["init", "-q"]).await.ok()?;
        git.git(&["config", "user.email", "dev@example.com"]).await.ok()?;
        git.git(&["config", "user.name", "dev"]).await.ok()?;
        fs::write(dir.path().join("a.yml"), "a: 1\n").unwrap();
        git.add(Path::new(".")).await.ok()?;
        git.commit("initial", true).await.ok()?;
        Some((dir, git))
    }

    #[tokio::test]
    async fn stash_reports_whether_anything_was_saved() {
        let Some((dir, git)) = repo().await else {
            return;
        };
        assert!(!git.stash().await.unwrap());

        fs::write(dir.path().join("a.yml"), "a: 2\n").unwrap();
        assert!(git.stash().await.unwrap());
        assert_eq!(fs::read_to_string(dir.path().join("a.yml")).unwrap(), "a: 1\n");

        git.stash_pop().await.unwrap();
        assert_eq!(fs::read_to_string(dir.path().join("a.yml")).unwrap(), "a: 2\n");
    }

    #[tokio::test]
    async fn reset_hard_returns_to_a_commit() {
        let Some((dir, git)) = repo().await else {
            return;
        };
        let head = git.head_commit().await.unwrap();
        assert_eq!(head.len(), 40);

        fs::write(dir.path().join("a.yml"), "a: 3\n").unwrap();
        git.add(Path::new(".")).await.unwrap();
        git.commit("change", true).await.unwrap();
        assert_ne!(git.head_commit().await.unwrap(), head);

        git.reset_hard(&head).await.unwrap();
        assert_eq!(git.head_commit().await.unwrap(), head);
        assert_eq!(fs::read_to_string(dir.path().join("a.yml")).unwrap(), "a: 1\n");
    }

    #[tokio::test]
    async fn failures_carry_the_command() {
        let Some((_dir, git)) = repo().await else {
            return;
        };
        match git.reset_hard("not-a-commit").await {
            Err(MinipipeError::Vcs(msg)) => assert!(msg.contains("git reset --hard")),
            other => panic!("expected Vcs error, got {:?}", other),
        }
    }
}
