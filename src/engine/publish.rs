// src/engine/publish.rs

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinError;
use tracing::{error, info, warn};

use crate::config::ConfigFile;
use crate::document::DocumentStore;
use crate::engine::restore::RestorePoint;
use crate::errors::{MinipipeError, Result};
use crate::exec::{CiRemote, VersionControl};
use crate::transform::RewrittenDocument;

const MESSAGE_LIMIT: usize = 80;
const MESSAGE_KEEP: usize = 75;

/// Commit message for the throwaway commit, shortened to fit one line.
pub fn commit_message(prefix: &str, targets: &[String]) -> String {
    let message = format!("{prefix}{}", targets.join(","));
    if message.chars().count() > MESSAGE_LIMIT {
        let kept: String = message.chars().take(MESSAGE_KEEP).collect();
        format!("{kept} ...")
    } else {
        message
    }
}

/// Knobs for one publish.
#[derive(Debug, Clone)]
pub struct PublishOptions {
    pub remote: String,
    pub message: String,
    pub no_verify: bool,
    /// Pause between the push and the merge-request check, so the remote
    /// has registered the push.
    pub settle: Duration,
}

impl PublishOptions {
    pub fn from_config(cfg: &ConfigFile, message: String, no_verify: bool) -> Self {
        Self {
            remote: cfg.config().remote.clone(),
            message,
            no_verify,
            settle: Duration::from_secs(cfg.config().settle_secs),
        }
    }
}

/// Runs the publish transaction against a version control and CI remote.
#[derive(Clone)]
pub struct Publisher {
    vcs: Arc<dyn VersionControl>,
    remote: Arc<dyn CiRemote>,
}

impl std::fmt::Debug for Publisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Publisher").finish_non_exhaustive()
    }
}

impl Publisher {
    pub fn new(vcs: Arc<dyn VersionControl>, remote: Arc<dyn CiRemote>) -> Self {
        Self { vcs, remote }
    }

    /// Write `outputs`, commit and force-push them, and start a pipeline;
    /// then put the working tree back the way it was.
    ///
    /// The restore runs exactly once whether the publish succeeded, failed
    /// or panicked. An error from the publish wins over an error from the
    /// restore, which is then only logged.
    pub async fn publish(
        &self,
        store: Arc<DocumentStore>,
        outputs: Vec<RewrittenDocument>,
        options: PublishOptions,
    ) -> Result<RestorePoint> {
        let point = RestorePoint::capture(self.vcs.as_ref(), &store).await?;

        let task = tokio::spawn(publish_body(
            Arc::clone(&self.vcs),
            Arc::clone(&self.remote),
            Arc::clone(&store),
            outputs,
            options,
            point.branch.clone(),
        ));
        let outcome = match task.await {
            Ok(result) => result,
            Err(join) => Err(unexpected(join)),
        };

        let restored = point.restore(self.vcs.as_ref(), &store).await;

        match (outcome, restored) {
            (Ok(()), Ok(())) => Ok(point),
            (Ok(()), Err(restore_err)) => Err(restore_err),
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(restore_err)) => {
                error!(error = %restore_err, "recovery failed after a failed publish");
                Err(err)
            }
        }
    }
}

async fn publish_body(
    vcs: Arc<dyn VersionControl>,
    remote: Arc<dyn CiRemote>,
    store: Arc<DocumentStore>,
    outputs: Vec<RewrittenDocument>,
    options: PublishOptions,
    branch: String,
) -> Result<()> {
    store.persist(&outputs)?;
    vcs.add(store.dir()).await?;
    vcs.commit(&options.message, options.no_verify).await?;
    vcs.force_push(&options.remote, &branch).await?;
    info!(branch = %branch, "push succeeded");

    if !options.settle.is_zero() {
        tokio::time::sleep(options.settle).await;
    }
    if !remote.has_open_merge_request(&branch).await? {
        remote.run_pipeline(&branch).await?;
    }
    Ok(())
}

fn unexpected(join: JoinError) -> MinipipeError {
    if join.is_panic() {
        let message = panic_message(join.into_panic());
        warn!(panic = %message, "publish task panicked");
        MinipipeError::Unexpected(message)
    } else {
        MinipipeError::Unexpected(format!("publish task did not finish: {join}"))
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with a non-string payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn targets(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    const PREFIX: &str = "[Don't merge this commit!] minimum pipeline for: ";

    #[test]
    fn short_messages_are_kept() {
        assert_eq!(
            commit_message(PREFIX, &targets(&["build", "test"])),
            format!("{PREFIX}build,test")
        );
    }

    #[test]
    fn long_messages_are_cut() {
        let message = commit_message(PREFIX, &targets(&["a-rather-long-job-name", "another:[f1]"]));
        assert_eq!(message.chars().count(), 79);
        assert!(message.ends_with(" ..."));
        assert!(message.starts_with(PREFIX));
    }

    #[test]
    fn cutting_respects_char_boundaries() {
        let long = "é".repeat(100);
        let message = commit_message("", &targets(&[long.as_str()]));
        assert_eq!(message, format!("{} ...", "é".repeat(75)));
    }

    #[test]
    fn panic_payloads_are_readable() {
        assert_eq!(panic_message(Box::new("boom")), "boom");
        assert_eq!(panic_message(Box::new(String::from("bang"))), "bang");
        assert_eq!(panic_message(Box::new(7u8)), "panic with a non-string payload");
    }
}
