// src/engine/restore.rs

use tracing::{info, warn};

use crate::document::DocumentStore;
use crate::errors::{MinipipeError, Result};
use crate::exec::VersionControl;
use crate::fs::Fingerprint;

/// State of the working tree before anything was changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestorePoint {
    pub commit: String,
    pub branch: String,
    /// Whether uncommitted work was stashed and must be popped again.
    pub stashed: bool,
    pub fingerprint: Fingerprint,
}

impl RestorePoint {
    /// Record HEAD and the document contents, then stash local work.
    ///
    /// The fingerprint is taken before the stash so that it describes the
    /// tree the user will get back.
    pub async fn capture(vcs: &dyn VersionControl, store: &DocumentStore) -> Result<Self> {
        let commit = vcs.head_commit().await?;
        let branch = vcs.current_branch().await?;
        let fingerprint = store.fingerprint()?;
        let stashed = vcs.stash().await?;

        info!(commit = %commit, branch = %branch, stashed, "captured restore point");
        Ok(Self {
            commit,
            branch,
            stashed,
            fingerprint,
        })
    }

    /// Hard-reset to the captured commit and pop the stash if there is one.
    ///
    /// A fingerprint mismatch afterwards is only logged: git has already
    /// done all it can.
    pub async fn restore(&self, vcs: &dyn VersionControl, store: &DocumentStore) -> Result<()> {
        info!(commit = %self.commit, "recovering working tree");

        vcs.reset_hard(&self.commit)
            .await
            .map_err(|err| self.failure(format!("reset failed: {err}")))?;

        if self.stashed {
            vcs.stash_pop()
                .await
                .map_err(|err| self.failure(format!("stash pop failed: {err}")))?;
        }

        match store.fingerprint() {
            Ok(now) if now == self.fingerprint => {
                info!("recovered, CI documents match their pre-run state");
            }
            Ok(now) => warn!(
                expected = %self.fingerprint.as_hex(),
                actual = %now.as_hex(),
                "CI documents differ from their pre-run state after recovery"
            ),
            Err(err) => warn!(error = %err, "could not verify CI documents after recovery"),
        }
        Ok(())
    }

    fn failure(&self, reason: String) -> MinipipeError {
        MinipipeError::Restore {
            commit: self.commit.clone(),
            stashed: self.stashed,
            reason,
        }
    }
}
