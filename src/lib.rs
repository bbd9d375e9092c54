// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod document;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod plan;
pub mod prompt;
pub mod target;
pub mod transform;
pub mod types;

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::{load_or_default, ConfigFile};
use crate::document::{DocumentStore, TagRegistry};
use crate::engine::{commit_message, PublishOptions, Publisher};
use crate::errors::{MinipipeError, Result};
use crate::exec::{CiRemote, GitCli, GlabCli, VersionControl};
use crate::fs::{FileSystem, RealFileSystem};
use crate::plan::Plan;
use crate::prompt::{AssumeYes, Confirm, StdinConfirm};
use crate::target::{split_target_list, TargetSpec};
use crate::transform::RewrittenDocument;

/// The outside world a run talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub fs: Arc<dyn FileSystem>,
    pub vcs: Arc<dyn VersionControl>,
    pub remote: Arc<dyn CiRemote>,
    pub confirm: Arc<dyn Confirm>,
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators")
            .field("fs", &self.fs)
            .finish_non_exhaustive()
    }
}

impl Collaborators {
    /// Real filesystem, `git` and `glab` in `workdir`, prompts on stdin
    /// unless `assume_yes`.
    pub fn system(workdir: impl Into<PathBuf>, assume_yes: bool) -> Self {
        let workdir = workdir.into();
        let confirm: Arc<dyn Confirm> = if assume_yes {
            Arc::new(AssumeYes)
        } else {
            Arc::new(StdinConfirm)
        };
        Self {
            fs: Arc::new(RealFileSystem),
            vcs: Arc::new(GitCli::new(&workdir)),
            remote: Arc::new(GlabCli::new(&workdir)),
            confirm,
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// `--dry-run`: the documents that would have been published.
    DryRun(Vec<RewrittenDocument>),
    Published { branch: String, url: Option<String> },
    /// The user declined a confirmation prompt.
    Cancelled,
}

/// High-level entry point used by `main.rs`.
pub async fn run(args: CliArgs) -> Result<RunOutcome> {
    let cfg = load_or_default(&args.config)?;
    let workdir = std::env::current_dir()?;
    let collaborators = Collaborators::system(workdir, args.yes);
    run_with(&args, cfg, collaborators).await
}

/// Run against explicit config and collaborators.
///
/// Everything up to and including the plan is validated before the
/// working tree is touched.
pub async fn run_with(
    args: &CliArgs,
    cfg: ConfigFile,
    collaborators: Collaborators,
) -> Result<RunOutcome> {
    let cfg = match &args.ci_dir {
        Some(dir) => cfg.with_ci_dir(dir.clone()),
        None => cfg,
    };
    debug!(?args, "starting run");

    let raw_targets = match &args.jobs {
        Some(list) => split_target_list(list),
        None => match failed_targets(&args.failed_from, &collaborators).await? {
            Some(targets) => targets,
            None => return Ok(RunOutcome::Cancelled),
        },
    };
    if raw_targets.is_empty() {
        return Err(MinipipeError::NoTargets);
    }
    debug!(targets = ?raw_targets, "input jobs");

    let specs = raw_targets
        .iter()
        .map(|raw| TargetSpec::parse(raw))
        .collect::<Result<Vec<_>>>()?;

    let store = DocumentStore::load(
        Arc::clone(&collaborators.fs),
        &cfg.config().ci_dir,
        &cfg.config().documents,
        TagRegistry::from_config(cfg.tags()),
    )?;
    let graph = store.job_graph();
    let plan = Plan::build(&graph, specs, args.repeat, cfg.config().max_parallel)?;

    println!("Generating GitLab CI configuration for these target jobs:");
    for title in plan.titles() {
        println!("  - {title}");
    }

    let outputs = plan.rewrite(store.documents(), &cfg.config().placeholder_job);

    if args.dry_run {
        print_dry_run(&plan, &store, &outputs)?;
        return Ok(RunOutcome::DryRun(outputs));
    }

    let message = commit_message(&cfg.config().commit_prefix, &raw_targets);
    let options = PublishOptions::from_config(&cfg, message, args.no_verify);
    let publisher = Publisher::new(
        Arc::clone(&collaborators.vcs),
        Arc::clone(&collaborators.remote),
    );
    let point = publisher.publish(Arc::new(store), outputs, options).await?;

    let url = match collaborators.remote.pipeline_status(&point.branch).await {
        Ok(status) => status.url,
        Err(err) => {
            warn!(error = %err, "could not read the pipeline url");
            None
        }
    };
    match &url {
        Some(url) => println!("Pipeline URL (double check it is the right one): {url}"),
        None => println!("No pipeline URL found yet for branch '{}'", point.branch),
    }

    Ok(RunOutcome::Published {
        branch: point.branch,
        url,
    })
}

/// Names of the failed jobs of `failed_from`'s last pipeline.
///
/// `None` when the user declines to go on.
async fn failed_targets(
    failed_from: &str,
    collaborators: &Collaborators,
) -> Result<Option<Vec<String>>> {
    collaborators.remote.ensure_ready().await?;
    let branch = collaborators.vcs.current_branch().await?;

    let reference = if failed_from == "HEAD" {
        branch
    } else {
        let question = format!(
            "You are trying to generate failed jobs from '{failed_from}' for current branch '{branch}', continue?"
        );
        if !collaborators.confirm.confirm(&question)? {
            return Ok(None);
        }
        failed_from.to_string()
    };

    info!(reference = %reference, "getting failed jobs");
    let status = collaborators.remote.pipeline_status(&reference).await?;
    if status.running {
        let question = format!(
            "Pipeline is still running for '{reference}', do you want to continue fetching failed jobs?"
        );
        if !collaborators.confirm.confirm(&question)? {
            return Ok(None);
        }
    }

    if status.failed_jobs.is_empty() {
        return Err(MinipipeError::NoFailedJobs(reference));
    }
    Ok(Some(status.failed_jobs))
}

/// Print the plan and the rewritten documents.
fn print_dry_run(plan: &Plan, store: &DocumentStore, outputs: &[RewrittenDocument]) -> Result<()> {
    println!("minipipe dry-run");
    println!("  repeat = {}", plan.repeat());
    println!(
        "  minimum job set ({}): {:?}",
        plan.minimum().len(),
        plan.minimum().iter().collect::<Vec<_>>()
    );
    if !plan.narrowed().is_empty() {
        println!(
            "  narrowed: {:?}",
            plan.narrowed().keys().collect::<Vec<_>>()
        );
    }
    println!();

    for output in outputs {
        println!("# {}", output.path().display());
        print!("{}", store.render(output)?);
        println!();
    }

    debug!("dry-run complete (nothing written)");
    Ok(())
}
