// src/config/model.rs

use serde::Deserialize;

use crate::types::TagPolicy;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [config]
/// ci_dir = "gitlab"
/// documents = ["*.yml"]
/// max_parallel = 200
///
/// [tags]
/// policy = "preserve"
/// known = ["!reference"]
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    /// Behaviour config from `[config]`.
    #[serde(default)]
    pub config: ConfigSection,

    /// YAML tag handling from `[tags]`.
    #[serde(default)]
    pub tags: TagSection,
}

/// Validated configuration. Only obtainable through `TryFrom<RawConfigFile>`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    config: ConfigSection,
    tags: TagSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(config: ConfigSection, tags: TagSection) -> Self {
        Self { config, tags }
    }

    pub fn config(&self) -> &ConfigSection {
        &self.config
    }

    pub fn tags(&self) -> &TagSection {
        &self.tags
    }

    /// Replace the CI directory (CLI `--ci-dir` takes precedence over the file).
    pub fn with_ci_dir(mut self, dir: impl Into<String>) -> Self {
        self.config.ci_dir = dir.into();
        self
    }

    /// Override the post-push wait. Tests set this to zero.
    pub fn with_settle_secs(mut self, secs: u64) -> Self {
        self.config.settle_secs = secs;
        self
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self::new_unchecked(ConfigSection::default(), TagSection::default())
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Directory holding the CI documents, relative to the repository root.
    #[serde(default = "default_ci_dir")]
    pub ci_dir: String,

    /// File-name globs selecting the documents inside `ci_dir`.
    #[serde(default = "default_documents")]
    pub documents: Vec<String>,

    /// Hidden job written into a document that would otherwise be empty.
    #[serde(default = "default_placeholder_job")]
    pub placeholder_job: String,

    /// Upper bound on the instances of one job after repeat injection.
    #[serde(default = "default_max_parallel")]
    pub max_parallel: u64,

    /// Git remote the throwaway commit is force-pushed to.
    #[serde(default = "default_remote")]
    pub remote: String,

    /// Seconds to wait after pushing before asking the CI about the branch.
    #[serde(default = "default_settle_secs")]
    pub settle_secs: u64,

    /// Commit message prefix; the target list is appended.
    #[serde(default = "default_commit_prefix")]
    pub commit_prefix: String,
}

fn default_ci_dir() -> String {
    "gitlab".to_string()
}

fn default_documents() -> Vec<String> {
    vec!["*.yml".to_string()]
}

fn default_placeholder_job() -> String {
    ".emptyPlaceHolder".to_string()
}

fn default_max_parallel() -> u64 {
    200
}

fn default_remote() -> String {
    "origin".to_string()
}

fn default_settle_secs() -> u64 {
    10
}

fn default_commit_prefix() -> String {
    "[Don't merge this commit!] minimum pipeline for: ".to_string()
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            ci_dir: default_ci_dir(),
            documents: default_documents(),
            placeholder_job: default_placeholder_job(),
            max_parallel: default_max_parallel(),
            remote: default_remote(),
            settle_secs: default_settle_secs(),
            commit_prefix: default_commit_prefix(),
        }
    }
}

/// `[tags]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct TagSection {
    /// What to do with tags that are not listed in `known`.
    #[serde(default)]
    pub policy: TagPolicy,

    /// Tags that are always accepted, written with their leading `!`.
    #[serde(default = "default_known_tags")]
    pub known: Vec<String>,
}

fn default_known_tags() -> Vec<String> {
    vec!["!reference".to_string()]
}

impl Default for TagSection {
    fn default() -> Self {
        Self {
            policy: TagPolicy::default(),
            known: default_known_tags(),
        }
    }
}
