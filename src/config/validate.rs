// src/config/validate.rs

use globset::Glob;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{MinipipeError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::MinipipeError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.config, raw.tags))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_paths(cfg)?;
    validate_limits(cfg)?;
    validate_placeholder(cfg)?;
    validate_tags(cfg)?;
    Ok(())
}

fn validate_paths(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.ci_dir.trim().is_empty() {
        return Err(MinipipeError::ConfigError(
            "[config].ci_dir must not be empty".to_string(),
        ));
    }
    if cfg.config.documents.is_empty() {
        return Err(MinipipeError::ConfigError(
            "[config].documents must list at least one glob".to_string(),
        ));
    }
    for pattern in cfg.config.documents.iter() {
        Glob::new(pattern).map_err(|e| {
            MinipipeError::ConfigError(format!(
                "[config].documents has invalid glob '{}': {}",
                pattern, e
            ))
        })?;
    }
    Ok(())
}

fn validate_limits(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.max_parallel == 0 {
        return Err(MinipipeError::ConfigError(
            "[config].max_parallel must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_placeholder(cfg: &RawConfigFile) -> Result<()> {
    // A visible placeholder would become a real (scriptless, hence invalid) job.
    if !cfg.config.placeholder_job.starts_with('.') {
        return Err(MinipipeError::ConfigError(format!(
            "[config].placeholder_job must be a hidden job starting with '.', got '{}'",
            cfg.config.placeholder_job
        )));
    }
    Ok(())
}

fn validate_tags(cfg: &RawConfigFile) -> Result<()> {
    for tag in cfg.tags.known.iter() {
        if !tag.starts_with('!') || tag.len() < 2 {
            return Err(MinipipeError::ConfigError(format!(
                "[tags].known entries must look like '!name', got '{}'",
                tag
            )));
        }
    }
    Ok(())
}
