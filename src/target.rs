// src/target.rs

//! Target jobs as the user (or the failed-jobs listing) names them.
//!
//! Accepted forms:
//!
//! - `name`
//! - `name something`: only the first word is used, without a sub-job filter
//! - `name:[subjob]`, `name: [subjob]`
//! - `name:[s1, s2, ...]`: only `s1` is honoured
//! - `name:[3]`: a single, purely numeric sub-job means "no filter"

use std::collections::BTreeMap;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_yaml::Value;

use crate::dag::JobGraph;
use crate::document::model::{scalar_text, Parallel};
use crate::errors::{MinipipeError, Result};
use crate::types::{JobName, SubJobs};

static TARGET_ITEM: Lazy<Regex> = Lazy::new(|| {
    // A run of characters that are not commas, where a bracketed group may
    // contain commas.
    Regex::new(r"(?:[^,\[]|\[[^\]]*\]?)+").expect("valid target item regex")
});

/// Split a raw `--jobs` value into individual target strings.
///
/// Single quotes are dropped first; commas inside `[...]` do not split.
pub fn split_target_list(raw: &str) -> Vec<String> {
    let cleaned = raw.replace('\'', "");
    TARGET_ITEM
        .find_iter(&cleaned)
        .map(|m| m.as_str().trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

/// One requested job, with an optional sub-job filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSpec {
    pub name: JobName,
    pub subjob: Option<String>,
}

impl TargetSpec {
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();

        if raw.contains('[') || raw.contains(']') {
            let compact: String = raw.chars().filter(|c| *c != ' ' && *c != ']').collect();
            if compact.matches(":[").count() > 1 {
                return Err(MinipipeError::MalformedTarget(raw.to_string()));
            }
            let Some((name, rest)) = compact.rsplit_once(":[") else {
                return Ok(Self::all(compact));
            };
            let subjob = match rest.split_once(',') {
                Some((first, _)) if !first.is_empty() => Some(first.to_string()),
                Some(_) => None,
                None if rest.is_empty() || rest.chars().all(|c| c.is_ascii_digit()) => None,
                None => Some(rest.to_string()),
            };
            return Ok(Self {
                name: name.to_string(),
                subjob,
            });
        }

        let name = raw.split(' ').next().unwrap_or_default();
        Ok(Self::all(name))
    }

    fn all(name: impl Into<JobName>) -> Self {
        Self {
            name: name.into(),
            subjob: None,
        }
    }

    /// `name: subjob`, as shown to the user.
    pub fn title(&self) -> String {
        format!("{}: {}", self.name, self.subjob.as_deref().unwrap_or(""))
    }

    /// Check that the job exists and, for a sub-job request, that one of its
    /// matrix axes lists that value.
    pub fn validate(&self, graph: &JobGraph) -> Result<()> {
        let definition = graph
            .definition(&self.name)
            .ok_or_else(|| MinipipeError::JobNotFound(self.name.clone()))?;

        let Some(subjob) = self.subjob.as_deref() else {
            return Ok(());
        };

        let entries = match Parallel::of(definition) {
            Parallel::Absent => return Err(MinipipeError::NoParallel(self.name.clone())),
            Parallel::Matrix(entries) => entries,
            Parallel::Replicas(_) | Parallel::Other(_) => {
                return Err(MinipipeError::NoMatrix(self.name.clone()));
            }
        };

        let found = entries
            .iter()
            .filter_map(Value::as_mapping)
            .flat_map(|axes| axes.values())
            .any(|values| axis_values(values).any(|v| v == subjob));

        if found {
            Ok(())
        } else {
            Err(MinipipeError::SubJobNotFound {
                job: self.name.clone(),
                subjob: subjob.to_string(),
            })
        }
    }
}

impl fmt::Display for TargetSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.subjob {
            Some(subjob) => write!(f, "{}:[{}]", self.name, subjob),
            None => f.write_str(&self.name),
        }
    }
}

/// Text of every value on one matrix axis. A scalar axis counts as a
/// single value.
pub(crate) fn axis_values(values: &Value) -> Box<dyn Iterator<Item = String> + '_> {
    match values {
        Value::Sequence(items) => Box::new(items.iter().filter_map(scalar_text)),
        other => Box::new(scalar_text(other).into_iter()),
    }
}

/// Requested sub-jobs per target job, merged across all requests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetSet {
    targets: BTreeMap<JobName, SubJobs>,
}

impl TargetSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, spec: &TargetSpec) {
        let subjob = spec.subjob.as_deref();
        self.targets
            .entry(spec.name.clone())
            .and_modify(|existing| existing.add(subjob))
            .or_insert_with(|| SubJobs::from_request(subjob));
    }

    pub fn get(&self, name: &str) -> Option<&SubJobs> {
        self.targets.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.targets.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.targets.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SubJobs)> {
        self.targets.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

impl<'a> FromIterator<&'a TargetSpec> for TargetSet {
    fn from_iter<I: IntoIterator<Item = &'a TargetSpec>>(iter: I) -> Self {
        let mut set = TargetSet::new();
        for spec in iter {
            set.insert(spec);
        }
        set
    }
}
