use std::collections::BTreeSet;
use std::str::FromStr;

use serde::Deserialize;

/// Canonical job name type used throughout the crate.
pub type JobName = String;

/// Which sub-jobs of a target were requested.
///
/// `All` absorbs any specific request for the same job: once a job is
/// targeted without a sub-job, its matrix is kept whole.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubJobs {
    All,
    Only(BTreeSet<String>),
}

impl SubJobs {
    /// Merge another request for the same job into this one.
    pub fn add(&mut self, subjob: Option<&str>) {
        match subjob {
            None => *self = SubJobs::All,
            Some(value) => {
                if let SubJobs::Only(values) = self {
                    values.insert(value.to_string());
                }
            }
        }
    }

    pub fn from_request(subjob: Option<&str>) -> Self {
        match subjob {
            None => SubJobs::All,
            Some(value) => SubJobs::Only(BTreeSet::from([value.to_string()])),
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, SubJobs::All)
    }
}

/// What the document store does with YAML tags it has no registration for.
///
/// - `Preserve`: keep the tagged node as-is and write it back unchanged
///   (default; GitLab's `!reference` and friends round-trip untouched).
/// - `Strict`: refuse to load or save a document carrying an unregistered tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TagPolicy {
    #[default]
    Preserve,
    Strict,
}

impl FromStr for TagPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "preserve" => Ok(TagPolicy::Preserve),
            "strict" => Ok(TagPolicy::Strict),
            other => Err(format!(
                "invalid tag policy: {other} (expected \"preserve\" or \"strict\")"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_absorbs_specific_requests() {
        let mut subjobs = SubJobs::from_request(Some("f1"));
        subjobs.add(None);
        subjobs.add(Some("f2"));
        assert_eq!(subjobs, SubJobs::All);
    }

    #[test]
    fn specific_requests_accumulate() {
        let mut subjobs = SubJobs::from_request(Some("f1"));
        subjobs.add(Some("f3"));
        subjobs.add(Some("f1"));
        assert_eq!(
            subjobs,
            SubJobs::Only(BTreeSet::from(["f1".to_string(), "f3".to_string()]))
        );
    }

    #[test]
    fn tag_policy_parses_case_insensitively() {
        assert_eq!("Strict".parse::<TagPolicy>(), Ok(TagPolicy::Strict));
        assert!("loose".parse::<TagPolicy>().is_err());
    }
}
