// src/document/model.rs

//! Typed view over a GitLab job definition.
//!
//! Definitions stay `serde_yaml::Value`s so that every key we don't know
//! about survives a rewrite untouched. The handful of keys that drive
//! resolution are parsed here once, up front.

use serde_yaml::{Mapping, Value};
use tracing::warn;

use crate::types::JobName;

pub const SCRIPT: &str = "script";
pub const NEEDS: &str = "needs";
pub const DEPENDENCIES: &str = "dependencies";
pub const EXTENDS: &str = "extends";
pub const PARALLEL: &str = "parallel";
pub const MATRIX: &str = "matrix";
pub const REPEAT: &str = "REPEAT";

/// One entry of a job's `needs` list.
///
/// GitLab accepts both `needs: [build]` and `needs: [{job: build, ...}]`;
/// both forms resolve to a job name here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NeedRef {
    BareName(JobName),
    JobRef {
        job: JobName,
        /// `optional: true`: a missing job is not an error for GitLab.
        optional: bool,
        /// The entry carries `project:` or `pipeline:` and points outside
        /// this pipeline.
        external: bool,
    },
}

impl NeedRef {
    pub fn job(&self) -> &str {
        match self {
            NeedRef::BareName(job) => job,
            NeedRef::JobRef { job, .. } => job,
        }
    }

    pub fn is_optional(&self) -> bool {
        matches!(self, NeedRef::JobRef { optional: true, .. })
    }

    pub fn is_external(&self) -> bool {
        matches!(self, NeedRef::JobRef { external: true, .. })
    }

    fn parse(value: &Value) -> Option<Self> {
        match value {
            Value::String(name) => Some(NeedRef::BareName(name.clone())),
            Value::Mapping(map) => {
                let job = map.get("job")?.as_str()?.to_string();
                let optional = map.get("optional").and_then(Value::as_bool).unwrap_or(false);
                let external = map.contains_key("project") || map.contains_key("pipeline");
                Some(NeedRef::JobRef {
                    job,
                    optional,
                    external,
                })
            }
            _ => None,
        }
    }
}

/// The references a job makes to other jobs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobRefs {
    pub needs: Vec<NeedRef>,
    pub dependencies: Vec<JobName>,
    pub extends: Vec<JobName>,
}

impl JobRefs {
    /// Parse the references out of a definition.
    ///
    /// Anything that is not a mapping (e.g. `stages: [...]`) has no
    /// references. Entries of an unexpected shape are skipped with a warning.
    pub fn parse(name: &str, definition: &Value) -> Self {
        let Some(map) = definition.as_mapping() else {
            return Self::default();
        };

        let needs = sequence_entries(name, map, NEEDS)
            .filter_map(|entry| {
                let parsed = NeedRef::parse(entry);
                if parsed.is_none() {
                    warn!(job = %name, entry = ?entry, "ignoring unrecognised `needs` entry");
                }
                parsed
            })
            .collect();

        let dependencies = names_in(name, map, DEPENDENCIES);

        let extends = match map.get(EXTENDS) {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::String(parent)) => vec![parent.clone()],
            Some(Value::Sequence(_)) => names_in(name, map, EXTENDS),
            Some(other) => {
                warn!(job = %name, value = ?other, "ignoring unrecognised `extends` value");
                Vec::new()
            }
        };

        Self {
            needs,
            dependencies,
            extends,
        }
    }

    /// Every referenced job name in `needs`, `dependencies`, `extends` order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.needs
            .iter()
            .map(NeedRef::job)
            .chain(self.dependencies.iter().map(String::as_str))
            .chain(self.extends.iter().map(String::as_str))
    }
}

fn sequence_entries<'a>(
    name: &str,
    map: &'a Mapping,
    key: &str,
) -> impl Iterator<Item = &'a Value> {
    let entries: &'a [Value] = match map.get(key) {
        None | Some(Value::Null) => &[],
        Some(Value::Sequence(seq)) => seq.as_slice(),
        Some(other) => {
            warn!(job = %name, key, value = ?other, "expected a list, ignoring");
            &[]
        }
    };
    entries.iter()
}

fn names_in(name: &str, map: &Mapping, key: &str) -> Vec<JobName> {
    sequence_entries(name, map, key)
        .filter_map(|entry| match entry.as_str() {
            Some(s) => Some(s.to_string()),
            None => {
                warn!(job = %name, key, entry = ?entry, "ignoring non-string entry");
                None
            }
        })
        .collect()
}

/// Shape of a job's `parallel` key.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Parallel<'a> {
    Absent,
    /// `parallel: 4`
    Replicas(u64),
    /// `parallel: {matrix: [...]}`
    Matrix(&'a [Value]),
    /// A `parallel` mapping without a `matrix` sequence, or any other shape.
    Other(&'a Value),
}

impl<'a> Parallel<'a> {
    pub fn of(definition: &'a Value) -> Self {
        let Some(parallel) = definition.get(PARALLEL) else {
            return Parallel::Absent;
        };
        if let Some(n) = parallel.as_u64() {
            return Parallel::Replicas(n);
        }
        match parallel.get(MATRIX) {
            Some(Value::Sequence(entries)) => Parallel::Matrix(entries.as_slice()),
            _ => Parallel::Other(parallel),
        }
    }
}

/// Whether a definition is a real job record: a mapping with `script`.
pub fn has_script(definition: &Value) -> bool {
    definition
        .as_mapping()
        .is_some_and(|map| map.contains_key(SCRIPT))
}

/// Text of a scalar as it appears in a job name (`test: [f1, 3.9]`).
///
/// Sub-jobs requested on the command line are compared against matrix
/// values through this; non-scalars have no text.
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Tagged(tagged) => scalar_text(&tagged.value),
        Value::Null | Value::Sequence(_) | Value::Mapping(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(text: &str) -> Value {
        serde_yaml::from_str(text).unwrap()
    }

    #[test]
    fn needs_accepts_both_forms() {
        let def = yaml(
            r#"
script: [make]
needs:
  - build
  - job: lint
  - job: docs
    optional: true
  - job: upstream
    project: group/other
"#,
        );
        let refs = JobRefs::parse("test", &def);
        assert_eq!(
            refs.needs,
            vec![
                NeedRef::BareName("build".into()),
                NeedRef::JobRef { job: "lint".into(), optional: false, external: false },
                NeedRef::JobRef { job: "docs".into(), optional: true, external: false },
                NeedRef::JobRef { job: "upstream".into(), optional: false, external: true },
            ]
        );
        assert!(refs.needs[2].is_optional());
        assert!(refs.needs[3].is_external());
    }

    #[test]
    fn extends_string_or_list() {
        let single = JobRefs::parse("a", &yaml("extends: .base"));
        assert_eq!(single.extends, vec![".base".to_string()]);

        let many = JobRefs::parse("a", &yaml("extends: [.base, .cache]"));
        assert_eq!(many.extends, vec![".base".to_string(), ".cache".to_string()]);
    }

    #[test]
    fn non_mapping_has_no_references() {
        let refs = JobRefs::parse("stages", &yaml("[build, test]"));
        assert_eq!(refs, JobRefs::default());
    }

    #[test]
    fn names_chain_all_relations_in_order() {
        let def = yaml("{needs: [a], dependencies: [b], extends: c}");
        let refs = JobRefs::parse("x", &def);
        assert_eq!(refs.names().collect::<Vec<_>>(), vec!["a", "b", "c"]);
    }

    #[test]
    fn odd_entries_are_skipped() {
        let def = yaml("{needs: [a, 3, {project: p}], dependencies: [b, [c]]}");
        let refs = JobRefs::parse("x", &def);
        assert_eq!(refs.names().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn parallel_shapes() {
        assert_eq!(Parallel::of(&yaml("script: x")), Parallel::Absent);
        assert_eq!(Parallel::of(&yaml("parallel: 4")), Parallel::Replicas(4));
        assert!(matches!(
            Parallel::of(&yaml("parallel: {matrix: [{A: [1]}]}")),
            Parallel::Matrix(entries) if entries.len() == 1
        ));
        assert!(matches!(
            Parallel::of(&yaml("parallel: {other: 1}")),
            Parallel::Other(_)
        ));
    }

    #[test]
    fn scalar_text_renders_like_job_names() {
        assert_eq!(scalar_text(&yaml("f1")), Some("f1".into()));
        assert_eq!(scalar_text(&yaml("3")), Some("3".into()));
        assert_eq!(scalar_text(&yaml("true")), Some("true".into()));
        assert_eq!(scalar_text(&yaml("[a]")), None);
    }

    #[test]
    fn script_detection() {
        assert!(has_script(&yaml("script: [make]")));
        assert!(!has_script(&yaml("variables: {A: 1}")));
        assert!(!has_script(&yaml("[a, b]")));
    }
}
