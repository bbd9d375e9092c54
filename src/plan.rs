// src/plan.rs

//! Everything decided before a single file is touched.
//!
//! [`Plan::build`] runs every validation, so an error from it means the
//! working tree was never modified.

use std::collections::BTreeSet;

use tracing::{debug, info};

use crate::dag::{minimum_job_set, JobGraph, MinimumJobSet};
use crate::document::SourceDocument;
use crate::errors::{MinipipeError, Result};
use crate::target::{TargetSet, TargetSpec};
use crate::transform::{add_repeat, narrow, parallel_size, rewrite, NarrowedJobs, RewriteInput};
use crate::transform::RewrittenDocument;

#[derive(Debug, Clone)]
pub struct Plan {
    specs: Vec<TargetSpec>,
    targets: TargetSet,
    minimum: MinimumJobSet,
    narrowed: NarrowedJobs,
    repeat: u32,
}

impl Plan {
    pub fn build(
        graph: &JobGraph,
        specs: Vec<TargetSpec>,
        repeat: u32,
        max_parallel: u64,
    ) -> Result<Self> {
        if specs.is_empty() {
            return Err(MinipipeError::NoTargets);
        }
        graph.ensure_acyclic()?;

        for spec in &specs {
            spec.validate(graph)?;
        }
        let targets: TargetSet = specs.iter().collect();

        let minimum = minimum_job_set(graph, targets.names())?;
        let narrowed = narrow(graph, &targets);

        if repeat > 0 {
            check_parallel_limit(graph, &targets, &narrowed, repeat, max_parallel)?;
        }

        let plan = Self {
            specs,
            targets,
            minimum,
            narrowed,
            repeat,
        };
        info!(
            targets = plan.targets.len(),
            jobs = plan.minimum.len(),
            of = graph.len(),
            narrowed = plan.narrowed.len(),
            repeat,
            "planned minimum pipeline"
        );
        debug!(minimum = ?plan.minimum.iter().collect::<Vec<_>>(), "minimum job set");
        Ok(plan)
    }

    /// `name: subjob` for every request, deduplicated.
    pub fn titles(&self) -> BTreeSet<String> {
        self.specs.iter().map(TargetSpec::title).collect()
    }

    pub fn specs(&self) -> &[TargetSpec] {
        &self.specs
    }

    pub fn targets(&self) -> &TargetSet {
        &self.targets
    }

    pub fn minimum(&self) -> &MinimumJobSet {
        &self.minimum
    }

    pub fn narrowed(&self) -> &NarrowedJobs {
        &self.narrowed
    }

    pub fn repeat(&self) -> u32 {
        self.repeat
    }

    pub fn rewrite(&self, documents: &[SourceDocument], placeholder: &str) -> Vec<RewrittenDocument> {
        rewrite(
            documents,
            &RewriteInput {
                minimum: &self.minimum,
                narrowed: &self.narrowed,
                targets: &self.targets,
                repeat: self.repeat,
                placeholder,
            },
        )
    }
}

fn check_parallel_limit(
    graph: &JobGraph,
    targets: &TargetSet,
    narrowed: &NarrowedJobs,
    repeat: u32,
    limit: u64,
) -> Result<()> {
    for name in targets.names() {
        let Some(definition) = narrowed.get(name).or_else(|| graph.definition(name)) else {
            continue;
        };
        let mut repeated = definition.clone();
        add_repeat(&mut repeated, repeat);
        let size = parallel_size(&repeated);
        if size > limit {
            return Err(MinipipeError::ParallelLimit {
                job: name.to_string(),
                size,
                limit,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_yaml::Value;

    fn graph(text: &str) -> JobGraph {
        let value: Value = serde_yaml::from_str(text).unwrap();
        let map = value.as_mapping().unwrap().clone();
        JobGraph::from_entries(
            map.into_iter()
                .map(|(k, v)| (k.as_str().unwrap().to_string(), v)),
        )
    }

    fn specs(raw: &[&str]) -> Vec<TargetSpec> {
        raw.iter().map(|r| TargetSpec::parse(r).unwrap()).collect()
    }

    const JOBS: &str = r#"
build: {script: [b]}
test:
  script: [t]
  needs: [build]
  parallel:
    matrix:
      - FILE: [f1, f2, f3, f4, f5]
shards: {script: [s], parallel: 50}
"#;

    #[test]
    fn empty_target_list_is_rejected() {
        assert!(matches!(
            Plan::build(&graph(JOBS), Vec::new(), 0, 200),
            Err(MinipipeError::NoTargets)
        ));
    }

    #[test]
    fn builds_minimum_set_and_titles() {
        let plan = Plan::build(&graph(JOBS), specs(&["test:[f2]", "test:[f4]"]), 0, 200).unwrap();
        assert!(plan.minimum().contains("build"));
        assert!(!plan.minimum().contains("shards"));
        assert_eq!(
            plan.titles(),
            BTreeSet::from(["test: f2".to_string(), "test: f4".to_string()])
        );
        assert_eq!(plan.narrowed().len(), 1);
    }

    #[test]
    fn validation_happens_before_anything_else() {
        assert!(matches!(
            Plan::build(&graph(JOBS), specs(&["build", "ghost"]), 0, 200),
            Err(MinipipeError::JobNotFound(_))
        ));
    }

    #[test]
    fn parallel_limit_counts_the_narrowed_matrix() {
        // narrowed to one value: 1 * 100 instances is within the limit
        assert!(Plan::build(&graph(JOBS), specs(&["test:[f1]"]), 100, 200).is_ok());
        // the full matrix is 5 * 50
        match Plan::build(&graph(JOBS), specs(&["test"]), 50, 200) {
            Err(MinipipeError::ParallelLimit { job, size, limit }) => {
                assert_eq!(job, "test");
                assert_eq!(size, 250);
                assert_eq!(limit, 200);
            }
            other => panic!("expected ParallelLimit, got {:?}", other),
        }
    }

    #[test]
    fn integer_parallel_limit() {
        assert!(matches!(
            Plan::build(&graph(JOBS), specs(&["shards"]), 5, 200),
            Err(MinipipeError::ParallelLimit { size: 250, .. })
        ));
    }

    #[test]
    fn cycles_are_rejected_even_outside_the_targets() {
        let g = graph("a: {script: [a]}\nb: {extends: c}\nc: {extends: b}\n");
        assert!(matches!(
            Plan::build(&g, specs(&["a"]), 0, 200),
            Err(MinipipeError::DependencyCycle(_))
        ));
    }
}
