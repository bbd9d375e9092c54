// src/dag/resolve.rs

//! Dependency closures over a [`JobGraph`].

use std::collections::BTreeSet;

use tracing::debug;

use crate::dag::classify::is_removable;
use crate::dag::graph::JobGraph;
use crate::errors::{MinipipeError, Result};
use crate::types::JobName;

/// `target` plus every job it transitively references.
///
/// Fails with [`MinipipeError::JobNotFound`] for an unknown target and
/// with [`MinipipeError::DependencyCycle`] when a chain of references
/// leads back to a job still being visited.
pub fn resolve(graph: &JobGraph, target: &str) -> Result<BTreeSet<JobName>> {
    if !graph.contains(target) {
        return Err(MinipipeError::JobNotFound(target.to_string()));
    }
    let mut done = BTreeSet::new();
    let mut path = Vec::new();
    visit(graph, target, &mut done, &mut path)?;
    Ok(done)
}

fn visit<'g>(
    graph: &'g JobGraph,
    job: &'g str,
    done: &mut BTreeSet<JobName>,
    path: &mut Vec<&'g str>,
) -> Result<()> {
    if let Some(start) = path.iter().position(|on_path| *on_path == job) {
        let mut cycle: Vec<&str> = path[start..].to_vec();
        cycle.push(job);
        return Err(MinipipeError::DependencyCycle(cycle.join(" -> ")));
    }
    if done.contains(job) {
        return Ok(());
    }

    path.push(job);
    for dep in graph.references_of(job) {
        visit(graph, dep, done, path)?;
    }
    path.pop();

    done.insert(job.to_string());
    Ok(())
}

/// The jobs a minimum pipeline keeps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MinimumJobSet {
    /// Closure of the requested targets.
    pub required: BTreeSet<JobName>,
    /// Closure of the jobs that can never be removed.
    pub retained: BTreeSet<JobName>,
    all: BTreeSet<JobName>,
}

impl MinimumJobSet {
    pub fn contains(&self, job: &str) -> bool {
        self.all.contains(job)
    }

    pub fn len(&self) -> usize {
        self.all.len()
    }

    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.all.iter().map(String::as_str)
    }
}

/// Union of the closures of all `targets` and of every non-removable job.
pub fn minimum_job_set<'a, I>(graph: &JobGraph, targets: I) -> Result<MinimumJobSet>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut required = BTreeSet::new();
    for target in targets {
        required.extend(resolve(graph, target)?);
    }

    let mut retained = BTreeSet::new();
    for (name, definition) in graph.jobs() {
        if !is_removable(definition, name) {
            retained.extend(resolve(graph, name)?);
        }
    }

    let all: BTreeSet<JobName> = required.union(&retained).cloned().collect();
    debug!(
        required = required.len(),
        retained = retained.len(),
        total = all.len(),
        of = graph.len(),
        "computed minimum job set"
    );
    Ok(MinimumJobSet {
        required,
        retained,
        all,
    })
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

    fn set(names: &[&str]) -> BTreeSet<JobName> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn isolated_job_resolves_to_itself() {
        let g = graph("a: {script: [x]}\nb: {script: [y]}\n");
        assert_eq!(resolve(&g, "a").unwrap(), set(&["a"]));
    }

    #[test]
    fn follows_every_kind_of_reference() {
        let g = graph(
            r#"
deploy: {script: [d], needs: [{job: test}]}
test: {script: [t], dependencies: [build]}
build: {script: [b], extends: [.base]}
.base: {image: alpine}
lint: {script: [l]}
"#,
        );
        assert_eq!(
            resolve(&g, "deploy").unwrap(),
            set(&["deploy", "test", "build", ".base"])
        );
    }

    #[test]
    fn shared_references_are_visited_once() {
        let g = graph("a: {needs: [b, c]}\nb: {needs: [d]}\nc: {needs: [d]}\nd: {}\n");
        assert_eq!(resolve(&g, "a").unwrap(), set(&["a", "b", "c", "d"]));
    }

    #[test]
    fn unknown_target_is_not_found() {
        let g = graph("a: {script: [x]}\n");
        assert!(matches!(
            resolve(&g, "nope"),
            Err(MinipipeError::JobNotFound(name)) if name == "nope"
        ));
    }

    #[test]
    fn cycle_names_its_path() {
        let g = graph("a: {needs: [b]}\nb: {needs: [c]}\nc: {needs: [b]}\n");
        match resolve(&g, "a") {
            Err(MinipipeError::DependencyCycle(path)) => assert_eq!(path, "b -> c -> b"),
            other => panic!("expected DependencyCycle, got {:?}", other),
        }
    }

    #[test]
    fn self_reference_is_a_cycle() {
        let g = graph("a: {extends: a}\n");
        assert!(matches!(
            resolve(&g, "a"),
            Err(MinipipeError::DependencyCycle(path)) if path == "a -> a"
        ));
    }

    #[test]
    fn minimum_set_keeps_templates_and_their_closure() {
        let g = graph(
            r#"
stages: [build, test]
.base: {extends: .cache}
.cache: {cache: {paths: [x]}}
a: {script: [a], needs: [b]}
b: {script: [b]}
c: {script: [c]}
"#,
        );
        let min = minimum_job_set(&g, ["a"]).unwrap();
        assert_eq!(min.required, set(&["a", "b"]));
        assert_eq!(min.retained, set(&["stages", ".base", ".cache"]));
        assert!(min.contains("a"));
        assert!(!min.contains("c"));
        assert_eq!(min.len(), 5);
    }

    #[test]
    fn minimum_set_with_no_targets_is_only_retained_jobs() {
        let g = graph("variables: {A: 1}\nc: {script: [c]}\n");
        let min = minimum_job_set(&g, std::iter::empty()).unwrap();
        assert_eq!(min.iter().collect::<Vec<_>>(), vec!["variables"]);
    }
}
