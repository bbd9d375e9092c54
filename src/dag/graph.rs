// src/dag/graph.rs

use std::collections::{HashMap, HashSet};

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use serde_yaml::Value;
use tracing::{debug, warn};

use crate::dag::resolve::resolve;
use crate::document::{JobRefs, SourceDocument};
use crate::errors::{MinipipeError, Result};
use crate::types::JobName;

/// Internal node structure: the definition plus its local references.
#[derive(Debug, Clone)]
struct JobNode {
    definition: Value,
    /// Referenced jobs that exist in the graph, deduplicated, in
    /// `needs`, `dependencies`, `extends` order.
    refs: Vec<JobName>,
}

/// Every job of every document, keyed by name, in document order.
#[derive(Debug, Clone, Default)]
pub struct JobGraph {
    order: Vec<JobName>,
    nodes: HashMap<JobName, JobNode>,
}

impl JobGraph {
    /// Build the graph from loaded documents.
    ///
    /// The document store already guarantees that names are unique.
    pub fn from_documents(documents: &[SourceDocument]) -> Self {
        Self::from_entries(documents.iter().flat_map(|doc| {
            doc.entries()
                .map(|(name, def)| (name.to_string(), def.clone()))
        }))
    }

    /// Build the graph from `(name, definition)` pairs. A repeated name
    /// replaces the earlier definition.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (JobName, Value)>,
    {
        // First pass: collect definitions so every name is known.
        let mut order = Vec::new();
        let mut definitions: HashMap<JobName, Value> = HashMap::new();
        for (name, definition) in entries {
            if definitions.insert(name.clone(), definition).is_none() {
                order.push(name);
            }
        }

        // Second pass: resolve references against the known names.
        let known: HashSet<&str> = order.iter().map(String::as_str).collect();
        let mut nodes = HashMap::with_capacity(definitions.len());
        for name in order.iter() {
            let Some(definition) = definitions.remove(name) else {
                continue;
            };
            let refs = local_references(name, &definition, |candidate| known.contains(candidate));
            nodes.insert(name.clone(), JobNode { definition, refs });
        }

        debug!(jobs = order.len(), "built job graph");
        Self { order, nodes }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Definition of a job, if present.
    pub fn definition(&self, name: &str) -> Option<&Value> {
        self.nodes.get(name).map(|n| &n.definition)
    }

    /// Immediate references of a job that resolve to jobs in this graph.
    pub fn references_of(&self, name: &str) -> &[JobName] {
        self.nodes
            .get(name)
            .map(|n| n.refs.as_slice())
            .unwrap_or(&[])
    }

    /// Job names in document order.
    pub fn job_names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// `(name, definition)` pairs in document order.
    pub fn jobs(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.order
            .iter()
            .filter_map(|name| self.nodes.get(name).map(|n| (name.as_str(), &n.definition)))
    }

    /// Fail if any chain of references loops back on itself.
    pub fn ensure_acyclic(&self) -> Result<()> {
        // Edge direction: referenced -> referencing. For
        //   test: {needs: [build]}
        // we add edge build -> test.
        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

        for name in self.job_names() {
            graph.add_node(name);
        }
        for name in self.job_names() {
            for dep in self.references_of(name) {
                graph.add_edge(dep.as_str(), name, ());
            }
        }

        // A topological sort will fail if there is a cycle; walking the
        // references from the reported job recovers the cycle path.
        match toposort(&graph, None) {
            Ok(_order) => Ok(()),
            Err(cycle) => match resolve(self, cycle.node_id()) {
                Err(err @ MinipipeError::DependencyCycle(_)) => Err(err),
                _ => Err(MinipipeError::DependencyCycle(format!(
                    "cycle detected in job references involving job '{}'",
                    cycle.node_id()
                ))),
            },
        }
    }
}

/// References of `name` that point at jobs of this pipeline.
///
/// External `needs` (other project / parent pipeline) never do. Optional
/// `needs` on a missing job are dropped silently, anything else missing is
/// reported once and skipped: the job may come from a remote include.
fn local_references(
    name: &str,
    definition: &Value,
    exists: impl Fn(&str) -> bool,
) -> Vec<JobName> {
    let refs = JobRefs::parse(name, definition);
    let mut out: Vec<JobName> = Vec::new();

    let candidates = refs
        .needs
        .iter()
        .filter(|need| !need.is_external())
        .map(|need| (need.job(), need.is_optional()))
        .chain(refs.dependencies.iter().map(|d| (d.as_str(), false)))
        .chain(refs.extends.iter().map(|e| (e.as_str(), false)));

    for (target, optional) in candidates {
        if !exists(target) {
            if !optional {
                warn!(job = %name, reference = %target, "reference to unknown job, skipping");
            }
            continue;
        }
        if !out.iter().any(|r| r == target) {
            out.push(target.to_string());
        }
    }
    out
}
