// src/transform/narrow.rs

use std::collections::{BTreeMap, BTreeSet};

use serde_yaml::Value;
use tracing::debug;

use crate::dag::JobGraph;
use crate::document::model::{scalar_text, MATRIX, PARALLEL};
use crate::target::TargetSet;
use crate::types::{JobName, SubJobs};

/// Narrowed copies of the targeted matrix jobs, by job name.
pub type NarrowedJobs = BTreeMap<JobName, Value>;

/// Copy every target job that asks for specific sub-jobs, keeping only the
/// requested values on the matrix axes that list any of them.
///
/// Targets asking for all sub-jobs, and jobs without a matrix, are not in
/// the result.
pub fn narrow(graph: &JobGraph, targets: &TargetSet) -> NarrowedJobs {
    let mut narrowed = NarrowedJobs::new();

    for (name, subjobs) in targets.iter() {
        let SubJobs::Only(requested) = subjobs else {
            continue;
        };
        let Some(definition) = graph.definition(name) else {
            continue;
        };

        let mut copy = definition.clone();
        if narrow_definition(&mut copy, requested) {
            debug!(job = %name, requested = ?requested, "narrowed matrix");
            narrowed.insert(name.to_string(), copy);
        }
    }
    narrowed
}

/// Filter the matrix of one definition in place. Returns whether the
/// definition has a matrix at all.
pub fn narrow_definition(definition: &mut Value, requested: &BTreeSet<String>) -> bool {
    let Some(Value::Sequence(entries)) = definition
        .get_mut(PARALLEL)
        .and_then(|parallel| parallel.get_mut(MATRIX))
    else {
        return false;
    };

    for entry in entries.iter_mut() {
        let Some(axes) = entry.as_mapping_mut() else {
            continue;
        };
        for (_axis, values) in axes.iter_mut() {
            let Value::Sequence(items) = values else {
                continue;
            };
            let is_requested =
                |v: &Value| scalar_text(v).is_some_and(|text| requested.contains(&text));
            if items.iter().any(is_requested) {
                items.retain(is_requested);
            }
        }
    }
    true
}
