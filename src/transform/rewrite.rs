// src/transform/rewrite.rs

use serde_yaml::{Mapping, Value};
use tracing::debug;

use crate::dag::MinimumJobSet;
use crate::document::SourceDocument;
use crate::target::TargetSet;
use crate::transform::narrow::NarrowedJobs;
use crate::transform::repeat::add_repeat;
use crate::transform::RewrittenDocument;

/// Everything the rewrite needs besides the documents themselves.
#[derive(Debug, Clone, Copy)]
pub struct RewriteInput<'a> {
    pub minimum: &'a MinimumJobSet,
    pub narrowed: &'a NarrowedJobs,
    pub targets: &'a TargetSet,
    pub repeat: u32,
    /// Hidden job written into a document that would otherwise be empty.
    pub placeholder: &'a str,
}

/// Produce the minimum-pipeline version of every document.
///
/// Jobs keep their original order. Jobs outside the minimum set are
/// dropped, narrowed copies replace their originals and targeted jobs are
/// repeated. Every output document has at least one entry.
pub fn rewrite(documents: &[SourceDocument], input: &RewriteInput<'_>) -> Vec<RewrittenDocument> {
    documents
        .iter()
        .map(|document| rewrite_document(document, input))
        .collect()
}

fn rewrite_document(document: &SourceDocument, input: &RewriteInput<'_>) -> RewrittenDocument {
    let mut jobs = Mapping::new();

    for (name, original) in document.entries() {
        if !input.minimum.contains(name) {
            continue;
        }
        let mut job = input
            .narrowed
            .get(name)
            .cloned()
            .unwrap_or_else(|| original.clone());
        if input.repeat > 0 && input.targets.contains(name) {
            add_repeat(&mut job, input.repeat);
        }
        jobs.insert(Value::from(name), job);
    }

    if jobs.is_empty() {
        debug!(document = %document.name(), "no jobs left, writing placeholder");
        jobs.insert(Value::from(input.placeholder), placeholder_job());
    } else {
        debug!(
            document = %document.name(),
            kept = jobs.len(),
            of = document.jobs().len(),
            "rewrote document"
        );
    }

    RewrittenDocument::new(document.path(), jobs)
}

fn placeholder_job() -> Value {
    let mut job = Mapping::new();
    job.insert(Value::from("variables"), Value::Sequence(Vec::new()));
    Value::Mapping(job)
}
