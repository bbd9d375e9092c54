// src/dag/classify.rs

use serde_yaml::Value;

use crate::document::model::has_script;

/// Whether a top-level entry may be dropped from a minimum pipeline.
///
/// Only real jobs are removable: a mapping with `script`, or a mapping
/// whose name contains `:` (generated matrix names). Hidden jobs
/// (`.template`) never are, and neither are global keywords like
/// `stages` or `variables`.
pub fn is_removable(definition: &Value, name: &str) -> bool {
    definition.is_mapping()
        && (has_script(definition) || name.contains(':'))
        && !name.starts_with('.')
}
