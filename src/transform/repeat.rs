// src/transform/repeat.rs

use serde_yaml::{Mapping, Value};
use tracing::{debug, warn};

use crate::document::model::{Parallel, MATRIX, PARALLEL, REPEAT};

/// Make a job run `count` times, each instance seeing its index in
/// `REPEAT`.
///
/// - no `parallel`: `parallel: {matrix: [{REPEAT: [0, .., count-1]}]}`
/// - `parallel: K`: becomes `parallel: count*K`
/// - a matrix: `REPEAT` is set on the first matrix entry
///
/// A `count` of zero leaves the definition alone.
pub fn add_repeat(definition: &mut Value, count: u32) {
    if count == 0 {
        return;
    }
    if definition.is_null() {
        *definition = Value::Mapping(Mapping::new());
    }
    if !definition.is_mapping() {
        warn!(value = ?definition, "cannot repeat a job that is not a mapping");
        return;
    }
    let Some(job) = definition.as_mapping_mut() else {
        return;
    };

    let axis = repeat_axis(count);
    match job.get_mut(PARALLEL) {
        None => {
            job.insert(Value::from(PARALLEL), matrix_of(axis));
        }
        Some(parallel) => {
            if let Some(replicas) = parallel.as_u64() {
                *parallel = Value::from(replicas.saturating_mul(u64::from(count)));
            } else if let Some(settings) = parallel.as_mapping_mut() {
                set_repeat_axis(settings, axis);
            } else {
                warn!(value = ?parallel, "replacing unrecognised `parallel` value");
                *parallel = matrix_of(axis);
            }
        }
    }
    debug!(count, "added repeat");
}

fn set_repeat_axis(settings: &mut Mapping, axis: Value) {
    match settings.get_mut(MATRIX) {
        Some(Value::Sequence(entries)) => match entries.first_mut() {
            Some(Value::Mapping(first)) => {
                first.insert(Value::from(REPEAT), axis);
            }
            Some(other) => {
                warn!(value = ?other, "first matrix entry is not a mapping, replacing it");
                *other = repeat_entry(axis);
            }
            None => entries.push(repeat_entry(axis)),
        },
        _ => {
            settings.insert(Value::from(MATRIX), Value::Sequence(vec![repeat_entry(axis)]));
        }
    }
}

fn repeat_axis(count: u32) -> Value {
    Value::Sequence((0..count).map(Value::from).collect())
}

fn repeat_entry(axis: Value) -> Value {
    let mut entry = Mapping::new();
    entry.insert(Value::from(REPEAT), axis);
    Value::Mapping(entry)
}

fn matrix_of(axis: Value) -> Value {
    let mut parallel = Mapping::new();
    parallel.insert(Value::from(MATRIX), Value::Sequence(vec![repeat_entry(axis)]));
    Value::Mapping(parallel)
}

/// Number of job instances GitLab creates for a definition.
///
/// A matrix creates, per entry, one instance for every combination of its
/// axis values; a scalar axis counts as one value.
pub fn parallel_size(definition: &Value) -> u64 {
    match Parallel::of(definition) {
        Parallel::Absent | Parallel::Other(_) => 1,
        Parallel::Replicas(replicas) => replicas,
        Parallel::Matrix(entries) => entries
            .iter()
            .map(|entry| match entry.as_mapping() {
                Some(axes) => axes
                    .values()
                    .map(|values| match values {
                        Value::Sequence(items) => items.len() as u64,
                        _ => 1,
                    })
                    .fold(1u64, u64::saturating_mul),
                None => 1,
            })
            .fold(0u64, u64::saturating_add),
    }
}
