#![allow(dead_code)]

use serde_yaml::{Mapping, Value};

use minipipe::fs::mock::MockFileSystem;

/// Directory the helpers put CI documents in; matches the default config.
pub const CI_DIR: &str = "gitlab";

/// Builder for a job definition.
#[derive(Debug, Clone, Default)]
pub struct JobBuilder {
    job: Mapping,
}

impl JobBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A job with `script: [<cmd>]`.
    pub fn script(cmd: &str) -> Self {
        Self::new().with("script", Value::Sequence(vec![Value::from(cmd)]))
    }

    pub fn with(mut self, key: &str, value: Value) -> Self {
        self.job.insert(Value::from(key), value);
        self
    }

    pub fn needs(self, jobs: &[&str]) -> Self {
        self.with("needs", names(jobs))
    }

    pub fn dependencies(self, jobs: &[&str]) -> Self {
        self.with("dependencies", names(jobs))
    }

    pub fn extends(self, parent: &str) -> Self {
        self.with("extends", Value::from(parent))
    }

    pub fn parallel(self, replicas: u64) -> Self {
        self.with("parallel", Value::from(replicas))
    }

    /// Add one matrix entry with a single axis.
    pub fn matrix_axis(mut self, axis: &str, values: &[&str]) -> Self {
        let mut entry = Mapping::new();
        entry.insert(Value::from(axis), names(values));

        let parallel = self
            .job
            .entry(Value::from("parallel"))
            .or_insert_with(|| Value::Mapping(Mapping::new()));
        if let Value::Mapping(parallel) = parallel {
            let matrix = parallel
                .entry(Value::from("matrix"))
                .or_insert_with(|| Value::Sequence(Vec::new()));
            if let Value::Sequence(entries) = matrix {
                entries.push(Value::Mapping(entry));
            }
        }
        self
    }

    pub fn build(self) -> Value {
        Value::Mapping(self.job)
    }
}

fn names(values: &[&str]) -> Value {
    Value::Sequence(values.iter().map(|v| Value::from(*v)).collect())
}

/// Render `(name, definition)` pairs as a YAML document, in order.
pub fn document_text(jobs: &[(&str, Value)]) -> String {
    let mut doc = Mapping::new();
    for (name, job) in jobs {
        doc.insert(Value::from(*name), job.clone());
    }
    serde_yaml::to_string(&Value::Mapping(doc)).expect("serialising test document")
}

/// An in-memory filesystem holding `files` (name, YAML text) under [`CI_DIR`].
pub fn ci_file_system(files: &[(&str, &str)]) -> MockFileSystem {
    let fs = MockFileSystem::new();
    fs.add_dir(CI_DIR);
    for (name, text) in files {
        fs.add_file(format!("{CI_DIR}/{name}"), *text);
    }
    fs
}
