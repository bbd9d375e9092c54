// src/document/store.rs

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde_yaml::{Mapping, Value};
use tracing::{debug, info};

use crate::dag::JobGraph;
use crate::document::tags::TagRegistry;
use crate::errors::{MinipipeError, Result};
use crate::fs::{FileSystem, Fingerprint};
use crate::transform::RewrittenDocument;
use crate::types::JobName;

/// One CI file: its jobs in file order.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    name: String,
    path: PathBuf,
    jobs: Mapping,
}

impl SourceDocument {
    /// Build a document from already-parsed jobs.
    ///
    /// Fails if `jobs` has a key that is not a string.
    pub fn new(path: impl Into<PathBuf>, jobs: Mapping) -> Result<Self> {
        let path = path.into();
        if let Some(key) = jobs.keys().find(|k| !k.is_string()) {
            return Err(MinipipeError::InvalidDocument {
                path,
                reason: format!("job names must be strings, found {:?}", key),
            });
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        Ok(Self { name, path, jobs })
    }

    /// File name, used in messages.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn jobs(&self) -> &Mapping {
        &self.jobs
    }

    /// Job names in file order.
    pub fn job_names(&self) -> impl Iterator<Item = &str> {
        self.jobs.keys().filter_map(Value::as_str)
    }

    /// `(name, definition)` pairs in file order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.jobs
            .iter()
            .filter_map(|(k, v)| k.as_str().map(|name| (name, v)))
    }
}

/// The CI documents of one directory.
///
/// Loading records, for every job, which document defined it; a job name
/// defined twice is an error. Documents that parse to nothing (empty files)
/// are skipped and never written back.
#[derive(Debug)]
pub struct DocumentStore {
    fs: Arc<dyn FileSystem>,
    dir: PathBuf,
    registry: TagRegistry,
    documents: Vec<SourceDocument>,
    origins: HashMap<JobName, usize>,
}

impl DocumentStore {
    /// Load every file in `dir` whose name matches one of `patterns`.
    ///
    /// Files are read in file-name order so runs are reproducible.
    pub fn load(
        fs: Arc<dyn FileSystem>,
        dir: impl Into<PathBuf>,
        patterns: &[String],
        registry: TagRegistry,
    ) -> Result<Self> {
        let dir = dir.into();
        let matcher = build_matcher(patterns)?;

        let mut paths: Vec<PathBuf> = fs
            .read_dir(&dir)
            .with_context(|| format!("listing CI documents in {:?}", dir))?
            .into_iter()
            .filter(|path| fs.is_file(path))
            .filter(|path| {
                path.file_name()
                    .is_some_and(|name| matcher.is_match(Path::new(name)))
            })
            .collect();
        paths.sort();

        let mut store = Self {
            fs,
            dir,
            registry,
            documents: Vec::with_capacity(paths.len()),
            origins: HashMap::new(),
        };

        for path in paths {
            store.load_document(path)?;
        }

        info!(
            dir = ?store.dir,
            documents = store.documents.len(),
            jobs = store.origins.len(),
            "loaded CI documents"
        );
        Ok(store)
    }

    fn load_document(&mut self, path: PathBuf) -> Result<()> {
        let text = self.fs.read_to_string(&path)?;
        let label = path.to_string_lossy().into_owned();

        let jobs = match self.registry.decode(&label, &text)? {
            Value::Null => {
                debug!(document = %label, "empty document, skipping");
                return Ok(());
            }
            Value::Mapping(jobs) => jobs,
            other => {
                return Err(MinipipeError::InvalidDocument {
                    path,
                    reason: format!("expected a mapping of jobs, found {}", kind_of(&other)),
                });
            }
        };

        let document = SourceDocument::new(path, jobs)?;
        self.add_document(document)
    }

    fn add_document(&mut self, document: SourceDocument) -> Result<()> {
        let index = self.documents.len();
        for name in document.job_names() {
            if let Some(&first) = self.origins.get(name) {
                return Err(MinipipeError::DuplicateJob {
                    job: name.to_string(),
                    first: self.documents[first].name().to_string(),
                    second: document.name().to_string(),
                });
            }
            self.origins.insert(name.to_string(), index);
        }
        debug!(
            document = %document.name(),
            jobs = document.jobs().len(),
            "registered document"
        );
        self.documents.push(document);
        Ok(())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn documents(&self) -> &[SourceDocument] {
        &self.documents
    }

    pub fn file_system(&self) -> Arc<dyn FileSystem> {
        Arc::clone(&self.fs)
    }

    /// The document that defines `job`.
    pub fn origin_of(&self, job: &str) -> Option<&SourceDocument> {
        self.origins.get(job).map(|&i| &self.documents[i])
    }

    /// Paths of every loaded document.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.documents.iter().map(|d| d.path().to_path_buf()).collect()
    }

    /// Flat job graph over all documents.
    pub fn job_graph(&self) -> JobGraph {
        JobGraph::from_documents(&self.documents)
    }

    /// Content hash of every loaded document as it is on disk right now.
    pub fn fingerprint(&self) -> Result<Fingerprint> {
        Ok(Fingerprint::of_paths(self.fs.as_ref(), self.paths())?)
    }

    /// Serialise one rewritten document the way [`persist`](Self::persist) would.
    pub fn render(&self, document: &RewrittenDocument) -> Result<String> {
        let label = document.path().to_string_lossy();
        self.registry
            .encode(&label, &Value::Mapping(document.jobs().clone()))
    }

    /// Write rewritten documents back over the files they were loaded from.
    ///
    /// Every output must correspond to a loaded document; all of them are
    /// rendered before the first write.
    pub fn persist(&self, outputs: &[RewrittenDocument]) -> Result<()> {
        let mut rendered = Vec::with_capacity(outputs.len());
        for output in outputs {
            if !self.documents.iter().any(|d| d.path() == output.path()) {
                return Err(MinipipeError::InvalidDocument {
                    path: output.path().to_path_buf(),
                    reason: "not one of the loaded CI documents".to_string(),
                });
            }
            rendered.push((output.path(), self.render(output)?));
        }

        for (path, text) in rendered {
            self.fs.write(path, text.as_bytes())?;
            debug!(document = ?path, bytes = text.len(), "wrote document");
        }
        info!(documents = outputs.len(), "persisted rewritten CI documents");
        Ok(())
    }
}

fn build_matcher(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat)
            .with_context(|| format!("invalid document glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build().context("building document globset")?)
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a list",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}
