// src/document/tags.rs

//! Handling of custom YAML tags such as GitLab's `!reference`.
//!
//! `serde_yaml` keeps tagged nodes as [`Value::Tagged`], so they round-trip
//! as long as nothing rejects them. The registry decides which tags are
//! acceptable; it is passed explicitly to every load and save.

use std::collections::BTreeSet;

use serde_yaml::Value;
use tracing::debug;

use crate::config::TagSection;
use crate::errors::{MinipipeError, Result};
use crate::types::TagPolicy;

#[derive(Debug, Clone, Default)]
pub struct TagRegistry {
    policy: TagPolicy,
    known: BTreeSet<String>,
}

impl TagRegistry {
    pub fn new(policy: TagPolicy) -> Self {
        Self {
            policy,
            known: BTreeSet::new(),
        }
    }

    pub fn from_config(section: &TagSection) -> Self {
        section
            .known
            .iter()
            .fold(Self::new(section.policy), |registry, tag| registry.register(tag))
    }

    /// Accept `tag` (with or without the leading `!`) under any policy.
    pub fn register(mut self, tag: &str) -> Self {
        self.known.insert(normalise(tag));
        self
    }

    pub fn is_known(&self, tag: &str) -> bool {
        self.known.contains(&normalise(tag))
    }

    /// Parse YAML text, rejecting unregistered tags under the strict policy.
    ///
    /// Merge keys (`<<`) are expanded here, so later stages only ever see
    /// the merged mapping.
    pub fn decode(&self, document: &str, text: &str) -> Result<Value> {
        let mut value: Value = serde_yaml::from_str(text)?;
        value.apply_merge()?;
        self.check(document, &value)?;
        Ok(value)
    }

    /// Serialise a value, applying the same tag check as [`decode`](Self::decode).
    pub fn encode(&self, document: &str, value: &Value) -> Result<String> {
        self.check(document, value)?;
        Ok(serde_yaml::to_string(value)?)
    }

    fn check(&self, document: &str, value: &Value) -> Result<()> {
        match value {
            Value::Tagged(tagged) => {
                let tag = tagged.tag.to_string();
                if !self.is_known(&tag) {
                    match self.policy {
                        TagPolicy::Strict => {
                            return Err(MinipipeError::UnknownTag {
                                tag,
                                document: document.to_string(),
                            });
                        }
                        TagPolicy::Preserve => {
                            debug!(document, tag = %tag, "preserving unregistered tag");
                        }
                    }
                }
                self.check(document, &tagged.value)
            }
            Value::Sequence(items) => items.iter().try_for_each(|v| self.check(document, v)),
            Value::Mapping(map) => map.iter().try_for_each(|(k, v)| {
                self.check(document, k)?;
                self.check(document, v)
            }),
            Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => Ok(()),
        }
    }
}

fn normalise(tag: &str) -> String {
    format!("!{}", tag.trim_start_matches('!'))
}
