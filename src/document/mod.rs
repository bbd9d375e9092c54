// src/document/mod.rs

//! CI documents: loading, the typed view over job definitions, and writing
//! them back.
//!
//! - [`model`] parses the keys the resolver cares about (`script`, `needs`,
//!   `dependencies`, `extends`, `parallel`) out of an otherwise opaque YAML
//!   mapping.
//! - [`tags`] holds the [`TagRegistry`] handed to load and save calls.
//! - [`store`] owns the documents of one CI directory and remembers which
//!   document every job came from.

pub mod model;
pub mod store;
pub mod tags;

pub use model::{JobRefs, NeedRef, Parallel};
pub use store::{DocumentStore, SourceDocument};
pub use tags::TagRegistry;
