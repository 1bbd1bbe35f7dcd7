//! # noteport-core
//!
//! Core types, traits, and abstractions for the noteport import pipeline.
//!
//! This crate provides the normalized document tree, the file and outcome
//! types, and the collaborator traits that the other noteport crates depend
//! on.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable per-file failure, temp file cleanup failure |
//! | INFO  | Lifecycle events (startup, shutdown), batch completions |
//! | DEBUG | Decision points: chosen encoding, chosen converter, config |
//! | TRACE | Per-section and per-node detail |

pub mod defaults;
pub mod document;
pub mod error;
pub mod file_safety;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use document::{
    Block, Document, HeadingAttrs, Inline, LinkAttrs, ListItem, Mark, OrderedListAttrs, TaskItem,
    TaskItemAttrs,
};
pub use error::{Error, ErrorKind, Result};
pub use file_safety::sanitize_filename;
pub use models::*;
pub use traits::*;
