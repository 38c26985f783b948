//! The gloss pipeline: chunking, backends, retry, caching, rendering.
//!
//! # Module Structure
//!
//! - [`chunk`] - speech chunk assembly and content hashing
//! - [`backend`] - agent CLI backends (Strategy pattern)
//! - [`retry`] - exponential backoff around backend calls
//! - [`error`] - user-facing error type for the pipeline
//! - [`prompt`] - prompt templates and response cleanup
//! - [`document`] - markdown document rendering
//! - [`service`] - the orchestrating facade

pub mod backend;
pub mod chunk;
pub mod document;
pub mod error;
pub mod prompt;
pub mod retry;
pub mod service;

pub use backend::{BackendKind, GlossBackend};
pub use chunk::{assemble, content_hash, SpeechChunk};
pub use document::{output_filename, GlossedChunk};
pub use error::GlossError;
pub use retry::RetryPolicy;
pub use service::{GlossOptions, GlossReport, GlossService, DEFAULT_MERGE_THRESHOLD};

/// The gloss type this pipeline produces. Cache rows are keyed by
/// (passage hash, gloss type) so other gloss kinds can share the store.
pub const GLOSS_KIND: &str = "line-by-line";
