//! Persistent gloss cache.
//!
//! Three tables: passages (keyed by content hash), glosses (one per
//! passage and gloss type), and addenda (free-form notes attached to a
//! gloss). The `GlossStore` trait is the seam the pipeline talks
//! through; `SqliteStore` is the only production implementation.

mod sqlite;

pub use sqlite::SqliteStore;

use thiserror::Error;

/// Errors from the gloss store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("no gloss with id {0}")]
    UnknownGloss(i64),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A passage about to be cached, with its addressing metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassageRecord {
    /// Play title the passage belongs to.
    pub play: String,
    /// Act number; 0 for the opening prologue and the epilogue.
    pub act: u32,
    /// Scene number; 0 for prologues, -1 for the epilogue.
    pub scene: i32,
    /// SHA-256 hex digest of the passage text.
    pub hash: String,
    /// Speaker summary, e.g. "HAMLET ... HORATIO (3 speeches)".
    pub speakers: String,
}

/// A gloss retrieved from the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedGloss {
    pub gloss_id: i64,
    pub content: String,
    /// RFC 3339 timestamp of when the gloss was stored.
    pub created_at: String,
}

/// Per-play cache statistics for the `status` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaySummary {
    pub play: String,
    pub passages: usize,
    pub glosses: usize,
}

/// One row of full-text search output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    /// Id of the matching gloss, usable with `append_note`.
    pub gloss_id: i64,
    pub play: String,
    pub act: u32,
    pub scene: i32,
    pub speakers: String,
    pub gloss_type: String,
    /// The matching gloss content, truncated for display.
    pub snippet: String,
}

/// Storage seam for the gloss pipeline.
pub trait GlossStore {
    /// Look up a cached gloss by passage hash and gloss type.
    fn get(&self, hash: &str, gloss_type: &str) -> StoreResult<Option<CachedGloss>>;

    /// Store a gloss, replacing any existing one for the same passage and
    /// type. Returns the gloss id.
    fn put(&self, passage: &PassageRecord, gloss_type: &str, content: &str) -> StoreResult<i64>;

    /// Attach a note to an existing gloss.
    fn append_note(&self, gloss_id: i64, note: &str) -> StoreResult<()>;

    /// Notes attached to a gloss, oldest first.
    fn notes(&self, gloss_id: i64) -> StoreResult<Vec<String>>;

    /// Cache statistics grouped by play.
    fn plays(&self) -> StoreResult<Vec<PlaySummary>>;

    /// Case-insensitive substring search over gloss content.
    fn search(&self, term: &str) -> StoreResult<Vec<SearchHit>>;
}
