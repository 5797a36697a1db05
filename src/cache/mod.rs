//! Completion cache for finished crawl jobs
//!
//! The scheduler consults the cache on every submission and records every
//! outcome into it; a hit short-circuits the queue entirely. Two backends
//! are provided:
//! - [`MemoryCache`]: process-lifetime `HashMap`
//! - [`SqliteCache`]: durable store that survives restarts

mod memory;
mod sqlite;

pub use memory::MemoryCache;
pub use sqlite::SqliteCache;

use crate::job::{FinishedRecord, JobIdentity, JobOutcome};
use thiserror::Error;

/// Errors that can occur during cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Corrupt record for {identity}: {message}")]
    Corrupt { identity: String, message: String },
}

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;

/// Store of finished jobs keyed by their normalized-URL identity
///
/// The scheduler only ever queries and appends; it never removes records.
pub trait CompletionCache: Send + Sync {
    /// Looks up the finished record for an identity, if any
    fn lookup(&self, identity: &JobIdentity) -> CacheResult<Option<FinishedRecord>>;

    /// Records the outcome of a finished job, stamping the completion time
    ///
    /// Recording the same identity again replaces the previous record.
    fn record(&self, identity: &JobIdentity, outcome: JobOutcome) -> CacheResult<()>;
}
