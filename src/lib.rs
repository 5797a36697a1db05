//! Kumo-Loom: a crawl-job dispatcher for a shared rendering runtime
//!
//! This crate schedules web-crawl jobs against a single, expensive, shared
//! rendering runtime. It deduplicates work against a completion cache and an
//! in-flight registry, bounds concurrency, and periodically drains and
//! recycles the runtime to bound resource growth.

pub mod browser;
pub mod cache;
pub mod config;
pub mod crawler;
pub mod job;

use thiserror::Error;

/// Main error type for Kumo-Loom operations
#[derive(Debug, Error)]
pub enum KumoError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    #[error("Cache error: {0}")]
    Cache(#[from] cache::CacheError),

    #[error("Runtime error: {0}")]
    Runtime(#[from] browser::RuntimeInitError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Errors surfaced by the scheduler's submission path
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The submission carried no target, or no identity could be derived
    /// from it.
    #[error("Invalid job submission: {0}")]
    InvalidJob(String),

    #[error("Completion cache error: {0}")]
    Cache(#[from] cache::CacheError),
}

/// Result type alias for Kumo-Loom operations
pub type Result<T> = std::result::Result<T, KumoError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use browser::{BrowserRuntime, HttpRenderer, RenderClient, RuntimeInitError};
pub use cache::{CompletionCache, MemoryCache, SqliteCache};
pub use config::Config;
pub use crawler::{
    CompletionEvent, FetchDriver, PageDriver, Scheduler, SchedulerHealth, StatusSnapshot,
    Submission,
};
pub use job::{CrawlJob, CrawlTarget, FinishedRecord, JobIdentity, JobOutcome, PageRequest};
