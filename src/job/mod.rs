//! Job data model
//!
//! This module defines the submission surface and the data that flows
//! through the scheduler:
//! - Stable dedupe identities derived from normalized URLs
//! - Crawl targets, requests, and dispatched jobs
//! - Completion outcomes and cached finished records

mod identity;
mod types;

pub use identity::JobIdentity;
pub use types::{
    CrawlJob, CrawlTarget, FetchMethod, FinishedRecord, JobOutcome, PageCapture, PageRequest,
    ResourceKind,
};
