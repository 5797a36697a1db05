//! Crawl dispatch core
//!
//! This module contains the scheduler state machine and its collaborators:
//! - Admission control, dedupe, and FIFO dispatch under a concurrency cap
//! - Drain-then-recycle protocol for the shared rendering runtime
//! - Per-job execution units with observable progress
//! - The page driver seam and the default HTTP fetch driver
//! - Link and form extraction from rendered pages

mod driver;
mod parser;
mod scheduler;
mod unit;

pub use driver::{FetchDriver, PageDriver};
pub use parser::{extract_requests, ExtractedPage};
pub use scheduler::{
    CompletionEvent, Scheduler, SchedulerHealth, StatusSnapshot, Submission,
};
pub use unit::{ExecutionUnit, UnitPhase, UnitProgress};
