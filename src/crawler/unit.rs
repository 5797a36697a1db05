//! Per-job execution units
//!
//! One unit owns one crawl job for its whole lifetime. The unit exposes a
//! progress snapshot that the scheduler serves to duplicate submissions, and
//! nothing else: a unit never sees scheduler internals.

use crate::job::{CrawlJob, JobIdentity};
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Mutex;

/// Where a unit currently is in its crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitPhase {
    /// Dispatched, not yet on the wire
    Starting,

    /// Page request in flight
    Fetching,

    /// Response received, pulling links and form probes out of the body
    Extracting,
}

impl fmt::Display for UnitPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Starting => "starting",
            Self::Fetching => "fetching",
            Self::Extracting => "extracting",
        };
        write!(f, "{}", label)
    }
}

/// Read-only progress snapshot of a live unit
#[derive(Debug, Clone)]
pub struct UnitProgress {
    pub url: String,
    pub phase: UnitPhase,
    pub started_at: DateTime<Utc>,
}

/// The per-job worker the scheduler dispatches
///
/// Constructed by the scheduler at dispatch time; drivers advance the phase
/// cell while they work so concurrent duplicate submissions get a live
/// snapshot.
pub struct ExecutionUnit {
    job: CrawlJob,
    started_at: DateTime<Utc>,
    phase: Mutex<UnitPhase>,
}

impl ExecutionUnit {
    pub(crate) fn new(job: CrawlJob) -> Self {
        Self {
            job,
            started_at: Utc::now(),
            phase: Mutex::new(UnitPhase::Starting),
        }
    }

    pub fn job(&self) -> &CrawlJob {
        &self.job
    }

    pub fn identity(&self) -> &JobIdentity {
        self.job.identity()
    }

    /// Advances the unit's observable phase
    pub fn set_phase(&self, phase: UnitPhase) {
        *self.phase.lock().unwrap() = phase;
    }

    /// Snapshots the unit's current progress
    pub fn progress(&self) -> UnitProgress {
        UnitProgress {
            url: self.job.url().to_string(),
            phase: *self.phase.lock().unwrap(),
            started_at: self.started_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::CrawlTarget;

    fn unit(url: &str) -> ExecutionUnit {
        ExecutionUnit::new(CrawlJob::from_target(CrawlTarget::url(url)).unwrap())
    }

    #[test]
    fn test_starts_in_starting_phase() {
        let unit = unit("https://example.com/page");
        assert_eq!(unit.progress().phase, UnitPhase::Starting);
        assert_eq!(unit.progress().url, "https://example.com/page");
    }

    #[test]
    fn test_phase_advances() {
        let unit = unit("https://example.com/page");

        unit.set_phase(UnitPhase::Fetching);
        assert_eq!(unit.progress().phase, UnitPhase::Fetching);

        unit.set_phase(UnitPhase::Extracting);
        assert_eq!(unit.progress().phase, UnitPhase::Extracting);
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(UnitPhase::Starting.to_string(), "starting");
        assert_eq!(UnitPhase::Fetching.to_string(), "fetching");
        assert_eq!(UnitPhase::Extracting.to_string(), "extracting");
    }
}
