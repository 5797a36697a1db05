//! Crawl-job scheduler
//!
//! The scheduler owns the pending queue, the in-flight registry, the
//! concurrency accounting, and the runtime-recycle protocol:
//! - Submissions are deduplicated against the completion cache and the
//!   in-flight registry before they ever reach the queue
//! - Dispatch pops the FIFO queue while slots are free, binding each job to
//!   the current runtime handle
//! - Once enough jobs have finished, dispatch is suppressed until every
//!   in-flight unit retires, then the runtime handle is closed and replaced
//!
//! All scheduler state lives behind one lock and is only touched in short,
//! non-suspending critical sections; execution units run as independent
//! tasks and re-enter the scheduler exactly once, through the completion
//! path.

use crate::browser::BrowserRuntime;
use crate::cache::CompletionCache;
use crate::config::SchedulerConfig;
use crate::crawler::driver::PageDriver;
use crate::crawler::unit::{ExecutionUnit, UnitProgress};
use crate::job::{CrawlJob, CrawlTarget, FinishedRecord, JobIdentity, JobOutcome};
use crate::SchedulerError;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::{mpsc, watch};

/// Result of a submission
#[derive(Debug, Clone)]
pub enum Submission {
    /// The identity was already finished; served verbatim from the cache
    /// without touching the queue or the registry.
    Finished(FinishedRecord),

    /// The identity is currently in flight; a snapshot of the live unit.
    InFlight(UnitProgress),

    /// Accepted and queued. The job has not started executing synchronously
    /// with the submission.
    Enqueued,
}

/// Read-only snapshot of the scheduler's state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub queue_depth: usize,
    pub running_count: usize,
    pub finished_since_reset: u32,
    pub draining: bool,
}

/// One finished job, delivered to the scheduler's owner
///
/// Whether and how discovered requests feed back into the queue is the
/// owner's decision; the scheduler only reports.
#[derive(Debug, Clone)]
pub struct CompletionEvent {
    pub identity: JobIdentity,
    pub outcome: JobOutcome,
}

/// Liveness of the scheduler as seen by its owner
///
/// `Failed` is terminal: the runtime could not be reinitialized and dispatch
/// stays suppressed for good.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerHealth {
    Running,
    Failed(String),
}

/// The crawl-job scheduler
///
/// Generic over the runtime provider and the page driver; both are opaque
/// beyond their lifecycle contracts. Construction hands back the scheduler
/// together with the completion-event receiver.
pub struct Scheduler<R, D>
where
    R: BrowserRuntime,
    D: PageDriver<R::Handle>,
{
    config: SchedulerConfig,
    runtime: Arc<R>,
    driver: Arc<D>,
    cache: Arc<dyn CompletionCache>,
    inner: Mutex<Inner<R::Handle>>,
    events: mpsc::UnboundedSender<CompletionEvent>,
    health: watch::Sender<SchedulerHealth>,
    weak: Weak<Self>,
}

/// Mutable scheduler state, guarded by the scheduler's single lock
struct Inner<H> {
    /// Current runtime handle; replaced wholesale during a recycle
    handle: Arc<H>,

    /// FIFO queue of admitted jobs waiting for a slot
    pending: VecDeque<CrawlJob>,

    /// In-flight registry: at most one live unit per identity
    running: HashMap<JobIdentity, Arc<ExecutionUnit>>,

    /// Completions since the last recycle, successes and failures alike
    finished_since_reset: u32,

    /// Dispatch suppressed while the in-flight set retires ahead of a recycle
    draining: bool,

    /// Close-and-reinitialize in progress
    recycling: bool,
}

impl<R, D> Scheduler<R, D>
where
    R: BrowserRuntime,
    D: PageDriver<R::Handle>,
{
    /// Creates a scheduler bound to an already-initialized runtime handle
    ///
    /// Returns the scheduler and the receiver for completion events.
    /// Dropping the receiver is harmless; events are then discarded.
    pub fn new(
        config: SchedulerConfig,
        runtime: Arc<R>,
        driver: Arc<D>,
        cache: Arc<dyn CompletionCache>,
        handle: R::Handle,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<CompletionEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (health_tx, _) = watch::channel(SchedulerHealth::Running);

        let scheduler = Arc::new_cyclic(|weak| Self {
            config,
            runtime,
            driver,
            cache,
            inner: Mutex::new(Inner {
                handle: Arc::new(handle),
                pending: VecDeque::new(),
                running: HashMap::new(),
                finished_since_reset: 0,
                draining: false,
                recycling: false,
            }),
            events: events_tx,
            health: health_tx,
            weak: weak.clone(),
        });

        (scheduler, events_rx)
    }

    /// Submits a crawl target
    ///
    /// Returns synchronously without blocking:
    /// - [`Submission::Finished`] when the cache already holds the identity
    /// - [`Submission::InFlight`] when a live unit owns the identity
    /// - [`Submission::Enqueued`] when the job was appended to the queue
    ///
    /// Fails with [`SchedulerError::InvalidJob`] when no identity can be
    /// derived from the target; nothing is mutated in that case.
    pub fn submit(&self, target: CrawlTarget) -> Result<Submission, SchedulerError> {
        let job = CrawlJob::from_target(target)?;

        if let Some(record) = self.cache.lookup(job.identity())? {
            tracing::debug!("Cache hit for {}", job.identity());
            return Ok(Submission::Finished(record));
        }

        let mut inner = self.inner.lock().unwrap();

        if let Some(unit) = inner.running.get(job.identity()) {
            tracing::debug!("Already in flight: {}", job.identity());
            return Ok(Submission::InFlight(unit.progress()));
        }

        tracing::debug!("Queued {}", job.identity());
        inner.pending.push_back(job);
        self.fill_slots(&mut inner);

        Ok(Submission::Enqueued)
    }

    /// Returns a read-only snapshot of the scheduler's state
    pub fn status(&self) -> StatusSnapshot {
        let inner = self.inner.lock().unwrap();
        StatusSnapshot {
            queue_depth: inner.pending.len(),
            running_count: inner.running.len(),
            finished_since_reset: inner.finished_since_reset,
            draining: inner.draining,
        }
    }

    /// Subscribes to the scheduler's health
    pub fn health(&self) -> watch::Receiver<SchedulerHealth> {
        self.health.subscribe()
    }

    /// Dispatches queued jobs until a slot, the queue, or admission runs out
    fn fill_slots(&self, inner: &mut Inner<R::Handle>) {
        while self.dispatch_one(inner) {}
    }

    /// Attempts to dispatch the head of the queue; no-op when at the cap,
    /// draining, or out of queued work
    fn dispatch_one(&self, inner: &mut Inner<R::Handle>) -> bool {
        if inner.draining || inner.running.len() >= self.config.max_concurrent as usize {
            return false;
        }

        let Some(scheduler) = self.weak.upgrade() else {
            return false;
        };

        let Some(job) = inner.pending.pop_front() else {
            return false;
        };

        let unit = Arc::new(ExecutionUnit::new(job));
        let identity = unit.identity().clone();
        inner.running.insert(identity.clone(), Arc::clone(&unit));

        tracing::debug!("Dispatching {}", identity);

        let driver = Arc::clone(&self.driver);
        let handle = Arc::clone(&inner.handle);

        // The driver runs in its own task so that a panic surfaces as a join
        // error here instead of swallowing the completion.
        let work = tokio::spawn(async move { driver.drive(handle.as_ref(), unit.as_ref()).await });

        tokio::spawn(async move {
            let outcome = match work.await {
                Ok(outcome) => outcome,
                Err(e) => JobOutcome::failure(format!("execution unit panicked: {}", e)),
            };
            scheduler.complete(identity, outcome);
        });

        true
    }

    /// Completion path, entered exactly once per dispatched unit
    fn complete(&self, identity: JobIdentity, outcome: JobOutcome) {
        // Record before removing the registry entry so a concurrent submit
        // never sees the job in neither store.
        if let Err(e) = self.cache.record(&identity, outcome.clone()) {
            tracing::warn!("Failed to record outcome for {}: {}", identity, e);
        }

        let mut inner = self.inner.lock().unwrap();

        if inner.running.remove(&identity).is_none() {
            tracing::warn!("Completion for unregistered unit {}", identity);
        }

        inner.finished_since_reset += 1;

        match &outcome {
            JobOutcome::Success(_) => tracing::debug!("Finished {}", identity),
            JobOutcome::Failure { error } => tracing::debug!("Failed {}: {}", identity, error),
        }

        let _ = self.events.send(CompletionEvent { identity, outcome });

        // Strictly greater: the recycle fires one completion past the
        // nominal threshold.
        if inner.finished_since_reset > self.config.reset_threshold {
            inner.draining = true;
        }

        if inner.draining {
            if inner.running.is_empty() && !inner.recycling {
                inner.recycling = true;
                let old_handle = Arc::clone(&inner.handle);
                tracing::info!(
                    "Drained after {} finished jobs, recycling runtime",
                    inner.finished_since_reset
                );
                drop(inner);
                self.spawn_recycle(old_handle);
            }
            // Otherwise remaining units retire naturally; each completion
            // re-checks the drained condition.
        } else {
            self.fill_slots(&mut inner);
        }
    }

    fn spawn_recycle(&self, old_handle: Arc<R::Handle>) {
        let Some(scheduler) = self.weak.upgrade() else {
            return;
        };
        tokio::spawn(async move {
            scheduler.recycle(old_handle).await;
        });
    }

    /// Closes the retired handle and brings up a fresh one
    ///
    /// On success the counters reset and dispatch resumes in the same lock
    /// acquisition. On failure dispatch stays suppressed for good: a broken
    /// handle must never be handed to a unit.
    async fn recycle(&self, old_handle: Arc<R::Handle>) {
        self.runtime.close(old_handle.as_ref()).await;

        match self.runtime.initialize().await {
            Ok(handle) => {
                let mut inner = self.inner.lock().unwrap();
                inner.handle = Arc::new(handle);
                inner.finished_since_reset = 0;
                inner.draining = false;
                inner.recycling = false;
                tracing::info!("Runtime recycled, dispatch resumed");
                self.fill_slots(&mut inner);
            }
            Err(e) => {
                tracing::error!("Runtime reinitialization failed: {}", e);
                self.health
                    .send_replace(SchedulerHealth::Failed(e.to_string()));
            }
        }
    }
}
