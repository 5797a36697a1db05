//! In-memory completion cache

use crate::cache::{CacheResult, CompletionCache};
use crate::job::{FinishedRecord, JobIdentity, JobOutcome};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Mutex;

/// Process-lifetime completion cache backed by a `HashMap`
#[derive(Debug, Default)]
pub struct MemoryCache {
    records: Mutex<HashMap<JobIdentity, FinishedRecord>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of finished records
    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().unwrap().is_empty()
    }
}

impl CompletionCache for MemoryCache {
    fn lookup(&self, identity: &JobIdentity) -> CacheResult<Option<FinishedRecord>> {
        Ok(self.records.lock().unwrap().get(identity).cloned())
    }

    fn record(&self, identity: &JobIdentity, outcome: JobOutcome) -> CacheResult<()> {
        let record = FinishedRecord {
            identity: identity.clone(),
            outcome,
            finished_at: Utc::now(),
        };
        self.records.lock().unwrap().insert(identity.clone(), record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{CrawlJob, CrawlTarget, PageCapture};

    fn identity(url: &str) -> JobIdentity {
        CrawlJob::from_target(CrawlTarget::url(url))
            .unwrap()
            .identity()
            .clone()
    }

    fn capture(url: &str) -> JobOutcome {
        JobOutcome::Success(PageCapture {
            final_url: url.to_string(),
            status_code: 200,
            title: None,
            discovered: vec![],
        })
    }

    #[test]
    fn test_lookup_miss() {
        let cache = MemoryCache::new();
        let result = cache.lookup(&identity("https://example.com/")).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_record_then_lookup() {
        let cache = MemoryCache::new();
        let id = identity("https://example.com/page");

        cache.record(&id, capture("https://example.com/page")).unwrap();

        let record = cache.lookup(&id).unwrap().unwrap();
        assert_eq!(record.identity, id);
        assert!(record.outcome.is_success());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_record_replaces_previous() {
        let cache = MemoryCache::new();
        let id = identity("https://example.com/page");

        cache.record(&id, capture("https://example.com/page")).unwrap();
        cache.record(&id, JobOutcome::failure("retried and failed")).unwrap();

        let record = cache.lookup(&id).unwrap().unwrap();
        assert!(!record.outcome.is_success());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_identities_are_independent() {
        let cache = MemoryCache::new();
        cache
            .record(&identity("https://example.com/a"), capture("https://example.com/a"))
            .unwrap();

        assert!(cache.lookup(&identity("https://example.com/b")).unwrap().is_none());
    }
}
