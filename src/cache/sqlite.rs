//! SQLite completion cache
//!
//! Durable backend for the completion cache. Finished jobs live in one row
//! each; discovered follow-up requests live in a child table so no value
//! needs serialization beyond SQL types.

use crate::cache::{CacheError, CacheResult, CompletionCache};
use crate::job::{
    FetchMethod, FinishedRecord, JobIdentity, JobOutcome, PageCapture, PageRequest, ResourceKind,
};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;

/// SQL schema for the completion cache
const SCHEMA_SQL: &str = r#"
-- One row per finished job, keyed by normalized-URL identity
CREATE TABLE IF NOT EXISTS finished_jobs (
    identity TEXT PRIMARY KEY,
    success INTEGER NOT NULL,
    final_url TEXT,
    status_code INTEGER,
    title TEXT,
    error_message TEXT,
    finished_at TEXT NOT NULL
);

-- Follow-up requests discovered on a finished page
CREATE TABLE IF NOT EXISTS discovered_requests (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    identity TEXT NOT NULL REFERENCES finished_jobs(identity),
    url TEXT NOT NULL,
    method TEXT NOT NULL,
    resource TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_discovered_identity ON discovered_requests(identity);
"#;

/// Durable completion cache backed by SQLite
pub struct SqliteCache {
    conn: Mutex<Connection>,
}

impl SqliteCache {
    /// Opens or creates the cache database at the given path
    pub fn new(path: &Path) -> CacheResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        conn.execute_batch(SCHEMA_SQL)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> CacheResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Counts finished jobs in the cache
    pub fn finished_count(&self) -> CacheResult<u64> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM finished_jobs", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

impl CompletionCache for SqliteCache {
    fn lookup(&self, identity: &JobIdentity) -> CacheResult<Option<FinishedRecord>> {
        let conn = self.conn.lock().unwrap();

        let row = conn
            .prepare(
                "SELECT success, final_url, status_code, title, error_message, finished_at
                 FROM finished_jobs WHERE identity = ?1",
            )?
            .query_row(params![identity.as_str()], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, Option<u16>>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, String>(5)?,
                ))
            })
            .optional()?;

        let Some((success, final_url, status_code, title, error_message, finished_at)) = row else {
            return Ok(None);
        };

        let finished_at = DateTime::parse_from_rfc3339(&finished_at)
            .map_err(|e| CacheError::Corrupt {
                identity: identity.to_string(),
                message: format!("bad finished_at timestamp: {}", e),
            })?
            .with_timezone(&Utc);

        let outcome = if success != 0 {
            let mut stmt = conn.prepare(
                "SELECT url, method, resource FROM discovered_requests
                 WHERE identity = ?1 ORDER BY id",
            )?;
            let discovered = stmt
                .query_map(params![identity.as_str()], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                })?
                .collect::<Result<Vec<_>, _>>()?;

            let mut requests = Vec::with_capacity(discovered.len());
            for (url, method, resource) in discovered {
                let method = FetchMethod::from_db_string(&method).ok_or_else(|| {
                    CacheError::Corrupt {
                        identity: identity.to_string(),
                        message: format!("unknown method '{}'", method),
                    }
                })?;
                let resource = ResourceKind::from_db_string(&resource).ok_or_else(|| {
                    CacheError::Corrupt {
                        identity: identity.to_string(),
                        message: format!("unknown resource kind '{}'", resource),
                    }
                })?;
                requests.push(PageRequest {
                    url,
                    method,
                    resource,
                });
            }

            JobOutcome::Success(PageCapture {
                final_url: final_url.unwrap_or_default(),
                status_code: status_code.unwrap_or_default(),
                title,
                discovered: requests,
            })
        } else {
            JobOutcome::Failure {
                error: error_message.unwrap_or_default(),
            }
        };

        Ok(Some(FinishedRecord {
            identity: identity.clone(),
            outcome,
            finished_at,
        }))
    }

    fn record(&self, identity: &JobIdentity, outcome: JobOutcome) -> CacheResult<()> {
        let mut conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();

        let tx = conn.transaction()?;

        match &outcome {
            JobOutcome::Success(capture) => {
                tx.execute(
                    "INSERT OR REPLACE INTO finished_jobs
                     (identity, success, final_url, status_code, title, error_message, finished_at)
                     VALUES (?1, 1, ?2, ?3, ?4, NULL, ?5)",
                    params![
                        identity.as_str(),
                        capture.final_url,
                        capture.status_code,
                        capture.title,
                        now
                    ],
                )?;

                tx.execute(
                    "DELETE FROM discovered_requests WHERE identity = ?1",
                    params![identity.as_str()],
                )?;

                for request in &capture.discovered {
                    tx.execute(
                        "INSERT INTO discovered_requests (identity, url, method, resource)
                         VALUES (?1, ?2, ?3, ?4)",
                        params![
                            identity.as_str(),
                            request.url,
                            request.method.to_db_string(),
                            request.resource.to_db_string()
                        ],
                    )?;
                }
            }
            JobOutcome::Failure { error } => {
                tx.execute(
                    "INSERT OR REPLACE INTO finished_jobs
                     (identity, success, final_url, status_code, title, error_message, finished_at)
                     VALUES (?1, 0, NULL, NULL, NULL, ?2, ?3)",
                    params![identity.as_str(), error, now],
                )?;

                tx.execute(
                    "DELETE FROM discovered_requests WHERE identity = ?1",
                    params![identity.as_str()],
                )?;
            }
        }

        tx.commit()?;
        Ok(())
    }
}
