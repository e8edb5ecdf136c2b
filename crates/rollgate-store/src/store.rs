//! JobStore — redb-backed persistence for deployment jobs.
//!
//! Values are JSON-serialized into redb's `&[u8]` value column. The store
//! supports both on-disk and in-memory backends (the latter for testing),
//! and is the single place the job lifecycle invariants are enforced.

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::tables::JOBS;
use crate::types::{epoch_secs, JobRecord, JobStatus};

/// Convert any `Display` error into a `StoreError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StoreError::$variant(e.to_string())
    };
}

/// Optional filters for job listing.
#[derive(Debug, Clone, Default)]
pub struct JobFilter {
    pub app: Option<String>,
    pub status: Option<JobStatus>,
    /// Maximum number of records returned. Defaults to 50 when unset.
    pub limit: Option<usize>,
}

const DEFAULT_LIST_LIMIT: usize = 50;

/// Thread-safe job store backed by redb.
#[derive(Clone)]
pub struct JobStore {
    db: Arc<Database>,
}

impl JobStore {
    /// Open (or create) a persistent job store at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "job store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory job store (for testing).
    pub fn open_in_memory() -> StoreResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory job store opened");
        Ok(store)
    }

    /// Create all tables if they don't exist yet.
    fn ensure_tables(&self) -> StoreResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        // Opening a table in a write transaction creates it if absent.
        txn.open_table(JOBS).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    /// Insert a freshly submitted job record.
    pub fn insert(&self, job: &JobRecord) -> StoreResult<()> {
        self.put(job)?;
        debug!(id = %job.id, app = %job.app, "job stored");
        Ok(())
    }

    /// Get a job by id.
    pub fn get(&self, id: &str) -> StoreResult<Option<JobRecord>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(JOBS).map_err(map_err!(Table))?;
        match table.get(id).map_err(map_err!(Read))? {
            Some(guard) => {
                let job: JobRecord =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(job))
            }
            None => Ok(None),
        }
    }

    /// List jobs, newest first, honoring the filter.
    pub fn list(&self, filter: &JobFilter) -> StoreResult<Vec<JobRecord>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(JOBS).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (_, value) = entry.map_err(map_err!(Read))?;
            let job: JobRecord =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            if let Some(app) = &filter.app {
                if &job.app != app {
                    continue;
                }
            }
            if let Some(status) = filter.status {
                if job.status != status {
                    continue;
                }
            }
            results.push(job);
        }
        results.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        results.truncate(filter.limit.unwrap_or(DEFAULT_LIST_LIMIT));
        Ok(results)
    }

    /// Advance a job's status, recording the error message for failures.
    ///
    /// Rejects transitions outside queued → running → {success | failed};
    /// terminal records are immutable.
    pub fn update_status(
        &self,
        id: &str,
        status: JobStatus,
        error: Option<&str>,
    ) -> StoreResult<JobRecord> {
        let mut job = self
            .get(id)?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        if !job.status.can_transition_to(status) {
            return Err(StoreError::InvalidTransition {
                id: id.to_string(),
                from: job.status,
                to: status,
            });
        }

        job.status = status;
        job.error = error.map(str::to_string);
        job.updated_at = epoch_secs();
        self.put(&job)?;
        debug!(%id, ?status, "job status updated");
        Ok(job)
    }

    /// Record the discovered compose path and service for a job.
    ///
    /// Allowed exactly once, while the job is running.
    pub fn set_discovered(
        &self,
        id: &str,
        compose_path: &str,
        service: &str,
    ) -> StoreResult<JobRecord> {
        let mut job = self
            .get(id)?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        if job.compose_path.is_some() || job.service.is_some() {
            return Err(StoreError::DiscoveredAlreadySet(id.to_string()));
        }

        job.compose_path = Some(compose_path.to_string());
        job.service = Some(service.to_string());
        job.updated_at = epoch_secs();
        self.put(&job)?;
        debug!(%id, %compose_path, %service, "discovered fields recorded");
        Ok(job)
    }

    fn put(&self, job: &JobRecord) -> StoreResult<()> {
        let value = serde_json::to_vec(job).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(JOBS).map_err(map_err!(Table))?;
            table
                .insert(job.id.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queued_job(app: &str) -> JobRecord {
        JobRecord::new(app, "registry.local/app:v1")
    }

    #[test]
    fn insert_and_get() {
        let store = JobStore::open_in_memory().unwrap();
        let job = queued_job("api");

        store.insert(&job).unwrap();
        let retrieved = store.get(&job.id).unwrap();

        assert_eq!(retrieved, Some(job));
    }

    #[test]
    fn get_nonexistent_returns_none() {
        let store = JobStore::open_in_memory().unwrap();
        assert!(store.get("nope").unwrap().is_none());
    }

    #[test]
    fn full_lifecycle_to_success() {
        let store = JobStore::open_in_memory().unwrap();
        let job = queued_job("api");
        store.insert(&job).unwrap();

        store.update_status(&job.id, JobStatus::Running, None).unwrap();
        let done = store.update_status(&job.id, JobStatus::Success, None).unwrap();

        assert_eq!(done.status, JobStatus::Success);
        assert!(done.error.is_none());
    }

    #[test]
    fn failure_records_error_message() {
        let store = JobStore::open_in_memory().unwrap();
        let job = queued_job("api");
        store.insert(&job).unwrap();

        store.update_status(&job.id, JobStatus::Running, None).unwrap();
        let failed = store
            .update_status(&job.id, JobStatus::Failed, Some("pull failed"))
            .unwrap();

        assert_eq!(failed.status, JobStatus::Failed);
        assert_eq!(failed.error.as_deref(), Some("pull failed"));
    }

    #[test]
    fn skipping_running_is_rejected() {
        let store = JobStore::open_in_memory().unwrap();
        let job = queued_job("api");
        store.insert(&job).unwrap();

        let result = store.update_status(&job.id, JobStatus::Success, None);
        assert!(matches!(result, Err(StoreError::InvalidTransition { .. })));
    }

    #[test]
    fn terminal_records_are_immutable() {
        let store = JobStore::open_in_memory().unwrap();
        let job = queued_job("api");
        store.insert(&job).unwrap();
        store.update_status(&job.id, JobStatus::Running, None).unwrap();
        store
            .update_status(&job.id, JobStatus::Failed, Some("boom"))
            .unwrap();

        for next in [JobStatus::Running, JobStatus::Success, JobStatus::Queued] {
            let result = store.update_status(&job.id, next, None);
            assert!(matches!(result, Err(StoreError::InvalidTransition { .. })));
        }

        // Error message survives untouched.
        let job = store.get(&job.id).unwrap().unwrap();
        assert_eq!(job.error.as_deref(), Some("boom"));
    }

    #[test]
    fn update_unknown_job_is_not_found() {
        let store = JobStore::open_in_memory().unwrap();
        let result = store.update_status("missing", JobStatus::Running, None);
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[test]
    fn discovered_fields_set_once() {
        let store = JobStore::open_in_memory().unwrap();
        let job = queued_job("api");
        store.insert(&job).unwrap();
        store.update_status(&job.id, JobStatus::Running, None).unwrap();

        let updated = store
            .set_discovered(&job.id, "/srv/app/compose.yml", "api")
            .unwrap();
        assert_eq!(updated.compose_path.as_deref(), Some("/srv/app/compose.yml"));
        assert_eq!(updated.service.as_deref(), Some("api"));

        let result = store.set_discovered(&job.id, "/other/compose.yml", "api");
        assert!(matches!(result, Err(StoreError::DiscoveredAlreadySet(_))));
    }

    #[test]
    fn list_filters_by_app_and_status() {
        let store = JobStore::open_in_memory().unwrap();
        let a = queued_job("api");
        let b = queued_job("api");
        let c = queued_job("worker");
        for job in [&a, &b, &c] {
            store.insert(job).unwrap();
        }
        store.update_status(&b.id, JobStatus::Running, None).unwrap();
        store.update_status(&b.id, JobStatus::Failed, Some("x")).unwrap();

        let api_jobs = store
            .list(&JobFilter { app: Some("api".to_string()), ..Default::default() })
            .unwrap();
        assert_eq!(api_jobs.len(), 2);

        let failed = store
            .list(&JobFilter { status: Some(JobStatus::Failed), ..Default::default() })
            .unwrap();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].id, b.id);
    }

    #[test]
    fn list_honors_limit() {
        let store = JobStore::open_in_memory().unwrap();
        for _ in 0..5 {
            store.insert(&queued_job("api")).unwrap();
        }

        let limited = store
            .list(&JobFilter { limit: Some(3), ..Default::default() })
            .unwrap();
        assert_eq!(limited.len(), 3);
    }

    #[test]
    fn persistence_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("jobs.redb");
        let id;

        {
            let store = JobStore::open(&db_path).unwrap();
            let job = queued_job("api");
            id = job.id.clone();
            store.insert(&job).unwrap();
        }

        // Reopen the same database file.
        let store = JobStore::open(&db_path).unwrap();
        let job = store.get(&id).unwrap();
        assert!(job.is_some());
        assert_eq!(job.unwrap().app, "api");
    }
}
