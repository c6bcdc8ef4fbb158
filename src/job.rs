//! Asynchronous video analysis jobs: submission, status polling and a bounded
//! pool of workers running [`pipeline::analyze`].

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use serde_derive::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::error::Error;
use crate::pipeline::{self, AnalysisBackend, CancellationToken};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        JobId(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(JobId)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Done,
    Error,
}

impl JobStatus {
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Error)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct JobRecord {
    pub id: JobId,
    pub input: String,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobRecord {
    pub fn queued(id: JobId, input: impl Into<String>) -> Self {
        Self {
            id,
            input: input.into(),
            status: JobStatus::Queued,
            output: None,
            error: None,
        }
    }

    /// Moves to `status` unless the record already reached a terminal state.
    fn advance(&mut self, status: JobStatus) -> bool {
        if self.status.is_terminal() {
            return false;
        }

        self.status = status;
        true
    }

    fn finish(&mut self, outcome: Result<String, String>) {
        match outcome {
            Ok(output) => {
                if self.advance(JobStatus::Done) {
                    self.output = Some(output);
                }
            }
            Err(err) => {
                if self.advance(JobStatus::Error) {
                    self.error = Some(err);
                }
            }
        }
    }
}

/// Job status storage. Updates of a single record are atomic.
pub trait JobStore: Send + Sync {
    fn set(&self, record: JobRecord);

    fn get(&self, id: JobId) -> Option<JobRecord>;

    fn list(&self) -> Vec<JobRecord>;

    /// Applies `f` to the record under the store's lock and returns the
    /// updated copy.
    fn update(&self, id: JobId, f: &mut dyn FnMut(&mut JobRecord)) -> Option<JobRecord>;
}

#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    jobs: RwLock<HashMap<JobId, JobRecord>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl JobStore for InMemoryJobStore {
    fn set(&self, record: JobRecord) {
        let mut jobs = self.jobs.write().unwrap_or_else(|e| e.into_inner());
        jobs.insert(record.id, record);
    }

    fn get(&self, id: JobId) -> Option<JobRecord> {
        let jobs = self.jobs.read().unwrap_or_else(|e| e.into_inner());
        jobs.get(&id).cloned()
    }

    fn list(&self) -> Vec<JobRecord> {
        let jobs = self.jobs.read().unwrap_or_else(|e| e.into_inner());
        jobs.values().cloned().collect()
    }

    fn update(&self, id: JobId, f: &mut dyn FnMut(&mut JobRecord)) -> Option<JobRecord> {
        let mut jobs = self.jobs.write().unwrap_or_else(|e| e.into_inner());
        let rec = jobs.get_mut(&id)?;
        f(rec);

        Some(rec.clone())
    }
}

/// Accepts analysis jobs and runs at most `workers` of them at a time on the
/// blocking thread pool.
pub struct JobService {
    store: Arc<dyn JobStore>,
    backend: Arc<dyn AnalysisBackend>,
    config: Arc<PipelineConfig>,
    workers: Arc<Semaphore>,
    cancels: Arc<Mutex<HashMap<JobId, CancellationToken>>>,
    runtime: Handle,
}

impl JobService {
    /// Jobs run on the Tokio runtime current at construction.
    ///
    /// # Panics
    ///
    /// Panics when called outside of a Tokio runtime; use [`with_runtime`]
    /// to pass a handle explicitly.
    ///
    /// [`with_runtime`]: JobService::with_runtime
    pub fn new(config: PipelineConfig, backend: Arc<dyn AnalysisBackend>) -> Self {
        Self::with_store(config, backend, Arc::new(InMemoryJobStore::new()))
    }

    pub fn with_store(config: PipelineConfig, backend: Arc<dyn AnalysisBackend>, store: Arc<dyn JobStore>) -> Self {
        Self::with_runtime(config, backend, store, Handle::current())
    }

    pub fn with_runtime(
        config: PipelineConfig,
        backend: Arc<dyn AnalysisBackend>,
        store: Arc<dyn JobStore>,
        runtime: Handle,
    ) -> Self {
        let workers = config.workers.max(1);

        info!(workers, "job service started");

        Self {
            store,
            backend,
            config: Arc::new(config),
            workers: Arc::new(Semaphore::new(workers)),
            cancels: Arc::new(Mutex::new(HashMap::new())),
            runtime,
        }
    }

    /// Registers a job for `input` and schedules it on the service's runtime;
    /// callable from any thread. An input the backend cannot open is
    /// recorded as failed right away and never scheduled.
    pub fn submit(&self, input: &str) -> JobId {
        let id = JobId::new();
        let mut record = JobRecord::queued(id, input);

        if let Err(err) = self.backend.probe(input) {
            warn!(job = %id, input, %err, "input rejected");

            record.finish(Err(Error::VideoInput(err.to_string()).to_string()));
            self.store.set(record);

            return id;
        }

        self.store.set(record);
        info!(job = %id, input, "job queued");

        let cancel = CancellationToken::new();
        self.cancels
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, cancel.clone());

        let store = Arc::clone(&self.store);
        let backend = Arc::clone(&self.backend);
        let config = Arc::clone(&self.config);
        let workers = Arc::clone(&self.workers);
        let cancels = Arc::clone(&self.cancels);
        let input = input.to_string();

        self.runtime.spawn(async move {
            let result = match workers.acquire_owned().await {
                Ok(permit) => {
                    let _permit = permit;
                    Self::execute(id, input, store.as_ref(), backend, config, cancel).await
                }
                Err(_) => Err(Error::Cancelled),
            };

            if let Err(err) = &result {
                error!(job = %id, %err, "job failed");
            }

            let outcome = result.map_err(|e| e.to_string());
            store.update(id, &mut |rec| rec.finish(outcome.clone()));
            cancels.lock().unwrap_or_else(|e| e.into_inner()).remove(&id);
        });

        id
    }

    async fn execute(
        id: JobId,
        input: String,
        store: &dyn JobStore,
        backend: Arc<dyn AnalysisBackend>,
        config: Arc<PipelineConfig>,
        cancel: CancellationToken,
    ) -> Result<String, Error> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        store.update(id, &mut |rec| {
            rec.advance(JobStatus::Running);
        });
        info!(job = %id, input = %input, "job running");

        let output = tokio::task::spawn_blocking(move || {
            pipeline::analyze(backend.as_ref(), &input, &config, &cancel)
        })
        .await
        .map_err(|e| Error::WorkerPanic(e.to_string()))??;

        info!(job = %id, output = %output, "job done");

        Ok(output)
    }

    pub fn poll(&self, id: JobId) -> Result<JobRecord, Error> {
        self.store.get(id).ok_or(Error::UnknownJob(id))
    }

    pub fn list(&self) -> Vec<JobRecord> {
        self.store.list()
    }

    /// Requests cancellation. A running job stops before its next frame.
    pub fn cancel(&self, id: JobId) -> Result<JobRecord, Error> {
        let record = self.poll(id)?;

        if let Some(token) = self.cancels.lock().unwrap_or_else(|e| e.into_inner()).get(&id) {
            info!(job = %id, "cancellation requested");
            token.cancel();
        }

        Ok(record)
    }

    /// Polls until the job reaches a terminal state.
    pub async fn wait(&self, id: JobId) -> Result<JobRecord, Error> {
        loop {
            let record = self.poll(id)?;
            if record.status.is_terminal() {
                return Ok(record);
            }

            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_status_is_final() {
        let mut rec = JobRecord::queued(JobId::new(), "a.mp4");

        rec.finish(Ok("a.out".into()));
        assert_eq!(rec.status, JobStatus::Done);

        rec.finish(Err(Error::Cancelled.to_string()));
        assert_eq!(rec.status, JobStatus::Done);
        assert_eq!(rec.error, None);
        assert!(!rec.advance(JobStatus::Running));
    }

    #[test]
    fn store_updates_in_place() {
        let store = InMemoryJobStore::new();
        let id = JobId::new();
        store.set(JobRecord::queued(id, "a.mp4"));

        let rec = store.update(id, &mut |r| {
            r.advance(JobStatus::Running);
        });
        assert_eq!(rec.map(|r| r.status), Some(JobStatus::Running));
        assert_eq!(store.get(id).map(|r| r.status), Some(JobStatus::Running));
        assert!(store.update(JobId::new(), &mut |_| {}).is_none());
    }

    #[test]
    fn status_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&JobStatus::Running).unwrap(), r#""running""#);
    }

    #[test]
    fn job_id_round_trips_through_display() {
        let id = JobId::new();
        assert_eq!(id.to_string().parse::<JobId>().unwrap(), id);
    }
}
