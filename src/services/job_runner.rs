//! Background job runner service
//!
//! Runs connects and queries on a worker thread so the UI keeps drawing.
//! One job at a time; the app polls on every tick.

use crate::errors::{AppError, AppResult};
use crate::model::connection::ConnectionConfig;
use crate::model::job::{BackgroundJob, JobKind, JobMessage, JobOutcome};
use crate::services::query_runner::{QueryExecutor, SqlConnector};
use serde_json::{Map, Value};
use std::sync::mpsc::{self, TryRecvError};
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::{debug, warn};

pub struct JobRunner {
    /// Current background job (if any)
    job: Option<BackgroundJob>,
}

impl Default for JobRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl JobRunner {
    pub fn new() -> Self {
        Self { job: None }
    }

    pub fn is_busy(&self) -> bool {
        self.job.is_some()
    }

    /// Get the start instant of the current job
    pub fn start_instant(&self) -> Option<Instant> {
        self.job.as_ref().map(|j| j.start_instant)
    }

    pub fn current(&self) -> Option<&JobKind> {
        self.job.as_ref().map(|j| &j.kind)
    }

    fn ensure_idle(&self) -> AppResult<()> {
        match &self.job {
            Some(job) => Err(AppError::Query(format!(
                "busy: {} is still running",
                job.kind.label()
            ))),
            None => Ok(()),
        }
    }

    pub fn spawn_connect(
        &mut self,
        connector: Arc<dyn SqlConnector>,
        config: ConnectionConfig,
    ) -> AppResult<()> {
        self.ensure_idle()?;
        let (tx, rx) = mpsc::channel();
        let worker_config = config.clone();

        thread::spawn(move || {
            let result = connector.connect(&worker_config);
            // The receiver is gone when the job was cancelled
            let _ = tx.send(JobMessage::Connected(result));
        });

        self.job = Some(BackgroundJob {
            kind: JobKind::Connect { config },
            receiver: rx,
            start_instant: Instant::now(),
        });
        Ok(())
    }

    /// Render `script` with `params` and run it on the worker
    pub fn spawn_query(
        &mut self,
        executor: QueryExecutor,
        script: String,
        params: Map<String, Value>,
        kind: JobKind,
    ) -> AppResult<()> {
        self.ensure_idle()?;
        let (tx, rx) = mpsc::channel();
        debug!("spawning query job: {}", kind.label());

        thread::spawn(move || {
            let result = executor.execute_script(&script, Some(&params));
            let _ = tx.send(JobMessage::QueryFinished(result));
        });

        self.job = Some(BackgroundJob {
            kind,
            receiver: rx,
            start_instant: Instant::now(),
        });
        Ok(())
    }

    /// Take the finished job, if the worker has reported
    pub fn poll(&mut self) -> Option<JobOutcome> {
        let job = self.job.as_ref()?;
        let message = match job.receiver.try_recv() {
            Ok(message) => message,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => {
                warn!("worker for '{}' exited without a result", job.kind.label());
                let error = AppError::Query("worker stopped without a result".to_string());
                match job.kind {
                    JobKind::Connect { .. } => JobMessage::Connected(Err(AppError::Connection(
                        error.message().to_string(),
                    ))),
                    JobKind::Query { .. } => JobMessage::QueryFinished(Err(error)),
                }
            }
        };
        let job = self.job.take()?;
        Some(JobOutcome {
            kind: job.kind,
            message,
            elapsed_ms: job.start_instant.elapsed().as_millis(),
        })
    }

    /// Forget the current job; a late result is dropped with the channel
    pub fn clear(&mut self) -> Option<JobKind> {
        self.job.take().map(|j| j.kind)
    }
}
