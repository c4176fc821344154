//! Background job messages

use crate::errors::AppResult;
use crate::model::connection::ConnectionConfig;
use crate::services::query_runner::{QueryResult, SqlSession};
use std::sync::mpsc::Receiver;
use std::time::Instant;

/// What a job was started for
#[derive(Debug, Clone, PartialEq)]
pub enum JobKind {
    Connect { config: ConnectionConfig },
    /// Script run whose rows go to the table field `target`
    Query { source_key: String, target: String },
}

impl JobKind {
    pub fn label(&self) -> String {
        match self {
            JobKind::Connect { config } => format!("Connecting to {}", config.describe()),
            JobKind::Query { source_key, .. } => format!("Running script for '{}'", source_key),
        }
    }
}

/// Sent by a worker thread when it is done
pub enum JobMessage {
    Connected(AppResult<Box<dyn SqlSession>>),
    QueryFinished(AppResult<QueryResult>),
}

/// A job running on a worker thread
pub struct BackgroundJob {
    pub kind: JobKind,
    pub receiver: Receiver<JobMessage>,
    pub start_instant: Instant,
}

/// A finished job handed back to the app
pub struct JobOutcome {
    pub kind: JobKind,
    pub message: JobMessage,
    pub elapsed_ms: u128,
}
