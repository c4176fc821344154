//! Database session state and statement execution
//!
//! `QueryRunner` tracks whether a session is open and runs statements on it.
//! The database sits behind `SqlConnector`/`SqlSession` so the state machine
//! can be driven without a server.

use crate::errors::{AppError, AppResult};
use crate::model::connection::ConnectionConfig;
use crate::services::template::TemplateEngine;
use postgres::{NoTls, SimpleQueryMessage};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use tracing::{debug, error, info, warn};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

pub const NOT_CONNECTED: &str = "Not connected";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    pub affected_rows: u64,
    pub query_type: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionStatus {
    pub connected: bool,
    pub message: String,
}

impl ConnectionStatus {
    fn disconnected(message: impl Into<String>) -> Self {
        Self {
            connected: false,
            message: message.into(),
        }
    }
}

/// Sends a server-side cancel for whatever the session is running
pub trait QueryCanceller: Send + Sync {
    fn cancel(&self) -> AppResult<()>;
}

/// An open database session
pub trait SqlSession: Send {
    /// Run one (possibly multi-statement) script in its own transaction
    fn execute(&mut self, statement: &str) -> AppResult<QueryResult>;

    fn canceller(&self) -> Option<Arc<dyn QueryCanceller>> {
        None
    }
}

/// Opens sessions from connection settings
pub trait SqlConnector: Send + Sync {
    fn connect(&self, config: &ConnectionConfig) -> AppResult<Box<dyn SqlSession>>;
}

pub type SharedSession = Arc<Mutex<Box<dyn SqlSession>>>;

/// Handle on the open session that a worker thread can own
#[derive(Clone)]
pub struct QueryExecutor {
    session: SharedSession,
    templates: Arc<TemplateEngine>,
}

impl QueryExecutor {
    pub fn execute(&self, statement: &str) -> AppResult<QueryResult> {
        debug!("executing: {}", statement);
        let mut guard = self
            .session
            .lock()
            .map_err(|_| AppError::Query("session is unusable after a failed query".to_string()))?;
        let result = guard.execute(statement);
        if let Err(e) = &result {
            error!("query failed: {}", e);
        }
        result
    }

    /// Render `script` with `params` when given, then execute it
    pub fn execute_script(
        &self,
        script: &str,
        params: Option<&Map<String, Value>>,
    ) -> AppResult<QueryResult> {
        let statement = match params {
            Some(params) if !params.is_empty() => {
                let rendered = self.templates.render_with(script, params)?;
                debug!("rendered script: {}", rendered);
                rendered
            }
            _ => script.to_string(),
        };
        self.execute(&statement)
    }
}

/// First keyword of a statement, upper-cased
fn infer_query_type(sql: &str) -> String {
    sql.split_whitespace()
        .next()
        .map(|s| s.to_uppercase())
        .unwrap_or_else(|| "UNKNOWN".to_string())
}

pub struct QueryRunner {
    connector: Arc<dyn SqlConnector>,
    session: Option<SharedSession>,
    canceller: Option<Arc<dyn QueryCanceller>>,
    status: ConnectionStatus,
    templates: Arc<TemplateEngine>,
}

impl QueryRunner {
    pub fn new(connector: Arc<dyn SqlConnector>) -> Self {
        Self {
            connector,
            session: None,
            canceller: None,
            status: ConnectionStatus::disconnected(NOT_CONNECTED),
            templates: Arc::new(TemplateEngine::new()),
        }
    }

    pub fn postgres() -> Self {
        Self::new(Arc::new(PostgresConnector))
    }

    pub fn connector(&self) -> Arc<dyn SqlConnector> {
        Arc::clone(&self.connector)
    }

    pub fn is_connected(&self) -> bool {
        self.status.connected && self.session.is_some()
    }

    pub fn status(&self) -> &ConnectionStatus {
        &self.status
    }

    /// A handle for running statements; fails until a connect has succeeded
    pub fn executor(&self) -> AppResult<QueryExecutor> {
        match self.session.as_ref().filter(|_| self.status.connected) {
            Some(session) => Ok(QueryExecutor {
                session: Arc::clone(session),
                templates: Arc::clone(&self.templates),
            }),
            None => Err(AppError::Connection(NOT_CONNECTED.to_string())),
        }
    }

    /// Record the outcome of a connect attempt made elsewhere (a worker thread)
    pub fn finish_connect(
        &mut self,
        config: &ConnectionConfig,
        result: AppResult<Box<dyn SqlSession>>,
    ) -> ConnectionStatus {
        self.close();
        match result {
            Ok(session) => {
                self.canceller = session.canceller();
                self.session = Some(Arc::new(Mutex::new(session)));
                self.status = ConnectionStatus {
                    connected: true,
                    message: format!("Connected to {}", config.describe()),
                };
                info!("connected to {}", config.describe());
            }
            Err(e) => {
                error!("connection to {} failed: {}", config.describe(), e);
                self.status = ConnectionStatus::disconnected(e.message());
            }
        }
        self.status.clone()
    }

    /// Best-effort cancel of the running statement, sent from a detached thread
    pub fn cancel(&mut self) {
        if let Some(canceller) = self.canceller.clone() {
            thread::spawn(move || {
                if let Err(e) = canceller.cancel() {
                    warn!("cancel request failed: {}", e);
                }
            });
        }
        if self.status.connected {
            self.status.message = "Query cancelled; connection state unknown".to_string();
        }
        warn!("running query cancelled by user");
    }

    pub fn close(&mut self) {
        if self.session.take().is_some() {
            info!("connection closed");
        }
        self.canceller = None;
        self.status = ConnectionStatus::disconnected(NOT_CONNECTED);
    }
}

// ─── PostgreSQL ─────────────────────────────────────────────────────────

pub struct PostgresConnector;

impl SqlConnector for PostgresConnector {
    fn connect(&self, config: &ConnectionConfig) -> AppResult<Box<dyn SqlSession>> {
        let client = postgres::Config::new()
            .host(&config.host)
            .port(config.port)
            .dbname(&config.dbname)
            .user(&config.user)
            .password(&config.password)
            .connect_timeout(CONNECT_TIMEOUT)
            .connect(NoTls)
            .map_err(|e| AppError::Connection(describe_pg_error(&e)))?;
        Ok(Box::new(PostgresSession { client }))
    }
}

struct PostgresSession {
    client: postgres::Client,
}

struct PostgresCanceller(postgres::CancelToken);

impl QueryCanceller for PostgresCanceller {
    fn cancel(&self) -> AppResult<()> {
        self.0
            .cancel_query(NoTls)
            .map_err(|e| AppError::Connection(describe_pg_error(&e)))
    }
}

impl SqlSession for PostgresSession {
    fn execute(&mut self, statement: &str) -> AppResult<QueryResult> {
        let mut tx = self
            .client
            .transaction()
            .map_err(|e| AppError::Query(describe_pg_error(&e)))?;
        let messages = match tx.simple_query(statement) {
            Ok(messages) => messages,
            Err(e) => {
                let message = describe_pg_error(&e);
                if let Err(rollback) = tx.rollback() {
                    warn!("rollback failed: {}", describe_pg_error(&rollback));
                }
                return Err(AppError::Query(message));
            }
        };
        tx.commit()
            .map_err(|e| AppError::Query(describe_pg_error(&e)))?;

        let mut result = collect_messages(messages);
        result.query_type = infer_query_type(statement);
        Ok(result)
    }

    fn canceller(&self) -> Option<Arc<dyn QueryCanceller>> {
        Some(Arc::new(PostgresCanceller(self.client.cancel_token())))
    }
}

/// Keep the rows of the last statement that returned any
fn collect_messages(messages: Vec<SimpleQueryMessage>) -> QueryResult {
    let mut result = QueryResult::default();
    let mut columns: Vec<String> = Vec::new();
    let mut rows: Vec<Vec<Value>> = Vec::new();

    for message in messages {
        match message {
            SimpleQueryMessage::Row(row) => {
                if columns.is_empty() {
                    columns = row.columns().iter().map(|c| c.name().to_string()).collect();
                }
                let values = (0..row.len())
                    .map(|i| match row.get(i) {
                        Some(text) => Value::String(text.to_string()),
                        None => Value::Null,
                    })
                    .collect();
                rows.push(values);
            }
            SimpleQueryMessage::CommandComplete(count) => {
                result.affected_rows += count;
                if !columns.is_empty() {
                    result.columns = std::mem::take(&mut columns);
                    result.rows = std::mem::take(&mut rows);
                }
            }
            _ => {}
        }
    }
    result
}

fn describe_pg_error(e: &postgres::Error) -> String {
    match e.as_db_error() {
        Some(db) => format!("{}: {}", db.severity(), db.message()),
        None => e.to_string(),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;

    /// Session that fails any statement containing `boom`
    pub(crate) struct FakeSession;

    impl SqlSession for FakeSession {
        fn execute(&mut self, statement: &str) -> AppResult<QueryResult> {
            if statement.contains("boom") {
                return Err(AppError::Query("syntax error at or near \"boom\"".to_string()));
            }
            Ok(QueryResult {
                columns: vec!["name".to_string(), "active".to_string()],
                rows: vec![vec![json!(statement), json!("t")]],
                affected_rows: 1,
                query_type: infer_query_type(statement),
            })
        }
    }

    pub(crate) struct FakeConnector {
        pub accept: bool,
    }

    impl SqlConnector for FakeConnector {
        fn connect(&self, config: &ConnectionConfig) -> AppResult<Box<dyn SqlSession>> {
            if self.accept {
                Ok(Box::new(FakeSession))
            } else {
                Err(AppError::Connection(format!(
                    "could not connect to {}",
                    config.host
                )))
            }
        }
    }

    fn runner(accept: bool) -> QueryRunner {
        QueryRunner::new(Arc::new(FakeConnector { accept }))
    }

    /// Connect on the calling thread, the way the app does once a worker reports
    pub(crate) fn connect(runner: &mut QueryRunner, config: &ConnectionConfig) -> ConnectionStatus {
        let result = runner.connector().connect(config);
        runner.finish_connect(config, result)
    }

    pub(crate) fn connected_runner() -> QueryRunner {
        let mut runner = runner(true);
        connect(&mut runner, &ConnectionConfig::default());
        runner
    }

    #[test]
    fn test_execute_before_connect_is_error() {
        let runner = runner(true);
        let err = runner.executor().err().unwrap();
        assert!(matches!(err, AppError::Connection(_)));
        assert!(!runner.is_connected());
        assert_eq!(runner.status().message, NOT_CONNECTED);
    }

    #[test]
    fn test_failed_connect_leaves_disconnected() {
        let mut runner = runner(false);
        let status = connect(&mut runner, &ConnectionConfig::default());
        assert!(!status.connected);
        assert!(status.message.contains("localhost"));
        assert!(!runner.is_connected());
        assert!(runner.executor().is_err());
    }

    #[test]
    fn test_failed_execute_keeps_connection() {
        let runner = connected_runner();
        let executor = runner.executor().unwrap();
        assert!(executor.execute("select boom").is_err());
        assert!(runner.is_connected());
        let result = runner.executor().unwrap().execute("select 1").unwrap();
        assert_eq!(result.query_type, "SELECT");
    }

    #[test]
    fn test_connect_failure_after_success_disconnects() {
        let mut runner = connected_runner();
        let status = runner.finish_connect(
            &ConnectionConfig::default(),
            Err(AppError::Connection("refused".to_string())),
        );
        assert!(!status.connected);
        assert!(!runner.is_connected());
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut runner = connected_runner();
        runner.close();
        runner.close();
        assert!(!runner.is_connected());
        assert!(runner.executor().is_err());
    }

    #[test]
    fn test_execute_script_renders_params() {
        let executor = connected_runner().executor().unwrap();
        let mut params = Map::new();
        params.insert("value".to_string(), json!("dim_client"));
        let result = executor
            .execute_script("select '{{ value }}'", Some(&params))
            .unwrap();
        assert_eq!(result.rows[0][0], json!("select 'dim_client'"));

        let err = executor
            .execute_script("select {{ nope }}", Some(&params))
            .unwrap_err();
        assert!(matches!(err, AppError::Template(_)));

        let raw = executor.execute_script("select '{{ x }}'", None).unwrap();
        assert_eq!(raw.rows[0][0], json!("select '{{ x }}'"));
    }

    #[test]
    fn test_real_server_refuses_closed_port() {
        let mut runner = QueryRunner::postgres();
        let config = ConnectionConfig {
            host: "127.0.0.1".to_string(),
            port: 1,
            ..ConnectionConfig::default()
        };
        let status = connect(&mut runner, &config);
        assert!(!status.connected);
        assert!(!runner.is_connected());
    }

    #[test]
    #[ignore = "needs CONFIG_BUILDER_TEST_PG=host:port:db:user:password"]
    fn test_live_postgres_round_trip() {
        let target = std::env::var("CONFIG_BUILDER_TEST_PG").unwrap();
        let parts: Vec<&str> = target.split(':').collect();
        let config = ConnectionConfig {
            host: parts[0].to_string(),
            port: parts[1].parse().unwrap(),
            dbname: parts[2].to_string(),
            user: parts[3].to_string(),
            password: parts.get(4).unwrap_or(&"").to_string(),
        };
        let mut runner = QueryRunner::postgres();
        assert!(connect(&mut runner, &config).connected);
        let executor = runner.executor().unwrap();

        let result = executor
            .execute("select 1 as a; select 'x' as name, null as active")
            .unwrap();
        assert_eq!(result.columns, vec!["name", "active"]);
        assert_eq!(result.rows, vec![vec![json!("x"), Value::Null]]);

        assert!(executor.execute("select * from no_such_table_here").is_err());
        assert!(runner.is_connected());
        assert!(executor.execute("select 1").is_ok());
    }
}
