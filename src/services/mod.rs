//! External service interactions
//!
//! - JSON documents on disk
//! - SQL templating
//! - PostgreSQL sessions and background jobs
//! - Password obfuscation
//! - File logging

pub mod job_runner;
pub mod logging;
pub mod obfuscation;
pub mod query_runner;
pub mod schema_store;
pub mod template;

pub use job_runner::JobRunner;
