//! Application error taxonomy
//!
//! User-input and I/O failures are caught at the boundary and turned into
//! notifications. `Wiring` is the one variant that is allowed to travel all
//! the way up to `main`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    /// Missing or corrupt JSON document at startup
    #[error("SCHEMA_LOAD: {0}")]
    SchemaLoad(String),
    /// Bad template syntax or undefined reference
    #[error("TEMPLATE: {0}")]
    Template(String),
    /// Failed to open a database session
    #[error("CONNECTION: {0}")]
    Connection(String),
    /// Failed statement execution or result binding
    #[error("QUERY: {0}")]
    Query(String),
    /// A control or change event references a key the output model does not declare
    #[error("WIRING: {0}")]
    Wiring(String),
    #[error("IO: {0}")]
    Io(String),
    #[error("JSON: {0}")]
    Json(String),
    #[error("OBFUSCATION: {0}")]
    Obfuscation(String),
}

impl AppError {
    /// Message without the category prefix, for display in the UI
    pub fn message(&self) -> &str {
        match self {
            AppError::SchemaLoad(m)
            | AppError::Template(m)
            | AppError::Connection(m)
            | AppError::Query(m)
            | AppError::Wiring(m)
            | AppError::Io(m)
            | AppError::Json(m)
            | AppError::Obfuscation(m) => m,
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value.to_string())
    }
}

impl From<minijinja::Error> for AppError {
    fn from(value: minijinja::Error) -> Self {
        Self::Template(value.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;
