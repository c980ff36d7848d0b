//! Error types for opsboard

use thiserror::Error;

/// Errors that can occur while fetching or aggregating dashboard data
#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("Failed to parse dataset: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Unknown table: {0}")]
    UnknownTable(String),

    #[error("Fetch from {table} failed: {message}")]
    FetchError { table: String, message: String },

    #[error("Invalid row for {table}: {message}")]
    InvalidRow { table: String, message: String },

    #[error("Record source unavailable: every sub-fetch failed")]
    SourceUnavailable,

    #[error("Invalid configuration: {0}")]
    ConfigError(String),
}

impl DashboardError {
    /// Shorthand for a fetch failure against a named table
    pub fn fetch(table: impl Into<String>, message: impl Into<String>) -> Self {
        DashboardError::FetchError {
            table: table.into(),
            message: message.into(),
        }
    }
}
