//! Error type shared by the planner engine, its storage and the shell.

use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlannerError {
    /// A required field was missing or blank
    #[error("Validation error: {0}")]
    Validation(String),

    /// No task with the given id
    #[error("Task not found: {0}")]
    NotFound(String),

    /// Reorder position outside the list
    #[error("Index {index} out of range for {len} tasks")]
    Index { index: usize, len: usize },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    /// Unparseable user input (filter, sort, priority, date, tag)
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, PlannerError>;

impl PlannerError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound(id.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}
