//! Task error types.

use std::time::Duration;
use thiserror::Error;

use crate::db::timeouts::TimeoutError;

/// Task errors
#[derive(Debug, Error)]
pub enum TaskError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Persistence call exceeded its deadline
    #[error("Database operation timed out after {0:?}")]
    Timeout(Duration),

    /// Storage failure reported by a non-SQL backend
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Request failed validation
    #[error("{0}")]
    Validation(String),

    /// Task does not exist or belongs to another account
    #[error("Task not found")]
    NotFound,
}

impl TaskError {
    /// Get a client-safe error message
    pub fn client_message(&self) -> String {
        match self {
            TaskError::Database(_) | TaskError::Timeout(_) | TaskError::Persistence(_) => {
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        }
    }
}

impl From<TimeoutError> for TaskError {
    fn from(err: TimeoutError) -> Self {
        match err {
            TimeoutError::Timeout(duration) => TaskError::Timeout(duration),
            TimeoutError::Database(e) => TaskError::Database(e),
        }
    }
}

/// Result type for task operations
pub type TaskResult<T> = Result<T, TaskError>;
