use thiserror::Error;

use crate::domain::Level;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{level} not found: {key}")]
    NotFound { level: Level, key: String },

    #[error("{level} already exists: {key}")]
    AlreadyExists { level: Level, key: String },

    #[error("Invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("Concurrent update on student {roll} after {attempts} attempts")]
    Conflict { roll: String, attempts: u32 },

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}

impl AppError {
    pub fn not_found(level: Level, key: impl Into<String>) -> Self {
        AppError::NotFound {
            level,
            key: key.into(),
        }
    }

    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        AppError::Validation {
            field,
            reason: reason.into(),
        }
    }

    /// HTTP-equivalent status for this error.
    pub fn status(&self) -> u16 {
        match self {
            AppError::NotFound { .. } => 404,
            AppError::AlreadyExists { .. } => 409,
            AppError::Validation { .. } => 400,
            AppError::Conflict { .. } | AppError::Database(_) => 500,
        }
    }

    /// True for errors caused by the request rather than by the service.
    pub fn is_client_error(&self) -> bool {
        self.status() < 500
    }

    /// Message safe to hand back to a client. Server-side failures collapse
    /// into a generic message; their detail only goes to the log.
    pub fn client_message(&self) -> String {
        match self {
            AppError::NotFound { level, .. } => level.not_found_message().to_string(),
            AppError::AlreadyExists { .. } | AppError::Validation { .. } => self.to_string(),
            AppError::Conflict { .. } | AppError::Database(_) => {
                "Internal server error".to_string()
            }
        }
    }
}
