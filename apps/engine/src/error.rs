//! Domain error types for the problem engine.
//!
//! Uses thiserror for ergonomic error handling with automatic Display implementations.

use std::fmt;

/// Entity names reported alongside errors.
pub mod entities {
    pub const PROBLEM: &str = "problem";
    pub const PROBLEM_PATTERN: &str = "problem-pattern";
    pub const TEAM: &str = "team";
    pub const ROOT_CAUSE: &str = "root-cause";
    pub const COUNTRY: &str = "country";
    pub const TYPE: &str = "type";
    pub const DEFECT: &str = "defect";
    pub const EXECUTION: &str = "execution";
}

/// Application-level errors.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Database operation failed
    #[error("Database error: {0}")]
    Database(String),

    /// Referenced entity does not exist
    #[error("{message}")]
    NotFound {
        entity: &'static str,
        message: String,
    },

    /// Business rule violation
    #[error("{message}")]
    Invalid {
        entity: &'static str,
        key: &'static str,
        message: String,
        /// ID of the conflicting entity, for uniqueness violations
        other_id: Option<i64>,
    },

    /// The defect tracking system could not be reached
    #[error("Error while contacting the defect tracking system {system}: {message}")]
    GatewayFailure { system: String, message: String },
}

impl AppError {
    pub fn not_found(entity: &'static str, message: impl Into<String>) -> Self {
        AppError::NotFound {
            entity,
            message: message.into(),
        }
    }

    pub fn invalid(entity: &'static str, key: &'static str, message: impl Into<String>) -> Self {
        AppError::Invalid {
            entity,
            key,
            message: message.into(),
            other_id: None,
        }
    }

    pub fn not_unique(entity: &'static str, message: impl Into<String>, other_id: i64) -> Self {
        AppError::Invalid {
            entity,
            key: "not_unique",
            message: message.into(),
            other_id: Some(other_id),
        }
    }

    /// Machine-readable error kind.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::NotFound { .. } => "NOT_FOUND",
            AppError::Invalid { .. } => "INVALID",
            AppError::GatewayFailure { .. } => "GATEWAY_FAILURE",
        }
    }

    /// Reason key of an `Invalid` error.
    pub fn key(&self) -> Option<&'static str> {
        match self {
            AppError::Invalid { key, .. } => Some(*key),
            _ => None,
        }
    }

    /// Entity the error is about, when known.
    pub fn entity(&self) -> Option<&'static str> {
        match self {
            AppError::NotFound { entity, .. } | AppError::Invalid { entity, .. } => Some(*entity),
            AppError::GatewayFailure { .. } => Some(entities::DEFECT),
            AppError::Database(_) => None,
        }
    }

    /// ID of the other entity named by a uniqueness violation.
    pub fn other_id(&self) -> Option<i64> {
        match self {
            AppError::Invalid { other_id, .. } => *other_id,
            _ => None,
        }
    }
}

/// Error body for whatever layer binds the engine to a transport.
#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub other_id: Option<i64>,
}

impl From<&AppError> for ErrorResponse {
    fn from(err: &AppError) -> Self {
        let message = match err {
            AppError::Database(err_str) => {
                tracing::error!("Database error: {}", err_str);
                "An internal database error occurred".to_string()
            }
            _ => err.to_string(),
        };

        ErrorResponse {
            error: err.code().to_string(),
            message,
            entity: err.entity().map(str::to_string),
            key: err.key().map(str::to_string),
            other_id: err.other_id(),
        }
    }
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

// Conversion implementations for common error types

impl From<sea_orm::DbErr> for AppError {
    fn from(err: sea_orm::DbErr) -> Self {
        AppError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::invalid(
            entities::PROBLEM_PATTERN,
            "malformed",
            format!("JSON parsing error: {}", err),
        )
    }
}
