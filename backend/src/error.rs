//! Error handling for the booker ledger
//!
//! Every service returns [`AppResult`]. [`AppError::detail`] turns an error into
//! a serialisable shape the webview can show as-is.

use serde::Serialize;
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Storage errors
    #[error("Storage is busy: {operation} gave up after {attempts} attempts")]
    StorageBusy {
        operation: &'static str,
        attempts: u32,
    },

    #[error("Database accessed before initialization")]
    NotInitialized,

    // Reference errors
    #[error("Referenced {entity} not found: {id}")]
    ReferenceNotFound { entity: &'static str, id: String },

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Composite write failures, raised after rollback
    #[error("Failed to create {entity}: {source}")]
    CreationFailed {
        entity: &'static str,
        #[source]
        source: Box<AppError>,
    },

    #[error("Failed to update {entity}: {source}")]
    UpdateFailed {
        entity: &'static str,
        #[source]
        source: Box<AppError>,
    },

    // Validation errors
    #[error("Validation error: {message}")]
    Validation { field: String, message: String },

    #[error("Conflict: {message}")]
    Conflict { resource: String, message: String },

    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Serialisable error shape for the UI
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl AppError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Lock or busy contention that may clear on retry
    pub fn is_transient(&self) -> bool {
        match self {
            AppError::StorageBusy { .. } => true,
            AppError::CreationFailed { source, .. } | AppError::UpdateFailed { source, .. } => {
                source.is_transient()
            }
            AppError::Database(err) => is_lock_error(err),
            _ => false,
        }
    }

    /// The innermost error beneath creation/update wrappers
    pub fn root_cause(&self) -> &AppError {
        match self {
            AppError::CreationFailed { source, .. } | AppError::UpdateFailed { source, .. } => {
                source.root_cause()
            }
            other => other,
        }
    }

    /// Wrap a failed composite create. Caller mistakes pass through unchanged.
    pub fn into_creation_failed(self, entity: &'static str) -> Self {
        if self.is_caller_error() {
            return self;
        }
        AppError::CreationFailed {
            entity,
            source: Box::new(self),
        }
    }

    /// Wrap a failed composite update. Caller mistakes pass through unchanged.
    pub fn into_update_failed(self, entity: &'static str) -> Self {
        if self.is_caller_error() {
            return self;
        }
        AppError::UpdateFailed {
            entity,
            source: Box::new(self),
        }
    }

    fn is_caller_error(&self) -> bool {
        matches!(
            self,
            AppError::Validation { .. }
                | AppError::ReferenceNotFound { .. }
                | AppError::NotFound(_)
                | AppError::Conflict { .. }
        )
    }

    pub fn detail(&self) -> ErrorDetail {
        match self {
            AppError::StorageBusy { .. } => ErrorDetail {
                code: "STORAGE_BUSY".to_string(),
                message: "Storage is busy, please try again".to_string(),
                field: None,
            },
            AppError::NotInitialized => ErrorDetail {
                code: "NOT_INITIALIZED".to_string(),
                message: "The database is not open yet".to_string(),
                field: None,
            },
            AppError::ReferenceNotFound { entity, id } => ErrorDetail {
                code: "REFERENCE_NOT_FOUND".to_string(),
                message: format!("The selected {} no longer exists ({})", entity, id),
                field: None,
            },
            AppError::NotFound(resource) => ErrorDetail {
                code: "NOT_FOUND".to_string(),
                message: format!("{} not found", resource),
                field: None,
            },
            AppError::CreationFailed { entity, source } => {
                let inner = source.detail();
                ErrorDetail {
                    code: inner.code,
                    message: format!("Could not create {}: {}", entity, inner.message),
                    field: inner.field,
                }
            }
            AppError::UpdateFailed { entity, source } => {
                let inner = source.detail();
                ErrorDetail {
                    code: inner.code,
                    message: format!("Could not update {}: {}", entity, inner.message),
                    field: inner.field,
                }
            }
            AppError::Validation { field, message } => ErrorDetail {
                code: "VALIDATION_ERROR".to_string(),
                message: message.clone(),
                field: Some(field.clone()),
            },
            AppError::Conflict { resource, message } => ErrorDetail {
                code: "CONFLICT".to_string(),
                message: message.clone(),
                field: Some(resource.clone()),
            },
            AppError::Database(_) | AppError::Migration(_) => {
                tracing::error!("Database error: {:?}", self);
                ErrorDetail {
                    code: "DATABASE_ERROR".to_string(),
                    message: "A database error occurred".to_string(),
                    field: None,
                }
            }
            AppError::Configuration(msg) => ErrorDetail {
                code: "CONFIGURATION_ERROR".to_string(),
                message: msg.clone(),
                field: None,
            },
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                ErrorDetail {
                    code: "INTERNAL_ERROR".to_string(),
                    message: "An internal error occurred".to_string(),
                    field: None,
                }
            }
        }
    }
}

/// SQLITE_BUSY (5) and SQLITE_LOCKED (6), including their extended codes
fn is_lock_error(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => {
            let busy_code = db
                .code()
                .and_then(|code| code.parse::<i64>().ok())
                .map(|code| matches!(code & 0xff, 5 | 6))
                .unwrap_or(false);
            busy_code || mentions_lock(db.message())
        }
        sqlx::Error::PoolTimedOut => true,
        _ => false,
    }
}

fn mentions_lock(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    message.contains("locked") || message.contains("busy")
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let first = errors
            .field_errors()
            .into_iter()
            .next()
            .and_then(|(field, errs)| errs.first().map(|e| (field, e.clone())));

        match first {
            Some((field, err)) => {
                let message = err
                    .message
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{} is invalid ({})", field, err.code));
                AppError::validation(field, message)
            }
            None => AppError::validation("input", errors.to_string()),
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Configuration(err.to_string())
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
