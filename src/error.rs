//! Error taxonomy for task store operations.

use crate::types::TaskId;
use serde::Serialize;
use thiserror::Error;

/// Stable codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors
    MissingRequiredField,
    InvalidFieldValue,
    InvalidRequest,

    // Not found errors
    TaskNotFound,

    // Reference errors
    MissingReference,
    DependencyBlocksDelete,

    // Auth errors
    Unauthorized,
    InvalidCredentials,
    UserExists,

    // Internal errors
    DatabaseError,
    MalformedAggregate,
    InternalError,
    RequestTimeout,
}

/// A caller-supplied task failed the field rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
    missing: bool,
}

impl ValidationError {
    pub fn missing_field(field: &'static str) -> Self {
        Self {
            field,
            message: format!("{} must not be empty", field),
            missing: true,
        }
    }

    pub fn invalid_value(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
            missing: false,
        }
    }

    pub fn code(&self) -> ErrorCode {
        if self.missing {
            ErrorCode::MissingRequiredField
        } else {
            ErrorCode::InvalidFieldValue
        }
    }
}

/// An edge refers to a task that does not exist, or a delete is blocked by one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ReferenceError {
    #[error("a referenced task does not exist")]
    MissingTask,
    #[error("task {0} is a dependency of another task and must not be deleted")]
    DependencyBlocksDelete(TaskId),
}

/// Any backend failure that has no domain meaning.
#[derive(Debug, Error)]
pub enum StoreFailure {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("malformed aggregate: {0}")]
    Format(#[from] FormatError),
    #[error("migration failed: {0}")]
    Migration(#[from] refinery::Error),
    #[error("{0}")]
    Internal(String),
}

/// A `{...}` id-list payload did not have the expected shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct FormatError(pub String);

/// Errors returned by task store operations.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("task {0} not found")]
    NotFound(TaskId),
    #[error(transparent)]
    Reference(#[from] ReferenceError),
    #[error(transparent)]
    Store(#[from] StoreFailure),
}

impl TaskError {
    pub fn internal(message: impl Into<String>) -> Self {
        TaskError::Store(StoreFailure::Internal(message.into()))
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            TaskError::Validation(err) => err.code(),
            TaskError::NotFound(_) => ErrorCode::TaskNotFound,
            TaskError::Reference(ReferenceError::MissingTask) => ErrorCode::MissingReference,
            TaskError::Reference(ReferenceError::DependencyBlocksDelete(_)) => {
                ErrorCode::DependencyBlocksDelete
            }
            TaskError::Store(StoreFailure::Format(_)) => ErrorCode::MalformedAggregate,
            TaskError::Store(StoreFailure::Internal(_)) => ErrorCode::InternalError,
            TaskError::Store(_) => ErrorCode::DatabaseError,
        }
    }
}

impl From<rusqlite::Error> for TaskError {
    fn from(err: rusqlite::Error) -> Self {
        TaskError::Store(StoreFailure::Sqlite(err))
    }
}

impl From<FormatError> for TaskError {
    fn from(err: FormatError) -> Self {
        TaskError::Store(StoreFailure::Format(err))
    }
}

impl From<refinery::Error> for TaskError {
    fn from(err: refinery::Error) -> Self {
        TaskError::Store(StoreFailure::Migration(err))
    }
}

/// Errors from registration, login and token checks.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0} must not be empty")]
    MissingField(&'static str),
    #[error("user {0} already exists")]
    UserExists(String),
    #[error("Log in failed. Wrong credentials")]
    InvalidCredentials,
    #[error("{0}")]
    Unauthorized(&'static str),
    #[error("password hashing failed: {0}")]
    Hashing(String),
    #[error(transparent)]
    Store(#[from] TaskError),
}

impl AuthError {
    pub fn code(&self) -> ErrorCode {
        match self {
            AuthError::MissingField(_) => ErrorCode::MissingRequiredField,
            AuthError::UserExists(_) => ErrorCode::UserExists,
            AuthError::InvalidCredentials => ErrorCode::InvalidCredentials,
            AuthError::Unauthorized(_) => ErrorCode::Unauthorized,
            AuthError::Hashing(_) => ErrorCode::InternalError,
            AuthError::Store(err) => err.code(),
        }
    }
}

impl From<rusqlite::Error> for AuthError {
    fn from(err: rusqlite::Error) -> Self {
        AuthError::Store(err.into())
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, TaskError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_follow_variants() {
        assert_eq!(TaskError::NotFound(1).code(), ErrorCode::TaskNotFound);
        assert_eq!(
            TaskError::from(ReferenceError::MissingTask).code(),
            ErrorCode::MissingReference
        );
        assert_eq!(
            TaskError::from(ReferenceError::DependencyBlocksDelete(2)).code(),
            ErrorCode::DependencyBlocksDelete
        );
        assert_eq!(
            TaskError::from(ValidationError::missing_field("title")).code(),
            ErrorCode::MissingRequiredField
        );
        assert_eq!(
            TaskError::from(FormatError("no braces".into())).code(),
            ErrorCode::MalformedAggregate
        );
        assert_eq!(
            TaskError::from(rusqlite::Error::InvalidQuery).code(),
            ErrorCode::DatabaseError
        );
    }

    #[test]
    fn test_code_serialization() {
        let json = serde_json::to_string(&ErrorCode::DependencyBlocksDelete).unwrap();
        assert_eq!(json, "\"DEPENDENCY_BLOCKS_DELETE\"");
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            ReferenceError::DependencyBlocksDelete(7).to_string(),
            "task 7 is a dependency of another task and must not be deleted"
        );
        assert_eq!(TaskError::NotFound(3).to_string(), "task 3 not found");
        assert_eq!(
            ValidationError::missing_field("title").to_string(),
            "title must not be empty"
        );
    }
}
