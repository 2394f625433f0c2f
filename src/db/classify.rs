//! Translation of SQLite failures into task errors.
//!
//! Classification is keyed on the statement that failed and SQLite's
//! extended result code, never on message text. Anything without an entry in
//! [`CLASSIFICATIONS`] is an opaque store failure.

use crate::error::{ReferenceError, TaskError};
use crate::types::TaskId;
use rusqlite::ffi;
use tracing::error;

/// The kind of statement whose failure is being classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Statement {
    InsertTask,
    SelectTask,
    UpdateTask,
    DeleteTask,
    InsertEdges,
    DeleteEdges,
}

/// Domain meaning of a classified failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Class {
    MissingReference,
    DependencyBlocksDelete,
}

/// (statement, extended result code) -> domain class.
const CLASSIFICATIONS: &[(Statement, i32, Class)] = &[
    (
        Statement::InsertEdges,
        ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
        Class::MissingReference,
    ),
    (
        Statement::DeleteTask,
        ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
        Class::DependencyBlocksDelete,
    ),
];

fn lookup(statement: Statement, extended_code: i32) -> Option<Class> {
    CLASSIFICATIONS
        .iter()
        .find(|(s, code, _)| *s == statement && *code == extended_code)
        .map(|(_, _, class)| *class)
}

/// Classify a failure of `statement` run against task `task_id`.
pub fn classify(statement: Statement, task_id: TaskId, err: rusqlite::Error) -> TaskError {
    match &err {
        rusqlite::Error::QueryReturnedNoRows => return TaskError::NotFound(task_id),
        rusqlite::Error::SqliteFailure(failure, _) => {
            match lookup(statement, failure.extended_code) {
                Some(Class::MissingReference) => {
                    return ReferenceError::MissingTask.into();
                }
                Some(Class::DependencyBlocksDelete) => {
                    return ReferenceError::DependencyBlocksDelete(task_id).into();
                }
                None => {}
            }
        }
        _ => {}
    }

    error!(?statement, task_id, error = %err, "Unclassified database failure");
    TaskError::from(err)
}

/// Extension for attaching classification to a rusqlite result.
pub trait ClassifyExt<T> {
    fn classify(self, statement: Statement, task_id: TaskId) -> Result<T, TaskError>;
}

impl<T> ClassifyExt<T> for rusqlite::Result<T> {
    fn classify(self, statement: Statement, task_id: TaskId) -> Result<T, TaskError> {
        self.map_err(|err| classify(statement, task_id, err))
    }
}
