//! Task CRUD operations.

use super::classify::{ClassifyExt, Statement};
use super::edges::{Direction, insert_edges, replace_edges};
use super::{Database, to_sql_id, to_task_id};
use crate::codec::{
    IdList, date_from_stored, optional_text, stored_date, stored_time, time_from_stored,
};
use crate::error::{FormatError, Result, TaskError, ValidationError};
use crate::types::{CreateTask, Scope, Task, TaskId, TaskPatch};
use crate::validation::{validate_create_task, validate_date, validate_time};
use rusqlite::types::Value;
use rusqlite::{Connection, Row, params, params_from_iter};
use tracing::{debug, info, warn};

/// Tasks joined with their outgoing edges, one row per task. Successor ids
/// are aggregated in insertion order into the `{...}` list encoding.
const SELECT_TASKS: &str = "SELECT t.id, t.title, t.description, t.location,
        t.start_date, t.start_time,
        '{' || COALESCE(group_concat(m.next_task_id ORDER BY m.rowid), 'NULL') || '}'
     FROM tasks t
     LEFT JOIN next_task_map m ON m.task_id = t.id";

pub fn parse_task_row(row: &Row) -> rusqlite::Result<Task> {
    let id: i64 = row.get(0)?;
    let title: String = row.get(1)?;
    let description: Option<String> = row.get(2)?;
    let location: Option<String> = row.get(3)?;
    let date: Option<String> = row.get(4)?;
    let time: Option<String> = row.get(5)?;
    let next_task_ids: IdList = row.get(6)?;

    Ok(Task {
        id: u64::try_from(id).map_err(|_| rusqlite::Error::IntegralValueOutOfRange(0, id))?,
        title,
        description,
        location,
        date: date.as_deref().map(date_from_stored),
        time: time.as_deref().map(time_from_stored),
        next_task_ids: next_task_ids.into_vec(),
    })
}

/// Surface a malformed aggregate as a format error rather than a generic
/// conversion failure.
fn row_error(err: rusqlite::Error) -> TaskError {
    if let rusqlite::Error::FromSqlConversionFailure(_, _, source) = &err {
        if let Some(format) = source.downcast_ref::<FormatError>() {
            return format.clone().into();
        }
    }
    err.into()
}

fn query_tasks(conn: &Connection, sql: &str, params: impl rusqlite::Params) -> Result<Vec<Task>> {
    let mut stmt = conn.prepare(sql)?;
    let tasks = stmt
        .query_map(params, parse_task_row)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(row_error)?;
    Ok(tasks)
}

/// Check the task exists and is visible to the caller.
fn ensure_task_exists(conn: &Connection, task_id: TaskId, scope: &Scope) -> Result<()> {
    conn.query_row(
        "SELECT id FROM tasks WHERE id = ?1 AND (?2 IS NULL OR owner = ?2)",
        params![to_sql_id(task_id)?, scope.owner_filter()],
        |_| Ok(()),
    )
    .classify(Statement::SelectTask, task_id)
}

fn validate_patch(patch: &TaskPatch) -> std::result::Result<(), ValidationError> {
    if patch.title.as_deref().is_some_and(str::is_empty) {
        return Err(ValidationError::missing_field("title"));
    }
    if !patch.date.as_deref().is_none_or(validate_date) {
        return Err(ValidationError::invalid_value(
            "date",
            "Date not a valid ISO 8601 string",
        ));
    }
    if !patch.time.as_deref().is_none_or(validate_time) {
        return Err(ValidationError::invalid_value(
            "time",
            "Time not a valid ISO 8601 string",
        ));
    }
    Ok(())
}

fn text_value(value: Option<&str>) -> Value {
    optional_text(value).map_or(Value::Null, |v| Value::Text(v.to_string()))
}

/// Column assignments for the scalar part of a patch.
fn scalar_assignments(patch: &TaskPatch) -> Vec<(&'static str, Value)> {
    let mut assignments = Vec::new();
    if let Some(title) = &patch.title {
        assignments.push(("title", Value::Text(title.clone())));
    }
    if let Some(description) = &patch.description {
        assignments.push(("description", text_value(Some(description.as_str()))));
    }
    if let Some(location) = &patch.location {
        assignments.push(("location", text_value(Some(location.as_str()))));
    }
    if let Some(date) = &patch.date {
        let stored = optional_text(Some(date.as_str())).map(stored_date);
        assignments.push(("start_date", stored.map_or(Value::Null, Value::Text)));
    }
    if let Some(time) = &patch.time {
        let stored = optional_text(Some(time.as_str())).map(stored_time);
        assignments.push(("start_time", stored.map_or(Value::Null, Value::Text)));
    }
    assignments
}

impl Database {
    /// List all tasks visible in `scope`, ordered by id.
    pub fn list_tasks(&self, scope: &Scope) -> Result<Vec<Task>> {
        let sql = format!(
            "{} WHERE ?1 IS NULL OR t.owner = ?1 GROUP BY t.id ORDER BY t.id",
            SELECT_TASKS
        );
        self.with_conn(|conn| query_tasks(conn, &sql, params![scope.owner_filter()]))
    }

    /// Get a task by ID.
    pub fn get_task(&self, task_id: TaskId, scope: &Scope) -> Result<Task> {
        let sql = format!(
            "{} WHERE t.id = ?1 AND (?2 IS NULL OR t.owner = ?2) GROUP BY t.id ORDER BY t.id",
            SELECT_TASKS
        );
        let sql_id = to_sql_id(task_id)?;
        let mut tasks =
            self.with_conn(|conn| query_tasks(conn, &sql, params![sql_id, scope.owner_filter()]))?;

        match tasks.len() {
            0 => Err(TaskError::NotFound(task_id)),
            1 => Ok(tasks.remove(0)),
            n => Err(TaskError::internal(format!(
                "expected one row for task {}, got {}",
                task_id, n
            ))),
        }
    }

    /// Create a task together with its predecessor and successor edges.
    ///
    /// The task row and all edges are written in one transaction, so a
    /// missing referenced task leaves nothing behind.
    pub fn create_task(&self, input: &CreateTask, scope: &Scope) -> Result<TaskId> {
        validate_create_task(input)?;

        let task_id = self.with_conn_mut(|conn| -> Result<TaskId> {
            let tx = conn.transaction()?;

            let rowid: i64 = tx.query_row(
                "INSERT INTO tasks (title, description, location, start_date, start_time, owner)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 RETURNING id",
                params![
                    &input.title,
                    optional_text(input.description.as_deref()),
                    optional_text(input.location.as_deref()),
                    optional_text(input.date.as_deref()).map(stored_date),
                    optional_text(input.time.as_deref()).map(stored_time),
                    &scope.caller,
                ],
                |row| row.get(0),
            )?;
            let task_id = to_task_id(rowid)?;

            let previous = &input.previous_task_ids;
            let next = &input.next_task_ids;
            let edges = insert_edges(&tx, task_id, previous, Direction::Incoming, scope)
                .and_then(|()| insert_edges(&tx, task_id, next, Direction::Outgoing, scope));
            if let Err(err) = edges {
                warn!(task_id, error = %err, "Edge insert failed, rolling back task creation");
                return Err(err);
            }

            tx.commit()?;
            Ok(task_id)
        })?;

        info!(
            task_id,
            successors = input.next_task_ids.len(),
            predecessors = input.previous_task_ids.len(),
            "Created task"
        );
        Ok(task_id)
    }

    /// Apply a partial update.
    ///
    /// Scalar fields are written first, then the successor edges, then the
    /// predecessor edges. A changed edge list replaces all existing edges in
    /// that direction. The whole update commits or rolls back as one unit.
    pub fn update_task(&self, task_id: TaskId, patch: &TaskPatch, scope: &Scope) -> Result<()> {
        validate_patch(patch)?;

        self.with_conn_mut(|conn| -> Result<()> {
            let tx = conn.transaction()?;
            ensure_task_exists(&tx, task_id, scope)?;

            let assignments = scalar_assignments(patch);
            if !assignments.is_empty() {
                let columns = assignments
                    .iter()
                    .enumerate()
                    .map(|(i, (column, _))| format!("{} = ?{}", column, i + 1))
                    .collect::<Vec<_>>()
                    .join(", ");
                let sql = format!(
                    "UPDATE tasks SET {} WHERE id = ?{}",
                    columns,
                    assignments.len() + 1
                );
                let values = assignments
                    .into_iter()
                    .map(|(_, value)| value)
                    .chain(std::iter::once(Value::Integer(to_sql_id(task_id)?)))
                    .collect::<Vec<_>>();

                let affected = tx
                    .execute(&sql, params_from_iter(values))
                    .classify(Statement::UpdateTask, task_id)?;
                match affected {
                    0 => return Err(TaskError::NotFound(task_id)),
                    1 => {}
                    n => {
                        return Err(TaskError::internal(format!(
                            "update of task {} touched {} rows",
                            task_id, n
                        )));
                    }
                }
            }

            if let Some(next) = &patch.next_task_ids {
                replace_edges(&tx, task_id, next, Direction::Outgoing, scope)?;
            }
            if let Some(previous) = &patch.previous_task_ids {
                replace_edges(&tx, task_id, previous, Direction::Incoming, scope)?;
            }

            tx.commit()?;
            Ok(())
        })?;

        debug!(task_id, fields = ?patch.changed_fields(), "Updated task");
        Ok(())
    }

    /// Delete a task.
    ///
    /// Edges the task declared go with it. A task that is still the
    /// successor of another task cannot be deleted until that edge is removed.
    pub fn delete_task(&self, task_id: TaskId, scope: &Scope) -> Result<()> {
        let affected = self.with_conn(|conn| {
            conn.execute(
                "DELETE FROM tasks WHERE id = ?1 AND (?2 IS NULL OR owner = ?2)",
                params![to_sql_id(task_id)?, scope.owner_filter()],
            )
            .classify(Statement::DeleteTask, task_id)
        })?;

        if affected == 0 {
            return Err(TaskError::NotFound(task_id));
        }
        info!(task_id, "Deleted task");
        Ok(())
    }

    /// Check whether a task exists, ignoring scope.
    pub fn task_exists(&self, task_id: TaskId) -> Result<bool> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM tasks WHERE id = ?1",
                params![to_sql_id(task_id)?],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
    }
}
