//! Successor edge operations.
//!
//! These helpers run on a caller-provided connection so that the task row
//! and its edges are written inside one transaction.

use super::classify::{ClassifyExt, Statement};
use super::{Database, to_sql_id, to_task_id};
use crate::error::{ReferenceError, Result};
use crate::types::{Scope, TaskId};
use rusqlite::{Connection, OptionalExtension, params};

/// Direction of the edges being written, relative to the task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Edges the task declares: `task -> successor`.
    Outgoing,
    /// Edges that point at the task: `predecessor -> task`.
    Incoming,
}

/// Fail with [`ReferenceError::MissingTask`] unless every id in `others`
/// belongs to the scope's owner. Unrestricted scopes rely on the foreign key.
fn ensure_endpoints_in_scope(conn: &Connection, others: &[TaskId], scope: &Scope) -> Result<()> {
    let Some(owner) = scope.owner_filter() else {
        return Ok(());
    };
    let mut stmt = conn.prepare_cached("SELECT 1 FROM tasks WHERE id = ?1 AND owner = ?2")?;
    for &other in others {
        let owned = stmt
            .query_row(params![to_sql_id(other)?, owner], |_| Ok(()))
            .optional()?;
        if owned.is_none() {
            return Err(ReferenceError::MissingTask.into());
        }
    }
    Ok(())
}

/// Insert one edge per id in `others`, in order.
///
/// Duplicates collapse to one edge. A missing endpoint, or one outside the
/// caller's scope, fails the insert with a reference error.
pub(crate) fn insert_edges(
    conn: &Connection,
    task_id: TaskId,
    others: &[TaskId],
    direction: Direction,
    scope: &Scope,
) -> Result<()> {
    if others.is_empty() {
        return Ok(());
    }
    ensure_endpoints_in_scope(conn, others, scope)?;
    let sql_task_id = to_sql_id(task_id)?;
    let mut stmt = conn
        .prepare_cached(
            "INSERT OR IGNORE INTO next_task_map (task_id, next_task_id) VALUES (?1, ?2)",
        )
        .classify(Statement::InsertEdges, task_id)?;

    for &other in others {
        let other = to_sql_id(other)?;
        let (from, to) = match direction {
            Direction::Outgoing => (sql_task_id, other),
            Direction::Incoming => (other, sql_task_id),
        };
        stmt.execute(params![from, to])
            .classify(Statement::InsertEdges, task_id)?;
    }
    Ok(())
}

/// Remove the task's edges in the given direction.
///
/// Incoming edges are only removed when their source task is in scope;
/// another owner's edge into this task stays.
pub(crate) fn clear_edges(
    conn: &Connection,
    task_id: TaskId,
    direction: Direction,
    scope: &Scope,
) -> Result<usize> {
    let sql_task_id = to_sql_id(task_id)?;
    let result = match direction {
        Direction::Outgoing => conn.execute(
            "DELETE FROM next_task_map WHERE task_id = ?1",
            params![sql_task_id],
        ),
        Direction::Incoming => conn.execute(
            "DELETE FROM next_task_map WHERE next_task_id = ?1
               AND (?2 IS NULL OR task_id IN (SELECT id FROM tasks WHERE owner = ?2))",
            params![sql_task_id, scope.owner_filter()],
        ),
    };
    result.classify(Statement::DeleteEdges, task_id)
}

/// Replace the task's edges in one direction with `others`.
pub(crate) fn replace_edges(
    conn: &Connection,
    task_id: TaskId,
    others: &[TaskId],
    direction: Direction,
    scope: &Scope,
) -> Result<()> {
    clear_edges(conn, task_id, direction, scope)?;
    insert_edges(conn, task_id, others, direction, scope)
}

impl Database {
    /// Get tasks that point at a given task.
    pub fn get_predecessors(&self, task_id: TaskId) -> Result<Vec<TaskId>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT task_id FROM next_task_map WHERE next_task_id = ?1 ORDER BY rowid",
            )?;

            let ids = stmt
                .query_map(params![to_sql_id(task_id)?], |row| row.get::<_, i64>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            ids.into_iter().map(to_task_id).collect()
        })
    }

    /// Count all stored edges.
    pub fn edge_count(&self) -> Result<usize> {
        self.with_conn(|conn| {
            let count: i64 =
                conn.query_row("SELECT COUNT(*) FROM next_task_map", [], |row| row.get(0))?;
            Ok(usize::try_from(count).unwrap_or_default())
        })
    }
}
