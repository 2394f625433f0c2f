//! Task endpoints.

use super::auth::Caller;
use super::error::ApiError;
use super::{AppState, blocking, json_body};
use crate::error::{ErrorCode, TaskError, ValidationError};
use crate::types::{CreateTask, PatchField, Task, TaskId, TaskPatch};
use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
};
use serde_json::{Map, Value, json};

/// Parse the `{task_id}` path segment. Unparsable ids are reported as not found.
fn parse_task_id(raw: &str) -> Result<TaskId, ApiError> {
    raw.parse().map_err(|_| {
        ApiError::new(
            StatusCode::NOT_FOUND,
            ErrorCode::TaskNotFound,
            "Fail to get taskId from requested path",
        )
    })
}

pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(Caller(caller)): Extension<Caller>,
) -> Result<Json<Vec<Task>>, ApiError> {
    let scope = state.scope(caller);
    let db = state.db.clone();
    let tasks = blocking(move || db.list_tasks(&scope)).await?;
    Ok(Json(tasks))
}

pub async fn get_task(
    State(state): State<AppState>,
    Extension(Caller(caller)): Extension<Caller>,
    Path(raw_id): Path<String>,
) -> Result<Json<Task>, ApiError> {
    let task_id = parse_task_id(&raw_id)?;
    let scope = state.scope(caller);
    let db = state.db.clone();
    let task = blocking(move || db.get_task(task_id, &scope)).await?;
    Ok(Json(task))
}

pub async fn create_task(
    State(state): State<AppState>,
    Extension(Caller(caller)): Extension<Caller>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let input: CreateTask = json_body(&headers, &body)?;
    let scope = state.scope(caller);
    let db = state.db.clone();
    let id = blocking(move || db.create_task(&input, &scope)).await?;
    Ok(Json(json!({ "created": id })))
}

pub async fn patch_task(
    State(state): State<AppState>,
    Extension(Caller(caller)): Extension<Caller>,
    Path(raw_id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let task_id = parse_task_id(&raw_id)?;
    let fields: Map<String, Value> = json_body(&headers, &body)?;
    let patch = parse_patch(fields)?;
    let scope = state.scope(caller);
    let db = state.db.clone();
    blocking(move || db.update_task(task_id, &patch, &scope)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_task(
    State(state): State<AppState>,
    Extension(Caller(caller)): Extension<Caller>,
    Path(raw_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let task_id = parse_task_id(&raw_id)?;
    let scope = state.scope(caller);
    let db = state.db.clone();
    blocking(move || db.delete_task(task_id, &scope)).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn text_field(field: PatchField, value: Value) -> Result<String, ValidationError> {
    match value {
        Value::Null => Ok(String::new()),
        Value::String(s) => Ok(s),
        _ => Err(ValidationError::invalid_value(
            field.as_str(),
            format!("{} must be a string", field),
        )),
    }
}

fn id_list_field(field: PatchField, value: Value) -> Result<Vec<TaskId>, ValidationError> {
    serde_json::from_value::<Option<Vec<TaskId>>>(value)
        .map(Option::unwrap_or_default)
        .map_err(|_| {
            ValidationError::invalid_value(
                field.as_str(),
                format!("{} must be a list of task ids", field),
            )
        })
}

/// Build a patch from the keys present in a PATCH body.
///
/// A `null` text field clears it and a `null` id list removes every edge in
/// that direction. Unknown keys are ignored.
pub fn parse_patch(mut fields: Map<String, Value>) -> Result<TaskPatch, TaskError> {
    let mut patch = TaskPatch::default();
    for field in PatchField::ALL {
        let Some(value) = fields.remove(field.as_str()) else {
            continue;
        };
        match field {
            PatchField::Title => match value {
                Value::String(title) => patch.title = Some(title),
                _ => return Err(ValidationError::missing_field("title").into()),
            },
            PatchField::Description => patch.description = Some(text_field(field, value)?),
            PatchField::Location => patch.location = Some(text_field(field, value)?),
            PatchField::Date => patch.date = Some(text_field(field, value)?),
            PatchField::Time => patch.time = Some(text_field(field, value)?),
            PatchField::NextTaskIds => patch.next_task_ids = Some(id_list_field(field, value)?),
            PatchField::PreviousTaskIds => {
                patch.previous_task_ids = Some(id_list_field(field, value)?)
            }
        }
    }
    Ok(patch)
}
