//! Core types for the task list service.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Store-assigned task identifier.
pub type TaskId = u64;

/// A task in the task graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Calendar date, `YYYY-MM-DD`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// Time of day, `hh:mm`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    /// Successors, in the order the edges were stored.
    #[serde(default)]
    pub next_task_ids: Vec<TaskId>,
}

/// Input for creating a task.
///
/// `previous_task_ids` names tasks that should point at the new task. It is
/// only used to create edges and is never stored on the task itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTask {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub next_task_ids: Vec<TaskId>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub previous_task_ids: Vec<TaskId>,
}

impl CreateTask {
    /// Create input with just a title.
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

/// Name of a patchable task field, as used on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatchField {
    Title,
    Description,
    Location,
    Date,
    Time,
    NextTaskIds,
    PreviousTaskIds,
}

impl PatchField {
    pub const ALL: [PatchField; 7] = [
        PatchField::Title,
        PatchField::Description,
        PatchField::Location,
        PatchField::Date,
        PatchField::Time,
        PatchField::NextTaskIds,
        PatchField::PreviousTaskIds,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PatchField::Title => "title",
            PatchField::Description => "description",
            PatchField::Location => "location",
            PatchField::Date => "date",
            PatchField::Time => "time",
            PatchField::NextTaskIds => "nextTaskIds",
            PatchField::PreviousTaskIds => "previousTaskIds",
        }
    }

    /// Scalar fields live on the task row; the others are edge sets.
    pub fn is_scalar(&self) -> bool {
        !matches!(self, PatchField::NextTaskIds | PatchField::PreviousTaskIds)
    }
}

impl fmt::Display for PatchField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PatchField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PatchField::ALL
            .into_iter()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| format!("Unknown task field: {}", s))
    }
}

/// Partial update of a task.
///
/// A field set to `Some` is changed, `None` leaves the stored value alone.
/// For the optional text fields an empty string clears the value, so
/// `Some(String::new())` and `None` mean different things.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub next_task_ids: Option<Vec<TaskId>>,
    pub previous_task_ids: Option<Vec<TaskId>>,
}

impl TaskPatch {
    /// Build a patch from a full set of values and the list of fields that
    /// actually changed. Values for fields not in `changed` are ignored.
    pub fn from_changed(values: CreateTask, changed: &[PatchField]) -> Self {
        let pick = |field: PatchField| changed.contains(&field);
        Self {
            title: pick(PatchField::Title).then_some(values.title),
            description: pick(PatchField::Description)
                .then(|| values.description.unwrap_or_default()),
            location: pick(PatchField::Location).then(|| values.location.unwrap_or_default()),
            date: pick(PatchField::Date).then(|| values.date.unwrap_or_default()),
            time: pick(PatchField::Time).then(|| values.time.unwrap_or_default()),
            next_task_ids: pick(PatchField::NextTaskIds).then_some(values.next_task_ids),
            previous_task_ids: pick(PatchField::PreviousTaskIds)
                .then_some(values.previous_task_ids),
        }
    }

    /// Fields present in this patch, in wire order.
    pub fn changed_fields(&self) -> Vec<PatchField> {
        PatchField::ALL
            .into_iter()
            .filter(|field| self.is_changed(*field))
            .collect()
    }

    pub fn is_changed(&self, field: PatchField) -> bool {
        match field {
            PatchField::Title => self.title.is_some(),
            PatchField::Description => self.description.is_some(),
            PatchField::Location => self.location.is_some(),
            PatchField::Date => self.date.is_some(),
            PatchField::Time => self.time.is_some(),
            PatchField::NextTaskIds => self.next_task_ids.is_some(),
            PatchField::PreviousTaskIds => self.previous_task_ids.is_some(),
        }
    }

    pub fn has_scalar_changes(&self) -> bool {
        self.changed_fields().iter().any(PatchField::is_scalar)
    }

    pub fn is_empty(&self) -> bool {
        self.changed_fields().is_empty()
    }
}

/// Which tasks a caller can see and modify.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopePolicy {
    /// Every caller sees every task.
    #[default]
    Global,
    /// Callers only see tasks they created.
    Owner,
}

/// Caller identity plus the policy that decides whether it filters tasks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scope {
    pub caller: String,
    pub policy: ScopePolicy,
}

impl Scope {
    /// Unrestricted scope.
    pub fn global() -> Self {
        Self::default()
    }

    pub fn new(caller: impl Into<String>, policy: ScopePolicy) -> Self {
        Self {
            caller: caller.into(),
            policy,
        }
    }

    /// Owner filter to apply to queries, if any.
    pub fn owner_filter(&self) -> Option<&str> {
        match self.policy {
            ScopePolicy::Global => None,
            ScopePolicy::Owner => Some(self.caller.as_str()),
        }
    }
}

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub username: String,
    pub fullname: String,
    pub email: String,
    pub password_hash: Vec<u8>,
    pub salt: Vec<u8>,
}

/// Treat an explicit JSON `null` the same as a missing list.
fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<TaskId>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<TaskId>>::deserialize(deserializer)?.unwrap_or_default())
}
