//! Marshalling between stored column values and task fields.
//!
//! Successor lists come back from the grouping query as a brace-delimited
//! list (`{1,2,3}`), with `{NULL}` standing for a task without edges. Dates
//! and times are stored as full `YYYY-MM-DDThh:mm:ssZ` timestamps and cut
//! back down to their date or time-of-day part on the way out.

use crate::error::FormatError;
use crate::types::TaskId;
use regex_lite::Regex;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ValueRef};
use std::sync::LazyLock;

/// Sentinel produced by the aggregate for a task with no edges.
pub const NULL_LIST: &[u8] = b"{NULL}";

/// Fixed date used when storing a bare time of day.
const TIME_ONLY_DATE: &str = "1970-01-01";

static STORED_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9]{4}-[0-9]{2}-[0-9]{2})T[0-9]{2}:[0-9]{2}:[0-9]{2}Z$")
        .expect("stored date pattern is valid")
});

static STORED_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}T([0-9]{2}:[0-9]{2}):[0-9]{2}Z$")
        .expect("stored time pattern is valid")
});

/// Decode an aggregated id list.
///
/// Returns `Ok(None)` for `{NULL}` and for `{}`: a list that parsed to zero
/// values is treated the same as no list at all.
pub fn decode_id_list(raw: &[u8]) -> Result<Option<Vec<TaskId>>, FormatError> {
    if raw == NULL_LIST {
        return Ok(None);
    }
    let inner = raw
        .strip_prefix(b"{")
        .and_then(|rest| rest.strip_suffix(b"}"))
        .ok_or_else(|| {
            FormatError(format!(
                "id list must be enclosed in braces: {:?}",
                String::from_utf8_lossy(raw)
            ))
        })?;
    if inner.is_empty() {
        return Ok(None);
    }

    let mut ids = Vec::new();
    let mut current: Option<TaskId> = None;
    for &byte in inner {
        match byte {
            b'0'..=b'9' => {
                let digit = TaskId::from(byte - b'0');
                let value = current
                    .unwrap_or(0)
                    .checked_mul(10)
                    .and_then(|v| v.checked_add(digit))
                    .ok_or_else(|| FormatError("id out of range".to_string()))?;
                current = Some(value);
            }
            b',' => {
                let value = current
                    .take()
                    .ok_or_else(|| FormatError("empty entry in id list".to_string()))?;
                ids.push(value);
            }
            other => {
                return Err(FormatError(format!(
                    "unexpected byte {:?} in id list",
                    char::from(other)
                )));
            }
        }
    }
    let last = current.ok_or_else(|| FormatError("empty entry in id list".to_string()))?;
    ids.push(last);

    Ok(Some(ids))
}

/// Render ids in the aggregate encoding.
pub fn encode_id_list(ids: &[TaskId]) -> String {
    if ids.is_empty() {
        return String::from_utf8_lossy(NULL_LIST).into_owned();
    }
    let joined = ids
        .iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",");
    format!("{{{}}}", joined)
}

/// Column wrapper that decodes the aggregate straight out of a row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdList(pub Option<Vec<TaskId>>);

impl IdList {
    /// The ids, or an empty list when absent.
    pub fn into_vec(self) -> Vec<TaskId> {
        self.0.unwrap_or_default()
    }
}

impl FromSql for IdList {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Null => Ok(IdList(None)),
            ValueRef::Text(bytes) | ValueRef::Blob(bytes) => decode_id_list(bytes)
                .map(IdList)
                .map_err(|err| FromSqlError::Other(Box::new(err))),
            ValueRef::Integer(_) | ValueRef::Real(_) => Err(FromSqlError::Other(Box::new(
                FormatError("id list is not a byte payload".to_string()),
            ))),
        }
    }
}

/// Canonical stored form of a `YYYY-MM-DD` date.
pub fn stored_date(date: &str) -> String {
    format!("{}T00:00:00Z", date)
}

/// Canonical stored form of an `hh:mm` time of day.
pub fn stored_time(time: &str) -> String {
    format!("{}T{}:00Z", TIME_ONLY_DATE, time)
}

/// Cut a stored timestamp down to its date. Values that are not a stored
/// timestamp pass through unchanged.
pub fn date_from_stored(stored: &str) -> String {
    STORED_DATE.replace(stored, "$1").into_owned()
}

/// Cut a stored timestamp down to its `hh:mm` time of day.
pub fn time_from_stored(stored: &str) -> String {
    STORED_TIME.replace(stored, "$1").into_owned()
}

/// Map an optional input value to what goes into the column: empty means NULL.
pub fn optional_text(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_keeps_stored_order() {
        assert_eq!(decode_id_list(b"{3,1,2}").unwrap(), Some(vec![3, 1, 2]));
        assert_eq!(decode_id_list(b"{42}").unwrap(), Some(vec![42]));
    }

    #[test]
    fn test_decode_null_and_empty_are_absent() {
        assert_eq!(decode_id_list(b"{NULL}").unwrap(), None);
        assert_eq!(decode_id_list(b"{}").unwrap(), None);
    }

    #[test]
    fn test_decode_rejects_missing_braces() {
        assert!(decode_id_list(b"1,2,3").is_err());
        assert!(decode_id_list(b"{1,2").is_err());
        assert!(decode_id_list(b"1,2}").is_err());
        assert!(decode_id_list(b"").is_err());
    }

    #[test]
    fn test_decode_rejects_garbage_inside_braces() {
        assert!(decode_id_list(b"{1,,2}").is_err());
        assert!(decode_id_list(b"{1,2,}").is_err());
        assert!(decode_id_list(b"{-1}").is_err());
        assert!(decode_id_list(b"{1, 2}").is_err());
        assert!(decode_id_list(b"{99999999999999999999999}").is_err());
    }

    #[test]
    fn test_encode() {
        assert_eq!(encode_id_list(&[3, 1, 2]), "{3,1,2}");
        assert_eq!(encode_id_list(&[]), "{NULL}");
    }

    #[test]
    fn test_stored_date_and_time() {
        assert_eq!(stored_date("2023-05-06"), "2023-05-06T00:00:00Z");
        assert_eq!(stored_time("18:00"), "1970-01-01T18:00:00Z");
        assert_eq!(date_from_stored("2023-05-06T00:00:00Z"), "2023-05-06");
        assert_eq!(time_from_stored("1970-01-01T18:00:00Z"), "18:00");
    }

    #[test]
    fn test_unrecognised_stored_values_pass_through() {
        assert_eq!(date_from_stored("2023-05-06"), "2023-05-06");
        assert_eq!(time_from_stored("18:00"), "18:00");
    }

    #[test]
    fn test_optional_text() {
        assert_eq!(optional_text(Some("")), None);
        assert_eq!(optional_text(Some("x")), Some("x"));
        assert_eq!(optional_text(None), None);
    }
}
