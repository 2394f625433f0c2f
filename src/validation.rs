//! Field rules checked before a task reaches the store.

use crate::error::ValidationError;
use crate::types::CreateTask;
use chrono::DateTime;

/// Date used to check a bare time of day.
const TIME_CHECK_DATE: &str = "2022-07-27";

/// True if `date` is empty or an ISO 8601 calendar date.
pub fn validate_date(date: &str) -> bool {
    date.is_empty() || DateTime::parse_from_rfc3339(&format!("{}T00:00:00Z", date)).is_ok()
}

/// True if `time` is empty or an ISO 8601 `hh:mm` time of day.
pub fn validate_time(time: &str) -> bool {
    time.is_empty()
        || DateTime::parse_from_rfc3339(&format!("{}T{}:00Z", TIME_CHECK_DATE, time)).is_ok()
}

/// Check the required title and the date/time formats.
pub fn validate_task(title: &str, date: &str, time: &str) -> Result<(), ValidationError> {
    if title.is_empty() {
        return Err(ValidationError::missing_field("title"));
    }
    if !validate_date(date) {
        return Err(ValidationError::invalid_value(
            "date",
            "Date not a valid ISO 8601 string",
        ));
    }
    if !validate_time(time) {
        return Err(ValidationError::invalid_value(
            "time",
            "Time not a valid ISO 8601 string",
        ));
    }
    Ok(())
}

/// Boolean form of [`validate_task`].
pub fn is_valid_task(title: &str, date: &str, time: &str) -> bool {
    validate_task(title, date, time).is_ok()
}

/// Validate a create request.
pub fn validate_create_task(input: &CreateTask) -> Result<(), ValidationError> {
    validate_task(
        &input.title,
        input.date.as_deref().unwrap_or_default(),
        input.time.as_deref().unwrap_or_default(),
    )
}
