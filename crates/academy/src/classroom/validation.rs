//! Input rules shared by every classroom operation.
//!
//! Each rule returns the normalized value (trimmed text, empty descriptions collapsed to `None`)
//! or a [`ValidationError`] naming the offending field.

pub const MAX_NAME_CHARS: usize = 100;
pub const MAX_DESCRIPTION_CHARS: usize = 500;
pub const MIN_CAPACITY: u32 = 1;
pub const MAX_CAPACITY: u32 = 1000;
pub const MAX_SESSION_TIME_CHARS: usize = 50;

/// Validation error with the field that failed and the violated constraint.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {constraint}")]
pub struct ValidationError {
    pub field: &'static str,
    pub constraint: String,
}

impl ValidationError {
    pub fn new(field: &'static str, constraint: impl Into<String>) -> Self {
        Self {
            field,
            constraint: constraint.into(),
        }
    }
}

pub fn validate_name(name: &str) -> Result<String, ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::new("name", "must not be empty"));
    }
    let length = trimmed.chars().count();
    if length > MAX_NAME_CHARS {
        return Err(ValidationError::new(
            "name",
            format!("must be at most {MAX_NAME_CHARS} characters (found {length})"),
        ));
    }
    Ok(trimmed.to_string())
}

pub fn validate_description(
    description: Option<&str>,
) -> Result<Option<String>, ValidationError> {
    let Some(trimmed) = description.map(str::trim).filter(|value| !value.is_empty()) else {
        return Ok(None);
    };
    let length = trimmed.chars().count();
    if length > MAX_DESCRIPTION_CHARS {
        return Err(ValidationError::new(
            "description",
            format!("must be at most {MAX_DESCRIPTION_CHARS} characters (found {length})"),
        ));
    }
    Ok(Some(trimmed.to_string()))
}

pub fn validate_capacity(capacity: Option<u32>) -> Result<Option<u32>, ValidationError> {
    match capacity {
        Some(value) if !(MIN_CAPACITY..=MAX_CAPACITY).contains(&value) => {
            Err(ValidationError::new(
                "capacity",
                format!("must be between {MIN_CAPACITY} and {MAX_CAPACITY} (found {value})"),
            ))
        }
        other => Ok(other),
    }
}

pub fn validate_session_time(label: &str) -> Result<String, ValidationError> {
    let trimmed = label.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::new("session_time", "must not be empty"));
    }
    if trimmed.chars().count() > MAX_SESSION_TIME_CHARS {
        return Err(ValidationError::new(
            "session_time",
            format!("must be at most {MAX_SESSION_TIME_CHARS} characters"),
        ));
    }
    Ok(trimmed.to_string())
}

/// Opaque identifiers coming from directories must at least be non-blank.
pub fn validate_identifier(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new(field, "must not be empty"));
    }
    Ok(())
}
