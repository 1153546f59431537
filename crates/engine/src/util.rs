//! Internal helpers for defaulting and validation.
//!
//! These utilities are **not** part of the public API.

use chrono::{DateTime, Datelike, Utc};

use crate::{EngineError, ResultEngine};

/// `YYYYMM` of a date, e.g. `202301` for any day of January 2023.
pub(crate) fn accrual_month_of(date: DateTime<Utc>) -> String {
    format!("{:04}{:02}", date.year(), date.month())
}

/// Six ASCII digits whose last two form a month in `01..=12`.
pub(crate) fn is_accrual_month(value: &str) -> bool {
    if value.len() != 6 || !value.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    matches!(value[4..].parse::<u8>(), Ok(1..=12))
}

pub(crate) fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

pub(crate) fn normalize_required_name(value: &str, label: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::InvalidArgument(format!(
            "{label} name must not be empty"
        )));
    }
    Ok(trimmed.to_string())
}

/// Acting user id, trimmed; blank ids are rejected.
pub(crate) fn require_user(user_id: &str) -> ResultEngine<&str> {
    let trimmed = user_id.trim();
    if trimmed.is_empty() {
        return Err(EngineError::Forbidden("user id is required".to_string()));
    }
    Ok(trimmed)
}
