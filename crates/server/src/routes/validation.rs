//! Request body checks shared by the handlers. Every failure is a 400.

use utils::uid::{is_valid_public_id, is_valid_slug};

use crate::error::ApiError;

pub fn require_length(field: &str, value: &str, min: usize, max: usize) -> Result<(), ApiError> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(ApiError::BadRequest(format!(
            "{field} must be between {min} and {max} characters"
        )));
    }
    Ok(())
}

pub fn require_slug(field: &str, value: &str, min: usize, max: usize) -> Result<(), ApiError> {
    if !is_valid_slug(value, min, max) {
        return Err(ApiError::BadRequest(format!(
            "{field} must be {min}-{max} letters, digits or dashes"
        )));
    }
    Ok(())
}

pub fn require_public_id(field: &str, value: &str) -> Result<(), ApiError> {
    if !is_valid_public_id(value) {
        return Err(ApiError::BadRequest(format!("Invalid {field}")));
    }
    Ok(())
}

/// Splits a comma separated query value into public ids, ignoring blanks.
pub fn public_id_list(field: &str, raw: Option<&str>) -> Result<Vec<String>, ApiError> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(|id| {
            require_public_id(field, id)?;
            Ok(id.to_string())
        })
        .collect()
}
