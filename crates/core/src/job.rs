//! Field rules for jobs and their slots.

use crate::error::CoreError;

pub const MAX_COPIES: i32 = 500;
pub const MAX_PRIORITY: i32 = 100;
pub const MAX_TEXT_LEN: usize = 200;

pub fn validate_copies(copies: i32) -> Result<(), CoreError> {
    if !(1..=MAX_COPIES).contains(&copies) {
        return Err(CoreError::Validation(format!(
            "Copies must be between 1 and {MAX_COPIES}"
        )));
    }
    Ok(())
}

pub fn validate_priority(priority: i32) -> Result<(), CoreError> {
    if !(-MAX_PRIORITY..=MAX_PRIORITY).contains(&priority) {
        return Err(CoreError::Validation(format!(
            "Priority must be between -{MAX_PRIORITY} and {MAX_PRIORITY}"
        )));
    }
    Ok(())
}

/// Optional short text fields (job name, event name, recipient, …).
pub fn validate_text(field: &str, value: Option<&str>) -> Result<(), CoreError> {
    match value {
        Some(v) if v.chars().count() > MAX_TEXT_LEN => Err(CoreError::Validation(format!(
            "{field} must be at most {MAX_TEXT_LEN} characters"
        ))),
        _ => Ok(()),
    }
}

/// A job may only leave the editing phase with at least one slot, and
/// every slot must have label artwork.
pub fn validate_submission(slot_count: usize, slots_missing_asset: &[String]) -> Result<(), CoreError> {
    if slot_count == 0 {
        return Err(CoreError::Validation(
            "Job must have at least one slot before submission".to_string(),
        ));
    }
    if !slots_missing_asset.is_empty() {
        return Err(CoreError::Validation(format!(
            "Slots missing label artwork: {}",
            slots_missing_asset.join(", ")
        )));
    }
    Ok(())
}
