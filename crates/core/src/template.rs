//! Template (jig layout) rules.
//!
//! A template is editable until published; afterwards its slots and base
//! artwork are frozen so composed jobs keep matching their jig.

use crate::error::CoreError;
use crate::types::Timestamp;

/// Maximum length of a hot-folder type key.
pub const MAX_HOT_FOLDER_TYPE_LEN: usize = 50;

/// Maximum number of slots on one jig.
pub const MAX_SLOTS: usize = 200;

/// Reject edits to a published template.
pub fn ensure_unpublished(published_at: Option<Timestamp>) -> Result<(), CoreError> {
    match published_at {
        None => Ok(()),
        Some(at) => Err(CoreError::Conflict(format!(
            "Template was published at {} and can no longer be modified",
            at.to_rfc3339()
        ))),
    }
}

/// Hot-folder type keys route finished jobs to a printer's delivery path.
/// Lowercase ASCII letters, digits, `_` and `-` only.
pub fn validate_hot_folder_type(key: &str) -> Result<(), CoreError> {
    if key.is_empty() || key.len() > MAX_HOT_FOLDER_TYPE_LEN {
        return Err(CoreError::Validation(format!(
            "Hot folder type must be 1-{MAX_HOT_FOLDER_TYPE_LEN} characters"
        )));
    }
    if !key
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
    {
        return Err(CoreError::Validation(format!(
            "Hot folder type '{key}' may only contain lowercase letters, digits, '_' and '-'"
        )));
    }
    Ok(())
}

pub fn validate_rotation(degrees: f64) -> Result<(), CoreError> {
    if !degrees.is_finite() || !(-360.0..=360.0).contains(&degrees) {
        return Err(CoreError::Validation(
            "Rotation must be between -360 and 360 degrees".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_slot_count(count: usize) -> Result<(), CoreError> {
    if count > MAX_SLOTS {
        return Err(CoreError::Validation(format!(
            "A template may define at most {MAX_SLOTS} slots"
        )));
    }
    Ok(())
}

/// Reject duplicate slot keys within one template.
pub fn validate_unique_slot_keys<'a>(
    keys: impl IntoIterator<Item = &'a str>,
) -> Result<(), CoreError> {
    let mut seen = std::collections::HashSet::new();
    for key in keys {
        if key.trim().is_empty() {
            return Err(CoreError::Validation("Slot key must not be empty".to_string()));
        }
        if !seen.insert(key) {
            return Err(CoreError::Validation(format!("Duplicate slot key '{key}'")));
        }
    }
    Ok(())
}

/// Default slot key for the slot at `index` (0-based): `slot_1`, `slot_2`, …
pub fn default_slot_key(index: usize) -> String {
    format!("slot_{}", index + 1)
}

/// Position letter for the slot at `index` (0-based): `A` … `Z`, `AA`, `AB`, …
pub fn slot_letter(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::Utc;

    use super::*;

    #[test]
    fn published_templates_are_frozen() {
        assert!(ensure_unpublished(None).is_ok());
        assert_matches!(ensure_unpublished(Some(Utc::now())), Err(CoreError::Conflict(_)));
    }

    #[test]
    fn hot_folder_type_charset() {
        assert!(validate_hot_folder_type("candle_tray-2").is_ok());
        assert!(validate_hot_folder_type("").is_err());
        assert!(validate_hot_folder_type("Candles").is_err());
        assert!(validate_hot_folder_type("a/b").is_err());
        assert!(validate_hot_folder_type(&"x".repeat(51)).is_err());
    }

    #[test]
    fn rotation_bounds() {
        assert!(validate_rotation(0.0).is_ok());
        assert!(validate_rotation(-90.0).is_ok());
        assert!(validate_rotation(361.0).is_err());
        assert!(validate_rotation(f64::INFINITY).is_err());
    }

    #[test]
    fn slot_keys_must_be_unique_and_non_empty() {
        assert!(validate_unique_slot_keys(["a", "b"]).is_ok());
        assert!(validate_unique_slot_keys(["a", "a"]).is_err());
        assert!(validate_unique_slot_keys(["a", " "]).is_err());
    }

    #[test]
    fn slot_letters_follow_spreadsheet_columns() {
        assert_eq!(slot_letter(0), "A");
        assert_eq!(slot_letter(3), "D");
        assert_eq!(slot_letter(25), "Z");
        assert_eq!(slot_letter(26), "AA");
        assert_eq!(slot_letter(27), "AB");
    }

    #[test]
    fn default_keys_are_one_based() {
        assert_eq!(default_slot_key(0), "slot_1");
        assert_eq!(default_slot_key(9), "slot_10");
    }

    #[test]
    fn slot_count_limit() {
        assert!(validate_slot_count(MAX_SLOTS).is_ok());
        assert!(validate_slot_count(MAX_SLOTS + 1).is_err());
    }
}
