//! Operator note text.
//!
//! Notes are an append-only audit trail on the job: failure reasons,
//! completion remarks and agent delivery confirmations, one per line.

use crate::types::Timestamp;

pub const MAX_NOTE_LEN: usize = 2000;

pub fn failure_note(reason: &str) -> String {
    format!("Failed: {}", reason.trim())
}

pub fn delivery_note(filename: &str, sent_at: Timestamp) -> String {
    format!("Agent confirmed {filename} sent at {}", sent_at.to_rfc3339())
}

/// Append `note` on a new line, ignoring blank notes.
pub fn append_note(existing: Option<&str>, note: &str) -> Option<String> {
    let note = note.trim();
    match existing.filter(|e| !e.is_empty()) {
        None if note.is_empty() => None,
        None => Some(truncate(note).to_string()),
        Some(current) if note.is_empty() => Some(current.to_string()),
        Some(current) => Some(format!("{current}\n{}", truncate(note))),
    }
}

fn truncate(note: &str) -> &str {
    match note.char_indices().nth(MAX_NOTE_LEN) {
        Some((idx, _)) => &note[..idx],
        None => note,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    #[test]
    fn notes_append_one_per_line() {
        let first = append_note(None, &failure_note("jam")).unwrap();
        assert_eq!(first, "Failed: jam");
        let second = append_note(Some(&first), "cleared, retrying").unwrap();
        assert_eq!(second, "Failed: jam\ncleared, retrying");
    }

    #[test]
    fn blank_notes_are_ignored() {
        assert_eq!(append_note(None, "  "), None);
        assert_eq!(append_note(Some("kept"), ""), Some("kept".to_string()));
    }

    #[test]
    fn delivery_note_names_file_and_time() {
        let at = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(
            delivery_note("JOB-1_print.pdf", at),
            "Agent confirmed JOB-1_print.pdf sent at 2026-01-02T03:04:05+00:00"
        );
    }

    #[test]
    fn overlong_notes_are_truncated() {
        let long = "x".repeat(MAX_NOTE_LEN + 50);
        assert_eq!(append_note(None, &long).unwrap().len(), MAX_NOTE_LEN);
    }
}
