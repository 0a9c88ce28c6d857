//! Filesystem conventions shared by the authority and the printer agent.
//!
//! ```text
//! <queue_dir>/
//!   job_42/
//!     JOB-42_Smith Wedding.pdf   downloaded artifact
//!     job.json                   job summary as received
//!     .sent_to_hotfolder         delivery marker (written once)
//! ```

use chrono::{DateTime, Utc};

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

/// Marker written inside a job directory after the artifact was copied
/// into the hot folder.
pub const SENT_MARKER: &str = ".sent_to_hotfolder";

/// Job summary persisted next to the downloaded artifact.
pub const METADATA_FILE: &str = "job.json";

/// Event segment used when a job has no event name.
pub const DEFAULT_EVENT_SEGMENT: &str = "print";

const JOB_DIR_PREFIX: &str = "job_";

/// File name dropped into the hot folder: `JOB-{id}_{event or "print"}.pdf`.
///
/// Path separators, control characters and double quotes in the event name
/// are replaced, so the name can neither escape the destination directory
/// nor break a `Content-Disposition` header.
pub fn delivered_filename(job_id: DbId, event_name: Option<&str>) -> String {
    let event = event_name
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .unwrap_or(DEFAULT_EVENT_SEGMENT);
    let event: String = event
        .chars()
        .map(|c| match c {
            '/' | '\\' | '"' => '_',
            c if c.is_control() => '_',
            other => other,
        })
        .collect();
    format!("JOB-{job_id}_{event}.pdf")
}

/// Local job directory name: `job_{id}`.
pub fn job_dir_name(job_id: DbId) -> String {
    format!("{JOB_DIR_PREFIX}{job_id}")
}

/// Reverse of [`job_dir_name`]. Returns `None` for anything else.
pub fn parse_job_dir_name(name: &str) -> Option<DbId> {
    let digits = name.strip_prefix(JOB_DIR_PREFIX)?;
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Contents of the delivery marker.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryMarker {
    pub sent_at: Timestamp,
    pub copies: i32,
}

impl DeliveryMarker {
    /// Marker text: the ISO-8601 timestamp on the first line, then
    /// `copies=N`.
    pub fn render(&self) -> String {
        format!("{}\ncopies={}\n", self.sent_at.to_rfc3339(), self.copies)
    }

    pub fn parse(text: &str) -> Result<Self, CoreError> {
        let mut lines = text.lines();
        let sent_at = lines
            .next()
            .map(str::trim)
            .and_then(|l| DateTime::parse_from_rfc3339(l).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .ok_or_else(|| CoreError::Validation("Marker has no valid timestamp".to_string()))?;

        let copies = lines
            .filter_map(|l| l.trim().strip_prefix("copies="))
            .find_map(|v| v.parse().ok())
            .unwrap_or(1);

        Ok(Self { sent_at, copies })
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn filename_uses_event_or_print() {
        assert_eq!(delivered_filename(42, Some("Smith Wedding")), "JOB-42_Smith Wedding.pdf");
        assert_eq!(delivered_filename(42, None), "JOB-42_print.pdf");
        assert_eq!(delivered_filename(42, Some("  ")), "JOB-42_print.pdf");
    }

    #[test]
    fn filename_cannot_contain_separators() {
        assert_eq!(delivered_filename(7, Some("../etc/x")), "JOB-7_.._etc_x.pdf");
        assert_eq!(delivered_filename(7, Some("a\\b")), "JOB-7_a_b.pdf");
    }

    #[test]
    fn filename_has_no_control_characters_or_quotes() {
        assert_eq!(
            delivered_filename(42, Some("Smith\r\nWedding")),
            "JOB-42_Smith__Wedding.pdf"
        );
        assert_eq!(delivered_filename(42, Some("a\tb\u{7f}\0")), "JOB-42_a_b__.pdf");
        assert_eq!(delivered_filename(42, Some("\"Gala\" 2026")), "JOB-42__Gala_ 2026.pdf");
        assert_eq!(delivered_filename(42, Some("Fête")), "JOB-42_Fête.pdf");
    }

    #[test]
    fn job_dir_names_round_trip() {
        assert_eq!(job_dir_name(42), "job_42");
        assert_eq!(parse_job_dir_name("job_42"), Some(42));
        assert_eq!(parse_job_dir_name("job_"), None);
        assert_eq!(parse_job_dir_name("job_4x"), None);
        assert_eq!(parse_job_dir_name("tmp_42"), None);
        assert_eq!(parse_job_dir_name("job_-1"), None);
    }

    #[test]
    fn marker_text_parses_back() {
        let marker = DeliveryMarker {
            sent_at: Utc.with_ymd_and_hms(2026, 7, 4, 15, 30, 0).unwrap(),
            copies: 3,
        };
        let text = marker.render();
        assert!(text.starts_with("2026-07-04T15:30:00"));
        assert_eq!(DeliveryMarker::parse(&text).unwrap(), marker);
    }

    #[test]
    fn bare_timestamp_marker_defaults_to_one_copy() {
        let parsed = DeliveryMarker::parse("2026-07-04T15:30:00+00:00").unwrap();
        assert_eq!(parsed.copies, 1);
        assert!(DeliveryMarker::parse("garbage").is_err());
    }
}
