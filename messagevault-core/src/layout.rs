use time::format_description::well_known::{Iso8601, Rfc3339};
use time::{OffsetDateTime, PrimitiveDateTime};

use crate::error::SaveError;
use crate::message::Message;

const ILLEGAL_SEGMENT_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];
const UNKNOWN_SENDER: &str = "Unknown";
const FILENAME_STEM_LEN: usize = 16;
const FILE_EXTENSION: &str = ".txt";

/// Where a message lands under the chosen parent folder:
/// `<name>/<sent|received>/<year>/<month>/<filename>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriveLayout {
    pub segments: [String; 4],
    pub filename: String,
}

impl DriveLayout {
    pub fn relative_path(&self, parent_name: &str) -> String {
        format!(
            "{parent_name}/{}/{}",
            self.segments.join("/"),
            self.filename
        )
    }
}

pub fn build_layout(message: &Message) -> Result<DriveLayout, SaveError> {
    let timestamp = message.timestamp.trim();
    let at = parse_timestamp(timestamp)?;
    let prisoner = sanitize_segment(&message.prisoner_name, UNKNOWN_SENDER);
    let direction = message.message_type.as_str().to_string();
    let year = format!("{:04}", at.year());
    let month = at.month().to_string();

    Ok(DriveLayout {
        segments: [prisoner, direction, year, month],
        filename: filename_for(timestamp),
    })
}

/// Replaces characters Drive clients reject in names, collapses whitespace
/// runs and trims. Returns `fallback` when nothing is left.
pub fn sanitize_segment(input: &str, fallback: &str) -> String {
    let replaced: String = input
        .chars()
        .map(|c| if ILLEGAL_SEGMENT_CHARS.contains(&c) { ' ' } else { c })
        .collect();
    let collapsed = replaced.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        fallback.to_string()
    } else {
        collapsed
    }
}

pub(crate) fn parse_timestamp(raw: &str) -> Result<OffsetDateTime, SaveError> {
    let trimmed = raw.trim();
    if let Ok(at) = OffsetDateTime::parse(trimmed, &Rfc3339) {
        return Ok(at);
    }
    if let Ok(at) = OffsetDateTime::parse(trimmed, &Iso8601::DEFAULT) {
        return Ok(at);
    }
    PrimitiveDateTime::parse(trimmed, &Iso8601::DEFAULT)
        .map(PrimitiveDateTime::assume_utc)
        .map_err(|_| SaveError::InvalidTimestamp(raw.to_string()))
}

fn filename_for(timestamp: &str) -> String {
    let stem: String = timestamp
        .replace(':', "-")
        .chars()
        .take(FILENAME_STEM_LEN)
        .collect();
    format!("{stem}{FILE_EXTENSION}")
}
