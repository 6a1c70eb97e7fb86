use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use messagevault_core::{Message, SaveStatus};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};
use tokio::io::AsyncWriteExt;
use tracing::{debug, error};

const UNKNOWN_SENDER: &str = "Unknown";
const HASH_PREFIX_LEN: usize = 12;

#[derive(Debug, Error)]
pub enum LocalStoreError {
    #[error("invalid message timestamp: {0}")]
    InvalidTimestamp(String),
    #[error("failed to format timestamp: {0}")]
    Format(#[from] time::error::Format),
}

/// Reply sent back to the extension after a local save.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LocalSaveReport {
    pub status: SaveStatus,
    pub timestamp: String,
    pub message_type: String,
    pub prisoner_name: String,
    pub file_path: String,
    pub error: String,
}

/// Plain-text archive rooted at `root`:
/// `<name>/<sent|received>/<YYYY>/<MM>/<YYYY-MM-DD_HH-MM-SS>_<hash>.txt`.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, message: &Message) -> Result<PathBuf, LocalStoreError> {
        let at = parse_utc(&message.timestamp)?;
        let stamp = at.format(format_description!(
            "[year]-[month]-[day]_[hour]-[minute]-[second]"
        ))?;
        let filename = format!("{stamp}_{}.txt", content_hash(&message.text));

        Ok(self
            .root
            .join(alphanumeric_name(&message.prisoner_name))
            .join(message.message_type.as_str())
            .join(format!("{:04}", at.year()))
            .join(format!("{:02}", u8::from(at.month())))
            .join(filename))
    }

    /// Writes the message body without ever overwriting; an existing file
    /// means this exact message was archived before.
    pub async fn save(&self, message: &Message) -> LocalSaveReport {
        let mut report = LocalSaveReport {
            status: SaveStatus::Error,
            timestamp: message.timestamp.clone(),
            message_type: message.message_type.as_str().to_string(),
            prisoner_name: message.prisoner_name.clone(),
            file_path: String::new(),
            error: String::new(),
        };

        let path = match self.path_for(message) {
            Ok(path) => path,
            Err(err) => {
                error!("failed to place message in archive: {err}");
                report.error = err.to_string();
                return report;
            }
        };
        report.file_path = path.display().to_string();

        match write_new(&path, &message.text).await {
            Ok(()) => {
                debug!(path = %path.display(), "saved message");
                report.status = SaveStatus::Saved;
            }
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                debug!(path = %path.display(), "message already archived");
                report.status = SaveStatus::Exists;
            }
            Err(err) => {
                error!(path = %path.display(), "failed to save message: {err}");
                report.error = err.to_string();
            }
        }
        report
    }
}

async fn write_new(path: &Path, text: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await?;
    file.write_all(text.as_bytes()).await?;
    file.flush().await?;
    Ok(())
}

fn parse_utc(raw: &str) -> Result<OffsetDateTime, LocalStoreError> {
    use time::format_description::well_known::Rfc3339;
    OffsetDateTime::parse(raw.trim(), &Rfc3339)
        .map(|at| at.to_offset(UtcOffset::UTC))
        .map_err(|_| LocalStoreError::InvalidTimestamp(raw.to_string()))
}

fn alphanumeric_name(name: &str) -> String {
    let kept: String = name.chars().filter(|c| c.is_alphanumeric()).collect();
    if kept.is_empty() {
        UNKNOWN_SENDER.to_string()
    } else {
        kept
    }
}

fn content_hash(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    let hex: String = digest.iter().map(|byte| format!("{byte:02x}")).collect();
    hex[..HASH_PREFIX_LEN].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use messagevault_core::{Destination, MessageType};

    fn message(text: &str, timestamp: &str) -> Message {
        Message {
            text: text.into(),
            timestamp: timestamp.into(),
            message_type: MessageType::Received,
            prisoner_name: "John Q. Public".into(),
            destination: Destination::Local,
            drive_parent_folder_id: None,
            drive_parent_folder_name: None,
        }
    }

    #[test]
    fn path_uses_utc_numeric_month_and_content_hash() {
        let store = LocalStore::new("/vault");
        let path = store
            .path_for(&message("hello", "2024-01-01T01:30:05+03:00"))
            .unwrap();
        assert_eq!(
            path,
            PathBuf::from("/vault/JohnQPublic/received/2023/12/2023-12-31_22-30-05_2cf24dba5fb0.txt")
        );
    }

    #[test]
    fn empty_name_falls_back_to_unknown() {
        assert_eq!(alphanumeric_name(" ?! "), "Unknown");
        assert_eq!(alphanumeric_name("Ana-María"), "AnaMaría");
    }

    #[tokio::test]
    async fn saves_then_reports_exists() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());
        let msg = message("hello", "2024-03-05T14:22:07.000Z");

        let first = store.save(&msg).await;
        assert_eq!(first.status, SaveStatus::Saved);
        assert_eq!(
            std::fs::read_to_string(&first.file_path).unwrap(),
            "hello"
        );

        let second = store.save(&msg).await;
        assert_eq!(second.status, SaveStatus::Exists);
        assert_eq!(second.file_path, first.file_path);
        assert!(second.error.is_empty());
    }

    #[tokio::test]
    async fn different_text_same_minute_gets_its_own_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());

        let a = store.save(&message("first", "2024-03-05T14:22:07Z")).await;
        let b = store.save(&message("second", "2024-03-05T14:22:07Z")).await;

        assert_eq!(a.status, SaveStatus::Saved);
        assert_eq!(b.status, SaveStatus::Saved);
        assert_ne!(a.file_path, b.file_path);
    }

    #[tokio::test]
    async fn invalid_timestamp_reports_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());

        let report = store.save(&message("hello", "yesterday")).await;

        assert_eq!(report.status, SaveStatus::Error);
        assert!(report.error.contains("yesterday"));
        assert!(report.file_path.is_empty());
    }
}
