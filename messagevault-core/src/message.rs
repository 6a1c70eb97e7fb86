use serde::{Deserialize, Serialize};

/// Direction of a captured message. Anything other than `"sent"` reads as
/// received, including values the page scraper could not classify.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Sent,
    #[default]
    #[serde(other)]
    Received,
}

impl MessageType {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageType::Sent => "sent",
            MessageType::Received => "received",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Destination {
    Drive,
    #[default]
    #[serde(other)]
    Local,
}

/// One message as captured from the portal page.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub text: String,
    pub timestamp: String,
    #[serde(default)]
    pub message_type: MessageType,
    #[serde(default)]
    pub prisoner_name: String,
    #[serde(default)]
    pub destination: Destination,
    #[serde(default)]
    pub drive_parent_folder_id: Option<String>,
    #[serde(default)]
    pub drive_parent_folder_name: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SaveStatus {
    Saved,
    Exists,
    Error,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SaveResult {
    pub status: SaveStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SaveResult {
    pub fn saved(file_path: impl Into<String>) -> Self {
        Self {
            status: SaveStatus::Saved,
            file_path: Some(file_path.into()),
            error: None,
        }
    }

    pub fn exists(file_path: impl Into<String>) -> Self {
        Self {
            status: SaveStatus::Exists,
            file_path: Some(file_path.into()),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: SaveStatus::Error,
            file_path: None,
            error: Some(message.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserializes_extension_payload() {
        let message: Message = serde_json::from_value(json!({
            "text": "hello",
            "timestamp": "2024-03-05T14:22:07.000Z",
            "messageType": "sent",
            "prisonerName": "Jane Doe",
            "destination": "drive",
            "driveParentFolderId": "root-1",
            "driveParentFolderName": null
        }))
        .unwrap();
        assert_eq!(message.message_type, MessageType::Sent);
        assert_eq!(message.destination, Destination::Drive);
        assert_eq!(message.drive_parent_folder_id.as_deref(), Some("root-1"));
        assert!(message.drive_parent_folder_name.is_none());
    }

    #[test]
    fn unknown_direction_and_destination_fall_back() {
        let message: Message = serde_json::from_value(json!({
            "text": "hello",
            "timestamp": "2024-03-05T14:22:07.000Z",
            "messageType": "unknown",
            "prisonerName": "Jane Doe",
            "destination": "cloud"
        }))
        .unwrap();
        assert_eq!(message.message_type, MessageType::Received);
        assert_eq!(message.destination, Destination::Local);
    }

    #[test]
    fn save_result_omits_absent_fields() {
        let value = serde_json::to_value(SaveResult::saved("My Drive/a.txt")).unwrap();
        assert_eq!(value, json!({ "status": "saved", "filePath": "My Drive/a.txt" }));
        let value = serde_json::to_value(SaveResult::error("boom")).unwrap();
        assert_eq!(value, json!({ "status": "error", "error": "boom" }));
    }
}
