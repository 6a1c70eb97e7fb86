use tracing::{error, info};

use crate::drive::DriveStore;
use crate::error::SaveError;
use crate::layout::build_layout;
use crate::message::{Message, SaveResult};

/// Label used in reported paths when the picker did not send a folder name.
pub const DEFAULT_PARENT_NAME: &str = "My Drive";

/// Saves `message` under its chosen Drive parent folder, folding every
/// failure into an error result carrying the failure's message.
pub async fn save_to_drive(store: &DriveStore, message: &Message) -> SaveResult {
    match try_save_to_drive(store, message).await {
        Ok(result) => result,
        Err(err) => {
            error!(kind = ?err.kind(), "saving to google drive failed: {err}");
            SaveResult::error(err.to_string())
        }
    }
}

/// Layout, folder resolution, duplicate check, then upload. Returns `exists`
/// without uploading when the target file is already there.
pub async fn try_save_to_drive(
    store: &DriveStore,
    message: &Message,
) -> Result<SaveResult, SaveError> {
    let parent_id = message
        .drive_parent_folder_id
        .as_deref()
        .filter(|id| !id.is_empty())
        .ok_or(SaveError::FolderNotSelected)?;
    let parent_name = message
        .drive_parent_folder_name
        .as_deref()
        .filter(|name| !name.is_empty())
        .unwrap_or(DEFAULT_PARENT_NAME);

    store.credential(true).await?;

    let layout = build_layout(message)?;
    let leaf_id = store.ensure_folder_path(parent_id, &layout.segments).await?;
    let relative_path = layout.relative_path(parent_name);

    if store
        .find_existing_file(&leaf_id, &layout.filename)
        .await?
        .is_some()
    {
        info!(path = %relative_path, "message already saved to drive");
        return Ok(SaveResult::exists(relative_path));
    }

    store.upload(&leaf_id, &layout.filename, &message.text).await?;
    info!(path = %relative_path, "message saved to drive");
    Ok(SaveResult::saved(relative_path))
}
