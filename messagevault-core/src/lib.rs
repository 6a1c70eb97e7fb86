mod auth;
mod client;
mod drive;
mod error;
mod layout;
mod message;
mod oauth;
mod query;
mod save;

pub use auth::{AuthError, CredentialProvider, OAuthCredentialProvider, StaticCredentialProvider};
pub use client::{DriveClient, DriveError, FOLDER_MIME_TYPE, FolderRef};
pub use drive::DriveStore;
pub use error::{SaveError, SaveErrorKind};
pub use layout::{DriveLayout, build_layout, sanitize_segment};
pub use message::{Destination, Message, MessageType, SaveResult, SaveStatus};
pub use oauth::{DRIVE_FILE_SCOPE, OAuthClient, OAuthError, OAuthToken};
pub use query::{escape_query_value, file_lookup_query, folder_lookup_query, folder_search_query};
pub use save::{DEFAULT_PARENT_NAME, save_to_drive, try_save_to_drive};
