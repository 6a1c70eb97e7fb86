use thiserror::Error;

use crate::auth::AuthError;
use crate::client::DriveError;

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("Invalid message timestamp: {0}")]
    InvalidTimestamp(String),
    #[error("Google Drive parent folder is not selected.")]
    FolderNotSelected,
    #[error("{0}")]
    Auth(#[from] AuthError),
    #[error("{0}")]
    Remote(#[from] DriveError),
    #[error("not found: {0}")]
    NotFound(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveErrorKind {
    InvalidTimestamp,
    FolderNotSelected,
    AuthFailure,
    RemoteRequestFailure,
    NotFound,
}

impl SaveError {
    pub fn kind(&self) -> SaveErrorKind {
        match self {
            SaveError::InvalidTimestamp(_) => SaveErrorKind::InvalidTimestamp,
            SaveError::FolderNotSelected => SaveErrorKind::FolderNotSelected,
            SaveError::Auth(_) => SaveErrorKind::AuthFailure,
            SaveError::Remote(_) => SaveErrorKind::RemoteRequestFailure,
            SaveError::NotFound(_) => SaveErrorKind::NotFound,
        }
    }
}
