use std::future::Future;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::auth::{AuthError, CredentialProvider};
use crate::client::{DriveClient, DriveError, FolderRef};
use crate::error::SaveError;
use crate::query::{file_lookup_query, folder_lookup_query, folder_search_query};

const FOLDER_LIST_PAGE_SIZE: u32 = 50;

/// Folder resolution, duplicate lookup and upload on top of [`DriveClient`],
/// with bearer tokens from an injected [`CredentialProvider`].
///
/// Nothing here is transactional. Two saves racing on the same missing
/// folder can each create it, leaving same-named siblings; Drive offers no
/// compare-and-swap to prevent that.
#[derive(Clone)]
pub struct DriveStore {
    client: DriveClient,
    credentials: Arc<dyn CredentialProvider>,
}

impl DriveStore {
    pub fn new(client: DriveClient, credentials: Arc<dyn CredentialProvider>) -> Self {
        Self {
            client,
            credentials,
        }
    }

    pub async fn credential(&self, interactive: bool) -> Result<String, SaveError> {
        Ok(self.credentials.get(interactive).await?)
    }

    pub async fn ensure_folder_path(
        &self,
        root_id: &str,
        segments: &[String],
    ) -> Result<String, SaveError> {
        let mut current = root_id.to_string();
        for segment in segments {
            current = self.ensure_folder(&current, segment).await?.id;
        }
        Ok(current)
    }

    pub async fn ensure_folder(&self, parent_id: &str, name: &str) -> Result<FolderRef, SaveError> {
        if let Some(existing) = self.find_folder(parent_id, name).await? {
            return Ok(existing);
        }
        let client = &self.client;
        let created = self
            .with_auth_retry(false, move |token| async move {
                client.create_folder(&token, name, parent_id).await
            })
            .await?;
        info!(folder_id = %created.id, folder = name, parent_id, "created drive folder");
        Ok(created)
    }

    pub async fn find_folder(
        &self,
        parent_id: &str,
        name: &str,
    ) -> Result<Option<FolderRef>, SaveError> {
        self.first_match(&folder_lookup_query(parent_id, name)).await
    }

    pub async fn find_existing_file(
        &self,
        folder_id: &str,
        filename: &str,
    ) -> Result<Option<FolderRef>, SaveError> {
        self.first_match(&file_lookup_query(folder_id, filename)).await
    }

    pub async fn upload(
        &self,
        folder_id: &str,
        filename: &str,
        content: &str,
    ) -> Result<FolderRef, SaveError> {
        let client = &self.client;
        let file = self
            .with_auth_retry(true, move |token| async move {
                client.upload_text(&token, filename, folder_id, content).await
            })
            .await?;
        info!(file_id = %file.id, filename, folder_id, "uploaded message to drive");
        Ok(file)
    }

    /// Folders for the destination picker, natural-sorted by name.
    pub async fn list_folders(&self, needle: Option<&str>) -> Result<Vec<FolderRef>, SaveError> {
        let query = folder_search_query(needle);
        let query = query.as_str();
        let client = &self.client;
        self.with_auth_retry(true, move |token| async move {
            client
                .list_files(&token, query, FOLDER_LIST_PAGE_SIZE, Some("name_natural"))
                .await
        })
        .await
    }

    async fn first_match(&self, query: &str) -> Result<Option<FolderRef>, SaveError> {
        let client = &self.client;
        let files = self
            .with_auth_retry(false, move |token| async move {
                client.list_files(&token, query, 1, None).await
            })
            .await?;
        Ok(files.into_iter().next())
    }

    /// Runs `call` with a token; a 401 invalidates that token and runs `call`
    /// once more with a fresh one. A second 401 is final.
    async fn with_auth_retry<T, F, Fut>(&self, interactive: bool, call: F) -> Result<T, SaveError>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<T, DriveError>>,
    {
        let token = self.credentials.get(interactive).await?;
        match call(token.clone()).await {
            Ok(value) => Ok(value),
            Err(err) if err.is_unauthorized() => {
                debug!("drive rejected credential, refreshing once");
                self.credentials.invalidate(&token).await;
                let fresh = self.credentials.get(interactive).await?;
                match call(fresh).await {
                    Ok(value) => Ok(value),
                    Err(err) if err.is_unauthorized() => {
                        warn!("drive rejected refreshed credential");
                        Err(AuthError::Rejected(err.to_string()).into())
                    }
                    Err(err) => Err(err.into()),
                }
            }
            Err(err) => Err(err.into()),
        }
    }
}
