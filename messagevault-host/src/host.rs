use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use messagevault_core::{
    AuthError, CredentialProvider, Destination, DriveClient, DriveStore, FolderRef, Message,
    OAuthClient, OAuthCredentialProvider, SaveResult, SaveStatus, StaticCredentialProvider,
    save_to_drive,
};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::HostConfig;
use crate::local_store::{LocalSaveReport, LocalStore};
use crate::native::{FrameReader, FrameWriter, NativeError};
use crate::token_storage::TokenStorage;

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum HostRequest {
    #[serde(rename = "GRABBED_MESSAGE")]
    GrabbedMessage(Message),
    #[serde(rename = "DRIVE_LIST_FOLDERS")]
    DriveListFolders {
        #[serde(default)]
        query: Option<String>,
    },
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum SaveReport {
    Local(LocalSaveReport),
    Drive(SaveResult),
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum HostResponse {
    Save {
        destination: Destination,
        #[serde(flatten)]
        report: SaveReport,
    },
    Folders {
        status: &'static str,
        folders: Vec<FolderRef>,
    },
    Error {
        status: SaveStatus,
        error: String,
    },
}

impl HostResponse {
    pub fn error(message: impl Into<String>) -> Self {
        HostResponse::Error {
            status: SaveStatus::Error,
            error: message.into(),
        }
    }
}

/// Used when neither a static token nor OAuth client credentials are set.
struct UnconfiguredCredentials;

#[async_trait]
impl CredentialProvider for UnconfiguredCredentials {
    async fn get(&self, _interactive: bool) -> Result<String, AuthError> {
        Err(AuthError::NotSignedIn(
            "MESSAGEVAULT_CLIENT_ID and MESSAGEVAULT_CLIENT_SECRET are not set".to_string(),
        ))
    }

    async fn invalidate(&self, _token: &str) {}
}

#[derive(Clone)]
pub struct Host {
    local: LocalStore,
    drive: DriveStore,
}

impl Host {
    pub fn new(local: LocalStore, drive: DriveStore) -> Self {
        Self { local, drive }
    }

    pub fn from_config(config: &HostConfig) -> anyhow::Result<Self> {
        let client = DriveClient::with_base_urls(&config.drive_api_base, &config.drive_upload_base)
            .context("invalid drive base url")?;
        let credentials = credential_provider(config)?;
        Ok(Self::new(
            LocalStore::new(&config.archive_root),
            DriveStore::new(client, credentials),
        ))
    }

    pub async fn handle(&self, raw: &[u8]) -> HostResponse {
        let request = match serde_json::from_slice::<HostRequest>(raw) {
            Ok(request) => request,
            Err(err) => {
                warn!("rejecting malformed request: {err}");
                return HostResponse::error(format!("invalid request: {err}"));
            }
        };
        self.dispatch(request).await
    }

    pub async fn dispatch(&self, request: HostRequest) -> HostResponse {
        match request {
            HostRequest::GrabbedMessage(message) => {
                debug!(
                    destination = ?message.destination,
                    message_type = message.message_type.as_str(),
                    "received message"
                );
                let report = match message.destination {
                    Destination::Drive => SaveReport::Drive(save_to_drive(&self.drive, &message).await),
                    Destination::Local => SaveReport::Local(self.local.save(&message).await),
                };
                HostResponse::Save {
                    destination: message.destination,
                    report,
                }
            }
            HostRequest::DriveListFolders { query } => {
                match self.drive.list_folders(query.as_deref()).await {
                    Ok(folders) => HostResponse::Folders {
                        status: "ok",
                        folders,
                    },
                    Err(err) => {
                        error!("listing drive folders failed: {err}");
                        HostResponse::error(err.to_string())
                    }
                }
            }
        }
    }

    /// Serves requests until the browser closes the channel. Each request
    /// runs on its own task; replies are written in completion order.
    pub async fn run<R, W>(&self, reader: R, writer: W) -> Result<(), NativeError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut reader = FrameReader::new(reader);
        let mut writer = FrameWriter::new(writer);
        let (tx, mut rx) = mpsc::unbounded_channel::<HostResponse>();
        info!("native host started");

        let read_loop = async move {
            while let Some(raw) = reader.recv_raw().await? {
                let host = self.clone();
                let tx = tx.clone();
                tokio::spawn(async move {
                    let response = host.handle(&raw).await;
                    let _ = tx.send(response);
                });
            }
            info!("browser disconnected");
            Ok::<(), NativeError>(())
        };
        let write_loop = async {
            while let Some(response) = rx.recv().await {
                match writer.send(&response).await {
                    Err(NativeError::TooLarge(len)) => {
                        warn!(len, "response exceeds native messaging limit");
                        writer
                            .send(&HostResponse::error(format!(
                                "response of {len} bytes is too large for the browser"
                            )))
                            .await?;
                    }
                    other => other?,
                }
            }
            Ok::<(), NativeError>(())
        };

        tokio::try_join!(read_loop, write_loop)?;
        Ok(())
    }
}

fn credential_provider(config: &HostConfig) -> anyhow::Result<Arc<dyn CredentialProvider>> {
    if let Some(token) = &config.access_token {
        return Ok(Arc::new(StaticCredentialProvider::new(token.clone())));
    }
    let Ok((client_id, client_secret)) = config.oauth_credentials() else {
        warn!("google drive is not configured");
        return Ok(Arc::new(UnconfiguredCredentials));
    };
    let client = match &config.oauth_base {
        Some(base) => OAuthClient::with_base_url(base, client_id, client_secret),
        None => OAuthClient::new(client_id, client_secret),
    }
    .context("invalid oauth config")?;
    let refresh_token = match &config.refresh_token {
        Some(token) => Some(token.clone()),
        None => stored_refresh_token(),
    };
    Ok(Arc::new(OAuthCredentialProvider::new(client, refresh_token)))
}

fn stored_refresh_token() -> Option<String> {
    match TokenStorage::new().and_then(|storage| storage.get_refresh_token()) {
        Ok(token) => Some(token),
        Err(err) => {
            debug!("no stored refresh token: {err}");
            None
        }
    }
}
