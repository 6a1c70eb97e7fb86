use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use url::Url;

const GENERIC_REQUEST_FAILURE: &str = "Google Drive request failed.";
const GENERIC_UPLOAD_FAILURE: &str = "Google Drive upload failed.";

pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

static BOUNDARY_SEQ: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Error)]
pub enum DriveError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{message}")]
    Api { status: StatusCode, message: String },
}

/// A Drive node as returned with `fields=id,name`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct FolderRef {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<FolderRef>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: Option<String>,
}

/// Thin Drive v3 client. The bearer token is passed per call so callers can
/// swap it after an auth rejection without rebuilding the client.
#[derive(Clone)]
pub struct DriveClient {
    http: Client,
    api_base: Url,
    upload_base: Url,
}

impl DriveClient {
    pub fn with_base_urls(api_base: &str, upload_base: &str) -> Result<Self, DriveError> {
        Ok(Self {
            http: Client::new(),
            api_base: parse_base(api_base)?,
            upload_base: parse_base(upload_base)?,
        })
    }

    pub async fn list_files(
        &self,
        token: &str,
        query: &str,
        page_size: u32,
        order_by: Option<&str>,
    ) -> Result<Vec<FolderRef>, DriveError> {
        let mut url = self.api_base.join("files")?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("q", query);
            pairs.append_pair("fields", "files(id,name)");
            pairs.append_pair("pageSize", &page_size.max(1).to_string());
            if let Some(order_by) = order_by {
                pairs.append_pair("orderBy", order_by);
            }
        }
        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .send()
            .await?;
        let list: FileList = Self::handle_response(response, GENERIC_REQUEST_FAILURE).await?;
        Ok(list.files)
    }

    pub async fn create_folder(
        &self,
        token: &str,
        name: &str,
        parent_id: &str,
    ) -> Result<FolderRef, DriveError> {
        let mut url = self.api_base.join("files")?;
        url.query_pairs_mut().append_pair("fields", "id,name");
        let metadata = json!({
            "name": name,
            "mimeType": FOLDER_MIME_TYPE,
            "parents": [parent_id],
        });
        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .json(&metadata)
            .send()
            .await?;
        Self::handle_response(response, GENERIC_REQUEST_FAILURE).await
    }

    pub async fn upload_text(
        &self,
        token: &str,
        name: &str,
        parent_id: &str,
        content: &str,
    ) -> Result<FolderRef, DriveError> {
        let mut url = self.upload_base.join("files")?;
        url.query_pairs_mut()
            .append_pair("uploadType", "multipart")
            .append_pair("fields", "id,name");
        let boundary = next_boundary();
        let metadata = json!({ "name": name, "parents": [parent_id] });
        let body = multipart_related_body(&boundary, &serde_json::to_string(&metadata)?, content);
        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/related; boundary={boundary}"),
            )
            .body(body)
            .send()
            .await?;
        Self::handle_response(response, GENERIC_UPLOAD_FAILURE).await
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
        fallback: &str,
    ) -> Result<T, DriveError> {
        if response.status().is_success() {
            Ok(response.json::<T>().await?)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(DriveError::Api {
                status,
                message: api_error_message(&body, fallback),
            })
        }
    }
}

impl DriveError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            DriveError::Api { status, .. } => Some(*status),
            DriveError::Request(err) => err.status(),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED)
    }
}

fn parse_base(raw: &str) -> Result<Url, url::ParseError> {
    // `Url::join` drops the last path segment unless it ends with a slash.
    if raw.ends_with('/') {
        Url::parse(raw)
    } else {
        Url::parse(&format!("{raw}/"))
    }
}

/// Drive's `error.message`, else the raw body when it is not JSON, else
/// `fallback`.
fn api_error_message(body: &str, fallback: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<serde_json::Value>(body) {
        return serde_json::from_value::<ApiErrorBody>(parsed)
            .ok()
            .and_then(|parsed| parsed.error.message)
            .filter(|message| !message.is_empty())
            .unwrap_or_else(|| fallback.to_string());
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}

fn next_boundary() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    let seq = BOUNDARY_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("messagevault_{millis}_{seq}")
}

fn multipart_related_body(boundary: &str, metadata_json: &str, content: &str) -> String {
    format!(
        "--{boundary}\r\n\
         Content-Type: application/json; charset=UTF-8\r\n\r\n\
         {metadata_json}\r\n\
         --{boundary}\r\n\
         Content-Type: text/plain; charset=UTF-8\r\n\r\n\
         {content}\r\n\
         --{boundary}--"
    )
}
