use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;

const DEFAULT_ARCHIVE_DIR: &str = "Documents/MessageVault";
const LOG_FILE_NAME: &str = "native_host.log";
const DEFAULT_DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";
const DEFAULT_DRIVE_UPLOAD_BASE: &str = "https://www.googleapis.com/upload/drive/v3";
const DEFAULT_OAUTH_TIMEOUT_SECS: u64 = 180;

#[derive(Clone, Debug)]
pub struct HostConfig {
    pub archive_root: PathBuf,
    pub log_file: PathBuf,
    pub drive_api_base: String,
    pub drive_upload_base: String,
    pub oauth_base: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub oauth_timeout: Duration,
}

impl HostConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let home = dirs::home_dir().context("home directory is unavailable")?;
        Ok(Self::from_lookup(&home, |name| std::env::var(name).ok()))
    }

    fn from_lookup<F>(home: &Path, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let archive_root = non_empty("MESSAGEVAULT_ARCHIVE_DIR")
            .map(|value| expand_with_home(&value, home))
            .unwrap_or_else(|| home.join(DEFAULT_ARCHIVE_DIR));
        let log_file = non_empty("MESSAGEVAULT_LOG_FILE")
            .map(|value| expand_with_home(&value, home))
            .unwrap_or_else(|| archive_root.join(LOG_FILE_NAME));
        let oauth_timeout = Duration::from_secs(
            non_empty("MESSAGEVAULT_OAUTH_TIMEOUT_SECS")
                .and_then(|value| value.parse::<u64>().ok())
                .filter(|value| *value > 0)
                .unwrap_or(DEFAULT_OAUTH_TIMEOUT_SECS),
        );

        Self {
            archive_root,
            log_file,
            drive_api_base: non_empty("MESSAGEVAULT_DRIVE_API_BASE")
                .unwrap_or_else(|| DEFAULT_DRIVE_API_BASE.to_string()),
            drive_upload_base: non_empty("MESSAGEVAULT_DRIVE_UPLOAD_BASE")
                .unwrap_or_else(|| DEFAULT_DRIVE_UPLOAD_BASE.to_string()),
            oauth_base: non_empty("MESSAGEVAULT_OAUTH_BASE"),
            client_id: non_empty("MESSAGEVAULT_CLIENT_ID"),
            client_secret: non_empty("MESSAGEVAULT_CLIENT_SECRET"),
            access_token: non_empty("MESSAGEVAULT_ACCESS_TOKEN"),
            refresh_token: non_empty("MESSAGEVAULT_REFRESH_TOKEN"),
            oauth_timeout,
        }
    }

    pub fn oauth_credentials(&self) -> anyhow::Result<(&str, &str)> {
        let client_id = self
            .client_id
            .as_deref()
            .context("MESSAGEVAULT_CLIENT_ID is not set")?;
        let client_secret = self
            .client_secret
            .as_deref()
            .context("MESSAGEVAULT_CLIENT_SECRET is not set")?;
        Ok((client_id, client_secret))
    }
}

fn expand_with_home(value: &str, home: &Path) -> PathBuf {
    if value == "~" {
        return home.to_path_buf();
    }
    if let Some(rest) = value.strip_prefix("~/") {
        return home.join(rest);
    }
    PathBuf::from(value)
}
