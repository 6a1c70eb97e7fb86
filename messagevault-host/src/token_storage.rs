use keyring::Entry;
use thiserror::Error;

const SERVICE_NAME: &str = "com.messagevault.host";
const REFRESH_TOKEN_KEY: &str = "google_refresh_token";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("keyring error: {0}")]
    KeyringError(#[from] keyring::Error),
    #[error("token not found")]
    TokenNotFound,
}

/// Google refresh token kept in the OS keyring.
pub struct TokenStorage {
    entry: Entry,
}

impl TokenStorage {
    pub fn new() -> Result<Self, StorageError> {
        Ok(Self {
            entry: Entry::new(SERVICE_NAME, REFRESH_TOKEN_KEY)?,
        })
    }

    pub fn save_refresh_token(&self, token: &str) -> Result<(), StorageError> {
        self.entry.set_password(token)?;
        Ok(())
    }

    pub fn get_refresh_token(&self) -> Result<String, StorageError> {
        match self.entry.get_password() {
            Ok(token) => Ok(token),
            Err(keyring::Error::NoEntry) => Err(StorageError::TokenNotFound),
            Err(err) => Err(StorageError::KeyringError(err)),
        }
    }

    pub fn delete_refresh_token(&self) -> Result<(), StorageError> {
        match self.entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(err) => Err(StorageError::KeyringError(err)),
        }
    }
}
