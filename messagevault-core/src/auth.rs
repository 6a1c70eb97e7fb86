use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

use crate::oauth::{OAuthClient, OAuthError};

const REFRESH_SKEW_SECS: i64 = 60;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Google sign-in required: {0}")]
    NotSignedIn(String),
    #[error("Google rejected the credential: {0}")]
    Rejected(String),
    #[error("Google auth failed: {0}")]
    OAuth(#[from] OAuthError),
}

/// Source of bearer tokens for Drive calls.
///
/// `interactive` is set for user-initiated entry points; nested calls made
/// while a save is already running are silent.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn get(&self, interactive: bool) -> Result<String, AuthError>;

    /// Drops `token` from any cache so the next `get` obtains a fresh one.
    async fn invalidate(&self, token: &str);
}

/// A fixed token, typically from `MESSAGEVAULT_ACCESS_TOKEN`.
pub struct StaticCredentialProvider {
    token: String,
}

impl StaticCredentialProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentialProvider {
    async fn get(&self, _interactive: bool) -> Result<String, AuthError> {
        Ok(self.token.clone())
    }

    async fn invalidate(&self, _token: &str) {
        debug!("static access token rejected; it cannot be refreshed");
    }
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: Option<i64>,
}

pub struct OAuthCredentialProvider {
    client: OAuthClient,
    refresh_token: Option<String>,
    cached: Mutex<Option<CachedToken>>,
}

impl OAuthCredentialProvider {
    pub fn new(client: OAuthClient, refresh_token: Option<String>) -> Self {
        Self {
            client,
            refresh_token,
            cached: Mutex::new(None),
        }
    }
}

#[async_trait]
impl CredentialProvider for OAuthCredentialProvider {
    async fn get(&self, interactive: bool) -> Result<String, AuthError> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| !is_expiring(t.expires_at)) {
            return Ok(token.access_token.clone());
        }

        let Some(refresh_token) = self.refresh_token.as_deref() else {
            let hint = if interactive {
                "run `messagevault-host --login` to connect Google Drive"
            } else {
                "no refresh token is stored"
            };
            return Err(AuthError::NotSignedIn(hint.to_string()));
        };

        debug!(interactive, "refreshing Google access token");
        let token = self.client.refresh_token(refresh_token).await?;
        let fresh = CachedToken {
            access_token: token.access_token,
            expires_at: token
                .expires_in
                .map(|secs| now_unix().saturating_add(secs as i64)),
        };
        let access_token = fresh.access_token.clone();
        *cached = Some(fresh);
        Ok(access_token)
    }

    async fn invalidate(&self, token: &str) {
        let mut cached = self.cached.lock().await;
        if cached.as_ref().is_some_and(|t| t.access_token == token) {
            debug!("dropping rejected Google access token");
            *cached = None;
        }
    }
}

fn is_expiring(expires_at: Option<i64>) -> bool {
    let Some(expires_at) = expires_at else {
        return false;
    };
    expires_at <= now_unix().saturating_add(REFRESH_SKEW_SECS)
}

fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn token_server(access_token: &str, expires_in: u64, calls: u64) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("refresh_token=refresh-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": access_token,
                "token_type": "Bearer",
                "expires_in": expires_in
            })))
            .expect(calls)
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn caches_refreshed_token_until_invalidated() {
        let server = token_server("access-1", 3600, 2).await;
        let client = OAuthClient::with_base_url(&server.uri(), "client-id", "secret").unwrap();
        let provider = OAuthCredentialProvider::new(client, Some("refresh-1".into()));

        assert_eq!(provider.get(true).await.unwrap(), "access-1");
        assert_eq!(provider.get(false).await.unwrap(), "access-1");

        provider.invalidate("access-1").await;
        assert_eq!(provider.get(false).await.unwrap(), "access-1");
    }

    #[tokio::test]
    async fn invalidate_ignores_other_tokens() {
        let server = token_server("access-1", 3600, 1).await;
        let client = OAuthClient::with_base_url(&server.uri(), "client-id", "secret").unwrap();
        let provider = OAuthCredentialProvider::new(client, Some("refresh-1".into()));

        provider.get(true).await.unwrap();
        provider.invalidate("someone-else").await;
        assert_eq!(provider.get(false).await.unwrap(), "access-1");
    }

    #[tokio::test]
    async fn refreshes_again_when_token_is_about_to_expire() {
        let server = token_server("short-lived", 30, 2).await;
        let client = OAuthClient::with_base_url(&server.uri(), "client-id", "secret").unwrap();
        let provider = OAuthCredentialProvider::new(client, Some("refresh-1".into()));

        provider.get(true).await.unwrap();
        provider.get(false).await.unwrap();
    }

    #[tokio::test]
    async fn missing_refresh_token_is_not_signed_in() {
        let client = OAuthClient::with_base_url("http://127.0.0.1:9", "client-id", "secret")
            .unwrap();
        let provider = OAuthCredentialProvider::new(client, None);

        let err = provider.get(true).await.unwrap_err();
        assert!(matches!(err, AuthError::NotSignedIn(ref hint) if hint.contains("--login")));
    }

    #[tokio::test]
    async fn refresh_failure_surfaces_oauth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_string("invalid_grant"))
            .mount(&server)
            .await;
        let client = OAuthClient::with_base_url(&server.uri(), "client-id", "secret").unwrap();
        let provider = OAuthCredentialProvider::new(client, Some("refresh-1".into()));

        let err = provider.get(false).await.unwrap_err();
        assert!(matches!(err, AuthError::OAuth(OAuthError::Api { .. })));
    }
}
