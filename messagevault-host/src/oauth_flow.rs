use std::time::Duration;

use messagevault_core::{OAuthClient, OAuthToken};
use rand::Rng;
use rand::distributions::Alphanumeric;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing::info;
use url::Url;

const STATE_LEN: usize = 24;

#[derive(Debug, Error)]
pub enum OAuthFlowError {
    #[error("oauth error: {0}")]
    OAuth(#[from] messagevault_core::OAuthError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("authorization code missing in redirect")]
    MissingCode,
    #[error("authorization denied: {0}")]
    Denied(String),
    #[error("authorization state mismatch")]
    StateMismatch,
    #[error("authorization timed out")]
    Timeout,
    #[error("google did not return a refresh token")]
    MissingRefreshToken,
}

#[derive(Debug, PartialEq, Eq)]
enum Redirect {
    Code { code: String, state: Option<String> },
    Error(String),
}

/// Loopback authorization-code flow: the user opens the printed URL and
/// Google redirects back to a one-shot listener on 127.0.0.1.
pub struct LoginFlow {
    client: OAuthClient,
    timeout: Duration,
}

impl LoginFlow {
    pub fn new(client: OAuthClient, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    pub async fn authenticate(&self) -> Result<OAuthToken, OAuthFlowError> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let redirect_uri = format!("http://127.0.0.1:{}/callback", addr.port());
        let state = random_state();
        let url = self.client.authorize_url(&redirect_uri, None, Some(&state));

        eprintln!("Open this URL in your browser to connect Google Drive:\n{url}");
        info!(%redirect_uri, "waiting for oauth redirect");

        let (mut stream, _) = tokio::time::timeout(self.timeout, listener.accept())
            .await
            .map_err(|_| OAuthFlowError::Timeout)??;

        let mut request = vec![0u8; 8192];
        let read = tokio::time::timeout(Duration::from_secs(10), stream.read(&mut request))
            .await
            .map_err(|_| OAuthFlowError::Timeout)??;
        let request_text = String::from_utf8_lossy(&request[..read]);
        let redirect = parse_redirect(&request_text);

        let page: &[u8] = if matches!(redirect, Some(Redirect::Code { .. })) {
            b"HTTP/1.1 200 OK\r\nContent-Type: text/html; charset=utf-8\r\nConnection: close\r\n\r\n\
            <html><body><h2>MessageVault connected to Google Drive</h2><p>You can close this tab.</p></body></html>"
        } else {
            b"HTTP/1.1 400 Bad Request\r\nContent-Type: text/html; charset=utf-8\r\nConnection: close\r\n\r\n\
            <html><body><h2>Google Drive was not connected</h2></body></html>"
        };
        let _ = stream.write_all(page).await;
        let _ = stream.shutdown().await;

        let code = match redirect {
            Some(Redirect::Code {
                code,
                state: returned,
            }) => {
                if returned.as_deref() != Some(state.as_str()) {
                    return Err(OAuthFlowError::StateMismatch);
                }
                code
            }
            Some(Redirect::Error(reason)) => return Err(OAuthFlowError::Denied(reason)),
            None => return Err(OAuthFlowError::MissingCode),
        };

        let token = self.client.exchange_code(&code, &redirect_uri).await?;
        if token.refresh_token.is_none() {
            return Err(OAuthFlowError::MissingRefreshToken);
        }
        Ok(token)
    }
}

fn random_state() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(STATE_LEN)
        .map(char::from)
        .collect()
}

fn parse_redirect(request: &str) -> Option<Redirect> {
    let request_line = request.lines().next()?;
    let target = request_line.split_whitespace().nth(1)?;
    let request_url = if target.starts_with("http://") || target.starts_with("https://") {
        Url::parse(target).ok()?
    } else {
        Url::parse(&format!("http://127.0.0.1{target}")).ok()?
    };

    let mut code = None;
    let mut state = None;
    for (key, value) in request_url.query_pairs() {
        match key.as_ref() {
            "code" if !value.is_empty() => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => return Some(Redirect::Error(value.into_owned())),
            _ => {}
        }
    }
    code.map(|code| Redirect::Code { code, state })
}
