// src/mail/oauth.rs

//! Gmail OAuth2 token acquisition and caching.
//!
//! Implements the installed-application flow: a cached token is reused
//! until it goes stale, refreshed when a refresh token is on hand, and
//! re-consented through a localhost redirect when the refresh fails.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use oauth2::basic::BasicClient;
use oauth2::reqwest::async_http_client;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, RedirectUrl, RefreshToken,
    Scope, TokenResponse as _, TokenUrl,
};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::AuthConfig;

/// Permission requested from the Gmail API.
const GMAIL_SCOPE: &str = "https://www.googleapis.com/auth/gmail.modify";

/// Tokens count as stale this long before their recorded expiry.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Client credentials file in the installed-application layout.
#[derive(Debug, Deserialize)]
struct CredentialsFile {
    installed: InstalledApp,
}

#[derive(Debug, Deserialize)]
struct InstalledApp {
    client_id: String,
    client_secret: String,
    #[serde(default = "defaults::auth_uri")]
    auth_uri: String,
    #[serde(default = "defaults::token_uri")]
    token_uri: String,
}

mod defaults {
    pub fn auth_uri() -> String {
        "https://accounts.google.com/o/oauth2/auth".to_string()
    }

    pub fn token_uri() -> String {
        "https://oauth2.googleapis.com/token".to_string()
    }
}

/// Cached token state persisted between runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredToken {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    /// Instant after which the access token is stale.
    #[serde(default)]
    expiry: Option<DateTime<Utc>>,
}

impl StoredToken {
    /// Whether the access token can be used without refreshing.
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        match self.expiry {
            Some(expiry) => expiry - ChronoDuration::seconds(EXPIRY_MARGIN_SECS) > now,
            None => false,
        }
    }
}

/// Produces Gmail access tokens, caching them at the configured path.
pub struct GmailAuth {
    client: BasicClient,
    token_path: PathBuf,
}

impl GmailAuth {
    /// Load client credentials and prepare the token cache location.
    pub async fn from_config(config: &AuthConfig) -> Result<Self> {
        let installed = read_credentials(&config.credentials_path).await?;

        let client = BasicClient::new(
            ClientId::new(installed.client_id),
            Some(ClientSecret::new(installed.client_secret)),
            AuthUrl::new(installed.auth_uri).map_err(|e| AppError::auth(e.to_string()))?,
            Some(TokenUrl::new(installed.token_uri).map_err(|e| AppError::auth(e.to_string()))?),
        );

        Ok(Self {
            client,
            token_path: config.token_path.clone(),
        })
    }

    /// Produce a usable access token, trying the cache, then a refresh,
    /// then a fresh consent flow.
    pub async fn access_token(&self) -> Result<String> {
        let now = Utc::now();

        if let Some(stored) = self.load_token().await? {
            if stored.is_fresh(now) {
                return Ok(stored.access_token);
            }
            if let Some(refresh_token) = stored.refresh_token {
                match self.refresh(&refresh_token).await {
                    Ok(token) => return Ok(token.access_token),
                    Err(error) => {
                        log::warn!("Token refresh failed, starting a new consent flow: {error}");
                        self.forget_token().await?;
                    }
                }
            }
        }

        let token = self.consent().await?;
        Ok(token.access_token)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<StoredToken> {
        let response = self
            .client
            .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
            .request_async(async_http_client)
            .await
            .map_err(|e| AppError::auth(e.to_string()))?;

        // Refresh responses may omit the refresh token; keep the old one.
        let token = StoredToken {
            access_token: response.access_token().secret().clone(),
            refresh_token: response
                .refresh_token()
                .map(|t| t.secret().clone())
                .or_else(|| Some(refresh_token.to_string())),
            expiry: expiry_from_now(response.expires_in()),
        };
        self.save_token(&token).await?;
        log::info!("Refreshed Gmail access token.");
        Ok(token)
    }

    /// Run the installed-application consent flow through a localhost
    /// redirect on an ephemeral port.
    async fn consent(&self) -> Result<StoredToken> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let port = listener.local_addr()?.port();
        let redirect = RedirectUrl::new(format!("http://localhost:{port}/"))
            .map_err(|e| AppError::auth(e.to_string()))?;
        let client = self.client.clone().set_redirect_uri(redirect);

        let (auth_url, csrf) = client
            .authorize_url(CsrfToken::new_random)
            .add_scope(Scope::new(GMAIL_SCOPE.to_string()))
            .add_extra_param("access_type", "offline")
            .add_extra_param("prompt", "consent")
            .url();

        println!("Open this URL in your browser to authorize Gmail access:\n{auth_url}");
        log::info!("Waiting for the OAuth redirect on port {port}...");

        let code = wait_for_code(&listener, csrf.secret()).await?;

        let response = client
            .exchange_code(AuthorizationCode::new(code))
            .request_async(async_http_client)
            .await
            .map_err(|e| AppError::auth(e.to_string()))?;

        let token = StoredToken {
            access_token: response.access_token().secret().clone(),
            refresh_token: response.refresh_token().map(|t| t.secret().clone()),
            expiry: expiry_from_now(response.expires_in()),
        };
        self.save_token(&token).await?;
        log::info!("Gmail authorization complete.");
        Ok(token)
    }

    async fn load_token(&self) -> Result<Option<StoredToken>> {
        let raw = match tokio::fs::read(&self.token_path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(AppError::Io(e)),
        };
        match serde_json::from_slice(&raw) {
            Ok(token) => Ok(Some(token)),
            Err(error) => {
                log::warn!(
                    "Ignoring unreadable token cache {}: {error}",
                    self.token_path.display()
                );
                Ok(None)
            }
        }
    }

    /// Persist the token, readable by the owner only.
    async fn save_token(&self, token: &StoredToken) -> Result<()> {
        if let Some(parent) = self.token_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let json = serde_json::to_vec_pretty(token)?;
        tokio::fs::write(&self.token_path, &json).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = std::fs::Permissions::from_mode(0o600);
            tokio::fs::set_permissions(&self.token_path, permissions).await?;
        }
        Ok(())
    }

    async fn forget_token(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.token_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Io(e)),
        }
    }
}

/// What the cached token file can do for the next run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenCacheStatus {
    /// No cache on disk; the next run starts a consent flow.
    Missing,
    /// A refresh token is cached; runs can renew access unattended.
    Refreshable,
    /// Only an access token is cached; once stale, consent is needed again.
    AccessOnly,
}

/// Check the credential files without touching the network.
///
/// Confirms the credentials file parses as an installed-application
/// client and reports what the token cache holds.
pub async fn inspect_credentials(config: &AuthConfig) -> Result<TokenCacheStatus> {
    let installed = read_credentials(&config.credentials_path).await?;
    if installed.client_id.is_empty() || installed.client_secret.is_empty() {
        return Err(AppError::auth(
            "credentials file has an empty client id or secret",
        ));
    }

    let raw = match tokio::fs::read(&config.token_path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(TokenCacheStatus::Missing),
        Err(e) => return Err(AppError::Io(e)),
    };
    let token: StoredToken = serde_json::from_slice(&raw).map_err(|e| {
        AppError::auth(format!(
            "token cache {} is unreadable: {e}",
            config.token_path.display()
        ))
    })?;

    if token.refresh_token.is_some() {
        Ok(TokenCacheStatus::Refreshable)
    } else {
        Ok(TokenCacheStatus::AccessOnly)
    }
}

async fn read_credentials(path: &Path) -> Result<InstalledApp> {
    let raw = tokio::fs::read(path).await.map_err(|e| {
        AppError::auth(format!("cannot read credentials file {}: {e}", path.display()))
    })?;
    let credentials: CredentialsFile = serde_json::from_slice(&raw)?;
    Ok(credentials.installed)
}

fn expiry_from_now(expires_in: Option<std::time::Duration>) -> Option<DateTime<Utc>> {
    expires_in.map(|d| Utc::now() + ChronoDuration::seconds(d.as_secs() as i64))
}

/// Accept one connection and pull the authorization code out of it.
async fn wait_for_code(listener: &TcpListener, expected_state: &str) -> Result<String> {
    let (mut socket, _) = listener.accept().await?;

    let mut buffer = vec![0u8; 4096];
    let read = socket.read(&mut buffer).await?;
    let request = String::from_utf8_lossy(&buffer[..read]);

    let result = parse_redirect(&request, expected_state);

    let (status, body) = match &result {
        Ok(_) => ("200 OK", "Authorization received. You can close this window."),
        Err(_) => (
            "400 Bad Request",
            "Authorization failed. Check the terminal for details.",
        ),
    };
    let reply = format!(
        "HTTP/1.1 {status}\r\ncontent-type: text/plain\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
        body.len()
    );
    socket.write_all(reply.as_bytes()).await?;
    socket.shutdown().await?;

    result
}

/// Extract and validate the authorization code from the request line.
fn parse_redirect(request: &str, expected_state: &str) -> Result<String> {
    let path = request
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .ok_or_else(|| AppError::auth("malformed redirect request"))?;

    let url = Url::parse(&format!("http://localhost{path}"))?;

    let mut code = None;
    let mut state = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => return Err(AppError::auth(format!("authorization denied: {value}"))),
            _ => {}
        }
    }

    if state.as_deref() != Some(expected_state) {
        return Err(AppError::auth("state mismatch in OAuth redirect"));
    }
    code.ok_or_else(|| AppError::auth("redirect did not carry an authorization code"))
}
