//! Authenticated HTTP client for the cloud security console API.
//!
//! Wraps a single [`reqwest::Client`] and attaches a bearer token to every
//! API request. With client credentials the token is fetched from the OAuth
//! endpoint, cached, refreshed ahead of expiry, and refreshed once more if
//! the API answers `401`.

use crate::config::{ConsoleConfig, Credentials};
use crate::error::{PipelineError, Result};
use reqwest::header::ACCEPT;
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Tokens closer than this to expiry are refreshed before use.
const REFRESH_MARGIN: Duration = Duration::from_secs(300);
const DEFAULT_TOKEN_LIFETIME: u64 = 3600;

/// Paged list envelope returned by collection endpoints.
#[derive(Debug, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub content: Vec<T>,
    #[serde(default, rename = "totalPages")]
    pub total_pages: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<u64>,
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

impl CachedToken {
    fn is_fresh(&self) -> bool {
        Instant::now() + REFRESH_MARGIN < self.expires_at
    }
}

/// Console API client
pub struct ConsoleClient {
    base_url: String,
    auth_url: String,
    credentials: Credentials,
    request_timeout: Duration,
    http: Client,
    token: Mutex<Option<CachedToken>>,
}

impl ConsoleClient {
    pub fn new(config: &ConsoleConfig) -> Result<Self> {
        let http = Client::builder()
            .danger_accept_invalid_certs(config.skip_verify)
            .connect_timeout(config.request_timeout)
            .build()
            .map_err(|e| PipelineError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            auth_url: config.auth_url.clone(),
            credentials: config.credentials.clone(),
            request_timeout: config.request_timeout,
            http,
            token: Mutex::new(None),
        })
    }

    /// Client for a fixed bearer token
    pub fn with_token(base_url: &str, token: &str) -> Result<Self> {
        Self::new(&ConsoleConfig::with_token(base_url, token))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}{}", self.base_url, path)
        }
    }

    async fn bearer(&self, force_refresh: bool) -> Result<String> {
        let (client_id, client_secret) = match &self.credentials {
            Credentials::BearerToken(token) => return Ok(token.clone()),
            Credentials::ClientCredentials {
                client_id,
                client_secret,
            } => (client_id, client_secret),
        };

        let mut cached = self.token.lock().await;
        if !force_refresh {
            if let Some(token) = cached.as_ref().filter(|t| t.is_fresh()) {
                return Ok(token.value.clone());
            }
        }

        let fresh = self.fetch_token(client_id, client_secret).await?;
        let value = fresh.value.clone();
        *cached = Some(fresh);
        Ok(value)
    }

    async fn fetch_token(&self, client_id: &str, client_secret: &str) -> Result<CachedToken> {
        debug!(auth_url = %self.auth_url, "requesting access token");

        let response = self
            .http
            .post(&self.auth_url)
            .timeout(self.request_timeout)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", client_id),
                ("client_secret", client_secret),
            ])
            .send()
            .await
            .map_err(|e| PipelineError::Auth(format!("token request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::Auth(format!(
                "token endpoint returned {}: {}",
                status, body
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::Auth(format!("invalid token response: {}", e)))?;
        let value = token
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| PipelineError::Auth("no access_token in token response".into()))?;
        let lifetime = token.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME);

        Ok(CachedToken {
            value,
            expires_at: Instant::now() + Duration::from_secs(lifetime),
        })
    }

    /// Send an authenticated request, retrying once with a new token on 401.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<Response> {
        let url = self.url(path);
        let token = self.bearer(false).await?;
        let response = self.send(method.clone(), &url, query, body, &token).await?;

        let refreshable = matches!(self.credentials, Credentials::ClientCredentials { .. });
        if response.status() != StatusCode::UNAUTHORIZED || !refreshable {
            return Ok(response);
        }

        warn!(%url, "access token rejected, refreshing and retrying once");
        let token = self.bearer(true).await?;
        self.send(method, &url, query, body, &token).await
    }

    async fn send(
        &self,
        method: Method,
        url: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
        token: &str,
    ) -> Result<Response> {
        let mut builder = self
            .http
            .request(method, url)
            .timeout(self.request_timeout)
            .bearer_auth(token)
            .header(ACCEPT, "application/json");
        if !query.is_empty() {
            builder = builder.query(query);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }
        Ok(builder.send().await?)
    }

    async fn read_json<T: DeserializeOwned>(
        response: Response,
        method: &Method,
        path: &str,
    ) -> Result<T> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(PipelineError::Api {
                status: status.as_u16(),
                message: format!(
                    "Console API {} {} failed with status {}: {}",
                    method, path, status, body
                ),
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            PipelineError::Transport(format!("Failed to parse JSON response from {}: {}", path, e))
        })
    }

    /// GET a JSON resource
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let response = self.request(Method::GET, path, query, None).await?;
        Self::read_json(response, &Method::GET, path).await
    }

    /// POST a JSON body and decode the JSON reply
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = serde_json::to_value(body)
            .map_err(|e| PipelineError::Transport(format!("Failed to encode request: {}", e)))?;
        let response = self.request(Method::POST, path, &[], Some(&body)).await?;
        Self::read_json(response, &Method::POST, path).await
    }

    /// Start an unauthenticated download of a pre-signed artifact URL.
    ///
    /// No request timeout is applied since bodies can be large; the caller
    /// streams the response.
    pub async fn download(&self, location: &str) -> Result<Response> {
        let response = self.http.get(self.url(location)).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::Api {
                status: status.as_u16(),
                message: format!("Download failed with status {}", status),
            });
        }
        Ok(response)
    }
}
