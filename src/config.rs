//! Connection settings for the console API.
//!
//! Every value resolves in the same order: command-line flag, then
//! environment variable, then built-in default.

use anyhow::{anyhow, bail, Result};
use std::env;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://thales.na.market.dpondemand.io";
pub const DEFAULT_AUTH_URL: &str = "https://access.dpondemand.io/oauth/v1/token";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// How the client obtains a bearer token.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// OAuth client-credentials grant against the auth URL.
    ClientCredentials {
        client_id: String,
        client_secret: String,
    },
    /// Pre-issued token, used as-is and never refreshed.
    BearerToken(String),
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ClientCredentials { client_id, .. } => f
                .debug_struct("ClientCredentials")
                .field("client_id", client_id)
                .field("client_secret", &"<redacted>")
                .finish(),
            Self::BearerToken(_) => f.debug_tuple("BearerToken").field(&"<redacted>").finish(),
        }
    }
}

/// Check if TLS verification should be skipped based on environment or flag
pub fn should_skip_verify(insecure_flag: bool) -> bool {
    if insecure_flag {
        return true;
    }

    env::var("DPOD_SKIP_VERIFY")
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

/// Pick a credential mode. A token wins over a client id/secret pair.
pub fn resolve_credentials(
    client_id: Option<String>,
    client_secret: Option<String>,
    token: Option<String>,
) -> Result<Credentials> {
    if let Some(token) = token.filter(|t| !t.trim().is_empty()) {
        return Ok(Credentials::BearerToken(token.trim().to_string()));
    }

    match (client_id, client_secret) {
        (Some(client_id), Some(client_secret))
            if !client_id.is_empty() && !client_secret.is_empty() =>
        {
            Ok(Credentials::ClientCredentials {
                client_id,
                client_secret,
            })
        }
        _ => Err(anyhow!(
            "Console credentials are not configured. Provide either:\n\
             - A token: --token <TOKEN> or export DPOD_TOKEN=<TOKEN>\n\
             - Client credentials: export DPOD_CLIENT_ID=<ID> DPOD_CLIENT_SECRET=<SECRET>"
        )),
    }
}

/// Resolved connection settings
#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    pub base_url: String,
    pub auth_url: String,
    pub credentials: Credentials,
    pub skip_verify: bool,
    pub request_timeout: Duration,
}

impl ConsoleConfig {
    /// Build a configuration from CLI options, falling back to the environment.
    pub fn from_options(
        base_url: Option<&str>,
        auth_url: Option<&str>,
        client_id: Option<&str>,
        client_secret: Option<&str>,
        token: Option<&str>,
        insecure: bool,
    ) -> Result<Self> {
        let flag_or_env = |flag: Option<&str>, var: &str| {
            flag.map(str::to_string).or_else(|| env::var(var).ok())
        };

        let base_url =
            flag_or_env(base_url, "DPOD_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let auth_url =
            flag_or_env(auth_url, "DPOD_AUTH_URL").unwrap_or_else(|| DEFAULT_AUTH_URL.to_string());
        let credentials = resolve_credentials(
            flag_or_env(client_id, "DPOD_CLIENT_ID"),
            flag_or_env(client_secret, "DPOD_CLIENT_SECRET"),
            flag_or_env(token, "DPOD_TOKEN"),
        )?;

        let config = Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_url,
            credentials,
            skip_verify: should_skip_verify(insecure),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        };
        config.validate()?;
        Ok(config)
    }

    /// Configuration for a fixed token, bypassing the environment.
    pub fn with_token(base_url: &str, token: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_url: DEFAULT_AUTH_URL.to_string(),
            credentials: Credentials::BearerToken(token.to_string()),
            skip_verify: false,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn validate(&self) -> Result<()> {
        for (name, url) in [("base URL", &self.base_url), ("auth URL", &self.auth_url)] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                bail!("Invalid {}: '{}' must start with http:// or https://", name, url);
            }
        }
        Ok(())
    }
}
