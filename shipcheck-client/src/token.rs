//! OAuth access tokens
//!
//! Tokens come from `GOOGLE_OAUTH_ACCESS_TOKEN` when set, otherwise from the
//! gcloud CLI of the machine running the harness.

use tokio::process::Command;
use tracing::debug;

use crate::error::{ClientError, Result};

/// Environment variable holding a pre-issued access token
pub const TOKEN_ENV_VAR: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";

/// A bearer token for the build API
#[derive(Clone)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Resolves a token from the environment, falling back to gcloud
    pub async fn resolve() -> Result<Self> {
        if let Ok(token) = std::env::var(TOKEN_ENV_VAR) {
            let token = token.trim();
            if !token.is_empty() {
                debug!("Using access token from {}", TOKEN_ENV_VAR);
                return Ok(Self::new(token));
            }
        }

        Self::from_gcloud().await
    }

    /// Asks the gcloud CLI for a token of the active account
    pub async fn from_gcloud() -> Result<Self> {
        let output = Command::new("gcloud")
            .args(["auth", "print-access-token"])
            .output()
            .await
            .map_err(|e| {
                ClientError::TokenUnavailable(format!(
                    "failed to execute 'gcloud auth print-access-token': {e}"
                ))
            })?;

        if !output.status.success() {
            return Err(ClientError::TokenUnavailable(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if token.is_empty() {
            return Err(ClientError::TokenUnavailable(
                "gcloud returned an empty token".to_string(),
            ));
        }

        debug!("Obtained access token from gcloud");
        Ok(Self(token))
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken(***)")
    }
}
