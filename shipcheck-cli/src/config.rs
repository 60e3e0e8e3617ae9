//! Configuration module
//!
//! Handles CLI configuration and builds the API client from it.

use anyhow::{Context, Result};
use shipcheck_client::{AccessToken, CloudBuildClient};

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the cloud build API
    pub build_api_url: String,
}

impl Config {
    /// Creates an authenticated build API client
    ///
    /// The access token comes from `GOOGLE_OAUTH_ACCESS_TOKEN` or, failing
    /// that, from the gcloud CLI.
    pub async fn build_client(&self) -> Result<CloudBuildClient> {
        let token = AccessToken::resolve()
            .await
            .context("Failed to obtain an access token for the build API")?;
        Ok(CloudBuildClient::new(&self.build_api_url).with_token(token))
    }
}
