//! Shipcheck HTTP Client
//!
//! A small, typed client for the cloud build REST API.
//!
//! Only the read side of the API is covered: the harness observes builds
//! started by a trigger, it never starts or cancels them.
//!
//! # Example
//!
//! ```no_run
//! use shipcheck_client::{AccessToken, CloudBuildClient};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let token = AccessToken::resolve().await?;
//!     let client = CloudBuildClient::new(shipcheck_client::DEFAULT_BASE_URL).with_token(token);
//!
//!     let builds = client.list_builds_for_trigger("my-project", "my-trigger").await?;
//!     println!("Found {} build(s)", builds.len());
//!     Ok(())
//! }
//! ```

mod builds;
pub mod error;
mod query;
mod token;

// Re-export commonly used types
pub use error::{ClientError, Result};
pub use query::BuildQuery;
pub use shipcheck_core::domain::build::{Build, BuildStatus};
pub use token::AccessToken;

use reqwest::Client;
use serde::de::DeserializeOwned;

/// Public endpoint of the cloud build API
pub const DEFAULT_BASE_URL: &str = "https://cloudbuild.googleapis.com";

/// HTTP client for the cloud build API
#[derive(Debug, Clone)]
pub struct CloudBuildClient {
    /// Base URL of the API (e.g., "https://cloudbuild.googleapis.com")
    base_url: String,
    /// HTTP client instance
    client: Client,
    /// Bearer token sent with every request
    token: Option<AccessToken>,
}

impl CloudBuildClient {
    /// Create a new client without credentials
    ///
    /// # Arguments
    /// * `base_url` - The base URL of the build API
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a new client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            token: None,
        }
    }

    /// Attach a bearer token to all subsequent requests
    pub fn with_token(mut self, token: AccessToken) -> Self {
        self.token = Some(token);
        self
    }

    /// Get the base URL of the API
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build a GET request, adding the bearer token if one is set
    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        let request = self.client.get(url);
        match &self.token {
            Some(token) => request.bearer_auth(token.secret()),
            None => request,
        }
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Handle an API response and deserialize JSON
    ///
    /// This method checks the status code and returns an appropriate error if
    /// the request failed, or deserializes the response body if successful.
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }
}
