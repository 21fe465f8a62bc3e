//! Backstop TSM Client
//!
//! A small, typed HTTP client for the TSM asynchronous job API, plus the
//! poller that follows a job until it reaches a terminal status.
//!
//! # Example
//!
//! ```no_run
//! use backstop_client::TsmClient;
//! use backstop_core::dto::auth::Credentials;
//! use backstop_core::dto::job::BackupRequest;
//!
//! # async fn example() -> backstop_client::Result<()> {
//! let client = TsmClient::new("https://tableau.local:8850", "0.5")?;
//! client.login(&Credentials::new("admin", "secret")).await?;
//!
//! let job_id = client.start_backup(&BackupRequest::default()).await?;
//! println!("Started job: {}", job_id);
//! # Ok(())
//! # }
//! ```

mod auth;
pub mod error;
mod jobs;
pub mod poller;

// Re-export commonly used types
pub use error::{ClientError, Result};
pub use jobs::backup_name;
pub use poller::{JobPoller, JobSource, PollError, ProgressMark, ProgressObserver};

use backstop_core::config::TsmSettings;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::{debug, error};

/// HTTP client for the TSM job API
///
/// All calls are single-attempt. The underlying client keeps a cookie
/// store, so the session established by [`TsmClient::login`] is reused by
/// every later call on the same instance.
#[derive(Debug, Clone)]
pub struct TsmClient {
    /// Server URL including port (e.g., "https://tableau.local:8850")
    base_url: String,
    /// API version path segment (e.g., "0.5")
    api_version: String,
    /// HTTP client instance
    client: Client,
}

impl TsmClient {
    /// Create a new client with a session cookie store
    ///
    /// # Arguments
    /// * `base_url` - Server URL including the port
    /// * `api_version` - API version used in the `/api/{version}` prefix
    pub fn new(base_url: impl Into<String>, api_version: impl Into<String>) -> Result<Self> {
        let client = Client::builder().cookie_store(true).build()?;
        Ok(Self::with_client(base_url, api_version, client))
    }

    /// Create a client from the `tsm` configuration section
    ///
    /// Certificate verification follows `verify_certificates`.
    pub fn from_settings(settings: &TsmSettings) -> Result<Self> {
        let client = Client::builder()
            .cookie_store(true)
            .danger_accept_invalid_certs(!settings.verify_certificates)
            .build()?;

        debug!(
            "base_url: \"{}\", api_version: \"{}\"",
            settings.base_url(),
            settings.api_version
        );
        Ok(Self::with_client(
            settings.base_url(),
            settings.api_version.clone(),
            client,
        ))
    }

    /// Create a new client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    /// The client needs a cookie store for the login session to stick.
    pub fn with_client(
        base_url: impl Into<String>,
        api_version: impl Into<String>,
        client: Client,
    ) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_version: api_version.into(),
            client,
        }
    }

    /// Get the server URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full URL of an API endpoint
    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/{}/{}", self.base_url, self.api_version, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = self.endpoint(path);
        debug!("{} \"{}\"", method, url);
        self.client.request(method, url)
    }

    /// Sends a request, logging transport failures
    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response> {
        request.send().await.map_err(|e| {
            error!("request failed: {}", e);
            ClientError::Transport(e)
        })
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Handle an API response and deserialize JSON
    ///
    /// Non-2xx answers are logged with their status code and body, then
    /// returned as [`ClientError::Api`].
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let response = Self::check_status(response).await?;

        response
            .json()
            .await
            .map_err(|e| ClientError::Decode(format!("Failed to parse JSON response: {}", e)))
    }

    /// Handle an API response whose body is ignored
    async fn handle_empty_response(&self, response: reqwest::Response) -> Result<()> {
        Self::check_status(response).await?;
        debug!("success");
        Ok(())
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!("status code: {}, text: {}", status.as_u16(), error_text);
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        Ok(response)
    }
}
