//! Teleflow API Client
//!
//! A type-safe client for the Teleflow computer-automation API.
//!
//! The client drives remote computers through their provisioning lifecycle,
//! manages stored workflows, and streams workflow runs as typed progress
//! messages. A local connector covers directly-addressed VMs with the same
//! message taxonomy.
//!
//! # Example
//!
//! ```no_run
//! use futures::StreamExt;
//! use teleflow_client::{ClientConfig, TeleflowClient};
//! use teleflow_core::domain::ComputerConfig;
//! use teleflow_core::domain::Workflow;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = TeleflowClient::new(ClientConfig {
//!         base_url: "http://localhost:8765".to_string(),
//!         api_key: "secret".to_string(),
//!     });
//!
//!     let computer = client.start_computer(ComputerConfig::default()).await?;
//!     let workflow = Workflow::from_json_file("workflows/research.json")?;
//!
//!     let mut stream = client
//!         .astream(&computer, &workflow, Default::default())
//!         .await?;
//!     while let Some(message) = stream.next().await {
//!         println!("{message:?}");
//!     }
//!     Ok(())
//! }
//! ```

pub mod archive;
mod computers;
pub mod error;
pub mod local;
mod run;
mod streaming;
pub mod transport;
mod workflows;

// Re-export commonly used types
pub use computers::{ComputerStatusResponse, DEFAULT_MAX_DOWNLOAD_BYTES};
pub use error::{ClientError, Result};
pub use local::LocalConnector;
pub use run::RunStream;
pub use teleflow_core::RunMessage;
pub use teleflow_core::domain::{Computer, ComputerConfig};

use reqwest::Client;
use serde::de::DeserializeOwned;

/// Header carrying the API credential on every call
pub(crate) const API_KEY_HEADER: &str = "X-API-Key";

/// Configuration for a [`TeleflowClient`]
///
/// Credentials are passed explicitly at construction; the core never
/// performs an implicit process-wide lookup.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the Teleflow API (e.g., "http://localhost:8765")
    pub base_url: String,
    /// Opaque API key attached to every call
    pub api_key: String,
}

impl ClientConfig {
    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - TELEFLOW_BASE_URL (required)
    /// - TELEFLOW_API_KEY (required)
    pub fn from_env() -> anyhow::Result<Self> {
        let base_url = std::env::var("TELEFLOW_BASE_URL")
            .map_err(|_| anyhow::anyhow!("TELEFLOW_BASE_URL environment variable not set"))?;
        let api_key = std::env::var("TELEFLOW_API_KEY")
            .map_err(|_| anyhow::anyhow!("TELEFLOW_API_KEY environment variable not set"))?;
        Ok(Self { base_url, api_key })
    }
}

/// Client for the Teleflow API
///
/// Provides methods for all API surfaces, organized into logical groups:
/// - Workflow management (list, get, save, delete)
/// - Computer lifecycle (start, get, list, delete, status)
/// - File transfer (upload, download, archive pack/extract)
/// - Run streaming (astream)
#[derive(Debug, Clone)]
pub struct TeleflowClient {
    /// Base URL of the API, without trailing slash
    base_url: String,
    /// API key sent with every request
    api_key: String,
    /// HTTP client instance
    http: Client,
}

impl TeleflowClient {
    /// Creates a new client
    ///
    /// # Example
    /// ```
    /// use teleflow_client::{ClientConfig, TeleflowClient};
    ///
    /// let client = TeleflowClient::new(ClientConfig {
    ///     base_url: "http://localhost:8765".to_string(),
    ///     api_key: "secret".to_string(),
    /// });
    /// ```
    pub fn new(config: ClientConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key,
            http: Client::new(),
        }
    }

    /// Creates a new client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    ///
    /// # Example
    /// ```
    /// use teleflow_client::{ClientConfig, TeleflowClient};
    /// use reqwest::Client;
    /// use std::time::Duration;
    ///
    /// let http = Client::builder()
    ///     .connect_timeout(Duration::from_secs(30))
    ///     .build()
    ///     .unwrap();
    ///
    /// let client = TeleflowClient::with_client(
    ///     ClientConfig {
    ///         base_url: "http://localhost:8765".to_string(),
    ///         api_key: "secret".to_string(),
    ///     },
    ///     http,
    /// );
    /// ```
    pub fn with_client(config: ClientConfig, http: Client) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key,
            http,
        }
    }

    /// Get the base URL of the API
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn http(&self) -> &Client {
        &self.http
    }

    pub(crate) fn api_key(&self) -> &str {
        &self.api_key
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Handle an API response and deserialize JSON
    ///
    /// Checks the status code and returns an appropriate error if the
    /// request failed, or deserializes the response body if successful.
    pub(crate) async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
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
            .map_err(|e| ClientError::Parse(format!("Failed to parse JSON response: {}", e)))
    }

    /// Handle an API response whose body is irrelevant (e.g. DELETE)
    pub(crate) async fn handle_empty_response(&self, response: reqwest::Response) -> Result<()> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        Ok(())
    }
}
