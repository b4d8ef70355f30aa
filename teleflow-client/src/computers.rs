//! Computer lifecycle and file-transfer endpoints

use std::path::Path;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ClientError, Result};
use crate::{API_KEY_HEADER, TeleflowClient, archive};
use teleflow_core::domain::{
    Computer, ComputerConfig, DownloadedFile, GetComputerDetails, ListedComputer, UploadedFile,
};

/// Default cap on download size: 10 MiB
pub const DEFAULT_MAX_DOWNLOAD_BYTES: u64 = 10 * 1024 * 1024;

#[derive(Debug, Serialize)]
struct StartComputerRequest<'a> {
    config: &'a ComputerConfig,
    vnc_requires_auth: bool,
    vnc_view_only: bool,
}

#[derive(Debug, Deserialize)]
struct StartComputerResponse {
    computer: Computer,
}

#[derive(Debug, Deserialize)]
struct ListComputersResponse {
    computers: Vec<ListedComputer>,
}

/// Liveness report for a computer
#[derive(Debug, Clone, Deserialize)]
pub struct ComputerStatusResponse {
    pub computer_id: String,
    pub is_running: bool,
}

#[derive(Debug, Serialize)]
struct UploadDataToFileRequest<'a> {
    file_path: &'a str,
    contents: String,
}

#[derive(Debug, Deserialize)]
struct UploadFileResponse {
    result: UploadedFile,
}

#[derive(Debug, Serialize)]
struct DownloadFileRequest<'a> {
    remote_path: &'a str,
    is_dir: bool,
    max_size_bytes: u64,
}

#[derive(Debug, Deserialize)]
struct DownloadFileResponse {
    result: DownloadedFile,
}

/// Maps a delete response to the idempotent bool contract:
/// 2xx deleted, 404 already gone, anything else is an error.
pub(crate) async fn delete_outcome(
    client: &TeleflowClient,
    response: reqwest::Response,
) -> Result<bool> {
    let status = response.status();
    if status.as_u16() == 404 {
        return Ok(false);
    }
    client.handle_empty_response(response).await?;
    Ok(true)
}

impl TeleflowClient {
    // =============================================================================
    // Computer Lifecycle
    // =============================================================================

    /// Start a new remote computer with the given configuration
    ///
    /// Returns once the backend acknowledges creation, which may be before
    /// the computer reaches `running`; poll [`Self::computer_status`] or
    /// let the run streamer wait for readiness.
    ///
    /// # Arguments
    /// * `config` - Screen and OS configuration for the computer
    ///
    /// # Returns
    /// The provisioned computer with its connection details
    pub async fn start_computer(&self, config: ComputerConfig) -> Result<Computer> {
        let url = format!("{}/computers/", self.base_url());
        let response = self
            .http()
            .post(&url)
            .header(API_KEY_HEADER, self.api_key())
            .json(&StartComputerRequest {
                config: &config,
                vnc_requires_auth: false,
                vnc_view_only: false,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::Provision(format!(
                "backend rejected provisioning (status {}): {}",
                status.as_u16(),
                message
            )));
        }

        let started: StartComputerResponse = response
            .json()
            .await
            .map_err(|e| ClientError::Parse(format!("Failed to parse JSON response: {}", e)))?;
        started.computer.validate()?;
        info!(computer_id = %started.computer.computer_id, "computer started");
        Ok(started.computer)
    }

    /// Get detailed information about a computer by ID
    pub async fn get_computer(&self, computer_id: &str) -> Result<GetComputerDetails> {
        let url = format!("{}/computers/{}/", self.base_url(), computer_id);
        let response = self
            .http()
            .get(&url)
            .header(API_KEY_HEADER, self.api_key())
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// List all computers owned by the caller
    pub async fn list_computers(&self) -> Result<Vec<ListedComputer>> {
        let url = format!("{}/computers/", self.base_url());
        let response = self
            .http()
            .get(&url)
            .header(API_KEY_HEADER, self.api_key())
            .send()
            .await?;

        let listing: ListComputersResponse = self.handle_response(response).await?;
        Ok(listing.computers)
    }

    /// Delete a computer by ID
    ///
    /// Idempotent: the first delete returns `true`, deleting an
    /// already-deleted id returns `false`, never an error. Any run stream
    /// still open against the computer terminates with a fatal error
    /// message; deletion is not blocked by open streams.
    pub async fn delete_computer(&self, computer_id: &str) -> Result<bool> {
        let url = format!("{}/computers/{}", self.base_url(), computer_id);
        let response = self
            .http()
            .delete(&url)
            .header(API_KEY_HEADER, self.api_key())
            .send()
            .await?;

        let deleted = delete_outcome(self, response).await?;
        info!(computer_id, deleted, "computer delete");
        Ok(deleted)
    }

    /// Check whether a computer is running
    pub async fn computer_status(&self, computer_id: &str) -> Result<ComputerStatusResponse> {
        let url = format!("{}/computers/{}/status", self.base_url(), computer_id);
        let response = self
            .http()
            .get(&url)
            .header(API_KEY_HEADER, self.api_key())
            .send()
            .await?;

        self.handle_response(response).await
    }

    // =============================================================================
    // File Transfer
    // =============================================================================

    /// Upload a local file to a path on the computer
    ///
    /// # Arguments
    /// * `computer_id` - The target computer
    /// * `local_path` - File on the local filesystem to read
    /// * `remote_path` - Where to write it on the computer
    pub async fn upload_file(
        &self,
        computer_id: &str,
        local_path: impl AsRef<Path>,
        remote_path: &str,
    ) -> Result<UploadedFile> {
        let bytes = tokio::fs::read(local_path.as_ref()).await?;
        self.upload_bytes(computer_id, remote_path, &bytes).await
    }

    /// Upload a local directory to the computer as a tar.gz archive
    ///
    /// The archive is written to `remote_path` as a single file; extracting
    /// it on the computer is the workflow's responsibility.
    pub async fn upload_dir(
        &self,
        computer_id: &str,
        local_dir: impl AsRef<Path>,
        remote_path: &str,
    ) -> Result<UploadedFile> {
        let bytes = archive::pack_dir(local_dir.as_ref())?;
        self.upload_bytes(computer_id, remote_path, &bytes).await
    }

    /// Upload raw bytes to a file on the computer
    pub async fn upload_bytes(
        &self,
        computer_id: &str,
        remote_path: &str,
        bytes: &[u8],
    ) -> Result<UploadedFile> {
        let url = format!("{}/computers/{}/upload", self.base_url(), computer_id);
        let response = self
            .http()
            .post(&url)
            .header(API_KEY_HEADER, self.api_key())
            .json(&UploadDataToFileRequest {
                file_path: remote_path,
                contents: BASE64.encode(bytes),
            })
            .send()
            .await?;

        let uploaded: UploadFileResponse = self.handle_response(response).await?;
        Ok(uploaded.result)
    }

    /// Download a file or directory from the computer
    ///
    /// Directories (`is_dir = true`) always arrive as a tar.gz archive and
    /// must be materialized with [`Self::extract_downloaded_archive`];
    /// single files are raw bytes.
    ///
    /// # Arguments
    /// * `computer_id` - The source computer
    /// * `remote_path` - Path on the computer
    /// * `is_dir` - Whether `remote_path` names a directory
    pub async fn download_file(
        &self,
        computer_id: &str,
        remote_path: &str,
        is_dir: bool,
    ) -> Result<DownloadedFile> {
        self.download_file_with_limit(computer_id, remote_path, is_dir, DEFAULT_MAX_DOWNLOAD_BYTES)
            .await
    }

    /// Download with an explicit size cap in bytes
    pub async fn download_file_with_limit(
        &self,
        computer_id: &str,
        remote_path: &str,
        is_dir: bool,
        max_size_bytes: u64,
    ) -> Result<DownloadedFile> {
        let url = format!("{}/computers/{}/download", self.base_url(), computer_id);
        let response = self
            .http()
            .post(&url)
            .header(API_KEY_HEADER, self.api_key())
            .json(&DownloadFileRequest {
                remote_path,
                is_dir,
                max_size_bytes,
            })
            .send()
            .await?;

        let downloaded: DownloadFileResponse = self.handle_response(response).await?;
        Ok(downloaded.result)
    }

    /// Write downloaded bytes to a local path, verbatim
    ///
    /// No implicit decompression: a directory download saved this way is
    /// the tar.gz archive itself.
    pub async fn save_downloaded_content(
        &self,
        downloaded: &DownloadedFile,
        out_path: impl AsRef<Path>,
    ) -> Result<()> {
        let bytes = BASE64
            .decode(&downloaded.contents)
            .map_err(|e| ClientError::Parse(format!("invalid base64 contents: {e}")))?;
        tokio::fs::write(out_path.as_ref(), bytes).await?;
        Ok(())
    }

    /// Materialize a downloaded directory archive under `out_dir`
    ///
    /// Fails with [`ClientError::InvalidRequest`] when called on a
    /// single-file download.
    pub async fn extract_downloaded_archive(
        &self,
        downloaded: &DownloadedFile,
        out_dir: impl AsRef<Path>,
    ) -> Result<()> {
        if !downloaded.is_dir {
            return Err(ClientError::InvalidRequest(
                "download is a single file, not a directory archive".to_string(),
            ));
        }
        let bytes = BASE64
            .decode(&downloaded.contents)
            .map_err(|e| ClientError::Parse(format!("invalid base64 contents: {e}")))?;
        archive::unpack_archive(&bytes, out_dir.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ClientConfig, TeleflowClient};

    fn client() -> TeleflowClient {
        TeleflowClient::new(ClientConfig {
            base_url: "http://localhost:8765".to_string(),
            api_key: "test-key".to_string(),
        })
    }

    fn response_with_status(status: u16) -> reqwest::Response {
        reqwest::Response::from(
            http::Response::builder()
                .status(status)
                .body("a body")
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_delete_outcome_is_idempotent() {
        // First delete succeeds, deleting an already-deleted id reports
        // false, anything else is a real error.
        assert!(delete_outcome(&client(), response_with_status(200))
            .await
            .unwrap());
        assert!(!delete_outcome(&client(), response_with_status(404))
            .await
            .unwrap());

        let err = delete_outcome(&client(), response_with_status(500))
            .await
            .unwrap_err();
        assert!(err.is_server_error());
        let err = delete_outcome(&client(), response_with_status(403))
            .await
            .unwrap_err();
        assert!(err.is_client_error());
    }

    fn downloaded(contents: &[u8], is_dir: bool) -> DownloadedFile {
        DownloadedFile {
            computer_id: "c-1".to_string(),
            file_path: "/home/user/data".to_string(),
            contents: BASE64.encode(contents),
            is_dir,
        }
    }

    #[tokio::test]
    async fn test_save_downloaded_content_writes_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("report.md");
        let body = b"# Findings\n\nAll good.\n";

        client()
            .save_downloaded_content(&downloaded(body, false), &out)
            .await
            .unwrap();

        assert_eq!(std::fs::read(&out).unwrap(), body);
    }

    #[tokio::test]
    async fn test_save_rejects_invalid_base64() {
        let dir = tempfile::tempdir().unwrap();
        let mut bad = downloaded(b"x", false);
        bad.contents = "!!not base64!!".to_string();

        let err = client()
            .save_downloaded_content(&bad, dir.path().join("out"))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Parse(_)));
    }

    #[tokio::test]
    async fn test_extract_refuses_single_file_download() {
        let dir = tempfile::tempdir().unwrap();
        let err = client()
            .extract_downloaded_archive(&downloaded(b"raw bytes", false), dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_directory_download_round_trip() {
        let src = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(src.path().join("docs")).unwrap();
        std::fs::write(src.path().join("readme.txt"), b"hello").unwrap();
        std::fs::write(src.path().join("docs/note.md"), b"# note").unwrap();

        // Pack locally to simulate what the backend streams for a directory.
        let archive_bytes = crate::archive::pack_dir(src.path()).unwrap();
        let payload = downloaded(&archive_bytes, true);

        let out = tempfile::tempdir().unwrap();
        client()
            .extract_downloaded_archive(&payload, out.path())
            .await
            .unwrap();

        assert_eq!(std::fs::read(out.path().join("readme.txt")).unwrap(), b"hello");
        assert_eq!(std::fs::read(out.path().join("docs/note.md")).unwrap(), b"# note");
    }
}
