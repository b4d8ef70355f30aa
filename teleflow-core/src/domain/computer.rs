//! Computer domain types

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;

/// Operating systems supported by the platform
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OsName {
    #[default]
    Linux,
    Darwin,
    Win32,
}

/// Screen configuration for an execution target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenConfig {
    pub width: u32,
    pub height: u32,
    pub display_num: u32,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            width: 1440,
            height: 900,
            display_num: 0,
        }
    }
}

/// Configuration for a computer, sent as-is to the backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComputerConfig {
    pub screen: ScreenConfig,
    #[serde(default)]
    pub os_name: OsName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_browser: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installed_apps: Option<Vec<String>>,
}

/// Lifecycle status of a computer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComputerStatus {
    #[default]
    Starting,
    Running,
    Stopped,
    Error,
}

/// Where a computer handle came from
///
/// Routing state only: selects the transport used for runs against this
/// computer. Never serialized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ComputerOrigin {
    /// Provisioned through the managed backend
    #[default]
    Remote,
    /// Directly addressed local VM
    Local,
}

/// A provisioned or directly addressed execution environment
///
/// Created by the lifecycle manager's `start` or the local connector's
/// `connect`; destroyed only by an explicit `delete` or VM teardown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Computer {
    pub computer_id: String,
    pub config: ComputerConfig,
    /// Endpoint of the in-target tool server, without trailing slash
    pub tool_server_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vnc_url: Option<String>,
    #[serde(default)]
    pub status: ComputerStatus,
    #[serde(skip)]
    pub origin: ComputerOrigin,
}

impl Computer {
    /// Checks wire-format constraints the backend enforces
    pub fn validate(&self) -> Result<(), SchemaError> {
        if self.tool_server_url.ends_with('/') {
            return Err(SchemaError::InvalidField {
                field: "tool_server_url".to_string(),
                detail: "must not have a trailing slash".to_string(),
            });
        }
        Ok(())
    }
}

/// Entry returned when listing computers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListedComputer {
    pub computer_id: String,
}

/// Detailed information about a single computer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetComputerDetails {
    pub computer_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_at: Option<String>,
}

/// Result of uploading data to a file on a computer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadedFile {
    pub computer_id: String,
    pub file_path: String,
}

/// Bytes downloaded from a computer
///
/// `contents` is base64 on the wire. For directory downloads (`is_dir`)
/// the bytes are always a tar.gz archive; single files are the raw bytes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadedFile {
    pub computer_id: String,
    pub file_path: String,
    pub contents: String,
    #[serde(default)]
    pub is_dir: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_names() {
        assert_eq!(
            serde_json::to_string(&ComputerStatus::Running).unwrap(),
            "\"running\""
        );
        let status: ComputerStatus = serde_json::from_str("\"stopped\"").unwrap();
        assert_eq!(status, ComputerStatus::Stopped);
    }

    #[test]
    fn test_computer_defaults_on_deserialize() {
        let computer: Computer = serde_json::from_str(
            r#"{
                "computer_id": "c-1",
                "config": {"screen": {"width": 1440, "height": 900, "display_num": 0}},
                "tool_server_url": "http://10.0.0.5:3333"
            }"#,
        )
        .unwrap();
        assert_eq!(computer.status, ComputerStatus::Starting);
        assert_eq!(computer.origin, ComputerOrigin::Remote);
        assert_eq!(computer.config.os_name, OsName::Linux);
        assert!(computer.validate().is_ok());
    }

    #[test]
    fn test_trailing_slash_rejected() {
        let computer = Computer {
            computer_id: "c-1".to_string(),
            config: ComputerConfig::default(),
            tool_server_url: "http://10.0.0.5:3333/".to_string(),
            vnc_url: None,
            status: ComputerStatus::Running,
            origin: ComputerOrigin::Remote,
        };
        assert!(computer.validate().is_err());
    }

    #[test]
    fn test_origin_is_not_serialized() {
        let computer = Computer {
            computer_id: "c-1".to_string(),
            config: ComputerConfig::default(),
            tool_server_url: "http://localhost:3333".to_string(),
            vnc_url: None,
            status: ComputerStatus::Running,
            origin: ComputerOrigin::Local,
        };
        let value = serde_json::to_value(&computer).unwrap();
        assert!(value.get("origin").is_none());
    }
}
