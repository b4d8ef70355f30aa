//! Workflow domain types
//!
//! The workflow document is a persisted/exchanged JSON format; field names
//! here are fixed by the wire format and must round-trip exactly.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::computer::{OsName, ScreenConfig};
use crate::error::SchemaError;

/// The only schema version this SDK understands
pub const SCHEMA_VERSION_V1: &str = "v1";

/// Declared type of a workflow input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    String,
    Number,
    Boolean,
    Date,
    List,
    File,
    Directory,
}

impl InputType {
    /// Wire name, used in error messages
    pub fn as_str(&self) -> &'static str {
        match self {
            InputType::String => "string",
            InputType::Number => "number",
            InputType::Boolean => "boolean",
            InputType::Date => "date",
            InputType::List => "list",
            InputType::File => "file",
            InputType::Directory => "directory",
        }
    }
}

/// File-picker filter attached to file inputs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileFilter {
    pub name: String,
    pub extensions: Vec<String>,
}

/// A single workflow input definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowInput {
    pub input_title: String,
    pub input_description: String,
    pub input_type: InputType,
    pub input_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_filters: Option<Vec<FileFilter>>,
    #[serde(default)]
    pub required: bool,
}

/// One step within a sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStep {
    pub title: String,
    pub actions: Vec<String>,
}

/// A named, ordered group of steps, individually reported on during a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowSequence {
    pub sequence_title: String,
    pub sequence_id: String,
    pub sequence_description: String,
    pub sequence_inputs: Vec<String>,
    pub steps: Vec<WorkflowStep>,
}

/// Execution instructions: prose plus orchestration directives
///
/// `code` entries of the form `run_sequence(id)` reference sequences by id
/// and override the default sequence order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowExecution {
    pub instructions: Vec<String>,
    pub code: Vec<String>,
}

/// Kind of execution target a workflow was authored against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComputerType {
    #[serde(rename = "localDesktop")]
    LocalDesktop,
    #[serde(rename = "remoteDesktop")]
    RemoteDesktop,
    #[serde(rename = "localVM")]
    LocalVm,
}

/// Target environment descriptor embedded in a workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowComputer {
    pub os: OsName,
    #[serde(rename = "computerName")]
    pub computer_name: String,
    #[serde(rename = "computerType")]
    pub computer_type: ComputerType,
    #[serde(rename = "ovaFilePath", default, skip_serializing_if = "Option::is_none")]
    pub ova_file_path: Option<String>,
    #[serde(rename = "screenConfig")]
    pub screen_config: ScreenConfig,
}

/// A structured automation definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    pub schema_version: String,
    pub workflow_computer: WorkflowComputer,
    pub workflow_title: String,
    pub workflow_description: String,
    pub workflow_inputs: Vec<WorkflowInput>,
    pub sequences: Vec<WorkflowSequence>,
    pub workflow_execution_instructions: WorkflowExecution,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<String>,
}

impl Workflow {
    /// Parses a workflow from an untyped JSON value
    ///
    /// Fails with a [`SchemaError`] naming the offending field when the
    /// schema version is unrecognized, a referenced sequence id is missing,
    /// input names collide, or a required field is absent.
    pub fn from_untyped(value: serde_json::Value) -> Result<Self, SchemaError> {
        let version = value
            .get("schema_version")
            .and_then(|v| v.as_str())
            .unwrap_or_default();
        if version != SCHEMA_VERSION_V1 {
            return Err(SchemaError::UnsupportedVersion {
                found: version.to_string(),
            });
        }

        let workflow: Workflow = serde_json::from_value(value)
            .map_err(|e| SchemaError::InvalidDocument(e.to_string()))?;
        workflow.validate()?;
        Ok(workflow)
    }

    /// Parses a workflow from a JSON string
    pub fn from_json_str(json: &str) -> Result<Self, SchemaError> {
        let value: serde_json::Value =
            serde_json::from_str(json).map_err(|e| SchemaError::InvalidDocument(e.to_string()))?;
        Self::from_untyped(value)
    }

    /// Parses a workflow from a JSON file on disk
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| SchemaError::Io {
            path: path.display().to_string(),
            detail: e.to_string(),
        })?;
        Self::from_json_str(&contents)
    }

    /// Serializes back to an untyped JSON value
    ///
    /// Round-trippable: `from_untyped(w.to_untyped())` yields an equal
    /// workflow, and re-serializing yields equal values.
    pub fn to_untyped(&self) -> Result<serde_json::Value, SchemaError> {
        serde_json::to_value(self).map_err(|e| SchemaError::InvalidDocument(e.to_string()))
    }

    /// Checks the document invariants that serde cannot express
    pub fn validate(&self) -> Result<(), SchemaError> {
        if self.schema_version != SCHEMA_VERSION_V1 {
            return Err(SchemaError::UnsupportedVersion {
                found: self.schema_version.clone(),
            });
        }

        let mut seen = HashSet::new();
        for input in &self.workflow_inputs {
            if !seen.insert(input.input_name.as_str()) {
                return Err(SchemaError::DuplicateInput {
                    name: input.input_name.clone(),
                });
            }
        }

        let sequence_ids: HashSet<&str> = self
            .sequences
            .iter()
            .map(|s| s.sequence_id.as_str())
            .collect();
        for directive in &self.workflow_execution_instructions.code {
            if let Some(sequence_id) = parse_run_sequence(directive)
                && !sequence_ids.contains(sequence_id)
            {
                return Err(SchemaError::UnknownSequence {
                    sequence_id: sequence_id.to_string(),
                });
            }
        }

        Ok(())
    }

    /// Looks up an input definition by name
    pub fn input(&self, name: &str) -> Option<&WorkflowInput> {
        self.workflow_inputs
            .iter()
            .find(|input| input.input_name == name)
    }
}

/// Extracts the sequence id from a `run_sequence(...)` directive
///
/// Accepts bare and quoted ids; returns None for directives that are not
/// sequence invocations.
pub fn parse_run_sequence(directive: &str) -> Option<&str> {
    let inner = directive
        .trim()
        .strip_prefix("run_sequence(")?
        .strip_suffix(')')?
        .trim();
    let inner = inner
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .or_else(|| inner.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')))
        .unwrap_or(inner);
    if inner.is_empty() { None } else { Some(inner) }
}

/// Summary information about a workflow returned when listing workflows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowSummary {
    pub workflow_id: String,
    pub title: String,
    pub description: String,
}
