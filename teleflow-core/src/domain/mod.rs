//! Core domain types
//!
//! Value objects shared between the client and the backend wire formats.
//! Workflow documents and computer handles are defined here; neither type
//! performs any I/O.

pub mod computer;
pub mod workflow;

pub use computer::{
    Computer, ComputerConfig, ComputerOrigin, ComputerStatus, DownloadedFile, GetComputerDetails,
    ListedComputer, OsName, ScreenConfig, UploadedFile,
};
pub use workflow::{
    ComputerType, FileFilter, InputType, Workflow, WorkflowComputer, WorkflowExecution,
    WorkflowInput, WorkflowSequence, WorkflowStep, WorkflowSummary,
};
