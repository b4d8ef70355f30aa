//! Run message taxonomy
//!
//! The typed progress events streamed while a workflow executes. A run
//! stream contains exactly one `run_started` first, any number of
//! `sequence_status`/`assistant`/`error` events interleaved, and exactly
//! one terminal event (`run_completed` or a fatal `error`) last.

use serde::{Deserialize, Serialize};

fn default_completed_content() -> String {
    "Workflow completed successfully".to_string()
}

/// A progress event emitted during a workflow run
///
/// Discriminated on the wire by the `type` field. Decoded once at the
/// transport boundary via [`RunMessage::decode`] and matched exhaustively
/// thereafter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunMessage {
    /// The run has started
    RunStarted {
        /// Run identifier, when the backend assigns one
        #[serde(default, skip_serializing_if = "Option::is_none")]
        run_id: Option<String>,
    },
    /// A sequence finished, successfully or not
    SequenceStatus {
        sequence_id: String,
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    /// Content produced by the automation agent during execution
    Assistant { content: serde_json::Value },
    /// An error occurred; fatal errors terminate the stream
    Error {
        error: String,
        #[serde(default)]
        fatal: bool,
    },
    /// The run completed successfully; always the last event
    RunCompleted {
        #[serde(default = "default_completed_content")]
        content: String,
    },
}

impl RunMessage {
    /// Decodes one wire frame
    ///
    /// Unknown discriminants and malformed frames decode to a non-fatal
    /// [`RunMessage::Error`] instead of aborting the stream, so newer
    /// backends can add message kinds without breaking older clients.
    pub fn decode(frame: &str) -> RunMessage {
        serde_json::from_str(frame).unwrap_or_else(|e| RunMessage::Error {
            error: format!("failed to decode message: {e}: {frame}"),
            fatal: false,
        })
    }

    /// A fatal error message, used as a synthetic stream terminus
    pub fn fatal_error(error: impl Into<String>) -> RunMessage {
        RunMessage::Error {
            error: error.into(),
            fatal: true,
        }
    }

    /// A successful completion marker with the standard content
    pub fn completed() -> RunMessage {
        RunMessage::RunCompleted {
            content: default_completed_content(),
        }
    }

    /// Whether this message ends the stream
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunMessage::RunCompleted { .. } | RunMessage::Error { fatal: true, .. }
        )
    }
}
