//! Run orchestration
//!
//! Ties input validation, transport selection, and terminal-event
//! enforcement into the one public streaming entry point.

use std::collections::HashMap;
use std::pin::Pin;

use futures::Stream;
use tracing::info;

use crate::TeleflowClient;
use crate::error::Result;
use crate::streaming::ensure_terminal;
use crate::transport::RunTransport;
use teleflow_core::RunMessage;
use teleflow_core::domain::{Computer, Workflow};
use teleflow_core::validate::validate_user_inputs;

/// A stream of run progress messages
///
/// Yields messages in arrival order and always ends with exactly one
/// terminal event. Dropping the stream closes the underlying channel,
/// which is the only cancellation mechanism; the run on the backend may
/// keep going.
pub type RunStream = Pin<Box<dyn Stream<Item = RunMessage> + Send>>;

pub(crate) async fn open_run(
    transport: &dyn RunTransport,
    computer: &Computer,
    workflow: &Workflow,
    user_inputs: HashMap<String, serde_json::Value>,
) -> Result<RunStream> {
    // Fail before any network effect: a rejected input map must not
    // leave a half-started run behind.
    let resolved = validate_user_inputs(workflow, &user_inputs)?;

    let raw = transport
        .open_run_stream(computer, workflow, &resolved)
        .await?;
    info!(
        workflow = %workflow.workflow_title,
        computer_id = %computer.computer_id,
        "run stream opened"
    );
    Ok(ensure_terminal(raw))
}

impl TeleflowClient {
    // =============================================================================
    // Run Streaming
    // =============================================================================

    /// Execute a workflow on a computer, streaming progress messages
    ///
    /// Inputs are validated against the workflow's input definitions and
    /// defaults are applied before anything is sent. The transport is
    /// chosen by the computer's origin: computers from `start_computer`
    /// stream over the API, computers from [`crate::LocalConnector`]
    /// stream over a direct WebSocket.
    ///
    /// # Arguments
    /// * `computer` - The execution target
    /// * `workflow` - The workflow to run
    /// * `user_inputs` - Values for the workflow's declared inputs
    ///
    /// # Returns
    /// A [`RunStream`] ending with exactly one terminal event
    pub async fn astream(
        &self,
        computer: &Computer,
        workflow: &Workflow,
        user_inputs: HashMap<String, serde_json::Value>,
    ) -> Result<RunStream> {
        let transport = self.transport_for(computer);
        open_run(transport.as_ref(), computer, workflow, user_inputs).await
    }
}
