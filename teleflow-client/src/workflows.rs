//! Workflow-related API endpoints

use serde::Deserialize;

use crate::error::Result;
use crate::{API_KEY_HEADER, TeleflowClient};
use teleflow_core::domain::{Workflow, WorkflowSummary};

/// Envelope around the workflow listing
#[derive(Debug, Deserialize)]
struct ListWorkflowsResponse {
    workflows: Vec<WorkflowSummary>,
}

impl TeleflowClient {
    // =============================================================================
    // Workflow Management
    // =============================================================================

    /// List all available workflows
    ///
    /// # Returns
    /// Summaries of every stored workflow
    pub async fn list_workflows(&self) -> Result<Vec<WorkflowSummary>> {
        let url = format!("{}/workflows", self.base_url());
        let response = self
            .http()
            .get(&url)
            .header(API_KEY_HEADER, self.api_key())
            .send()
            .await?;

        let listing: ListWorkflowsResponse = self.handle_response(response).await?;
        Ok(listing.workflows)
    }

    /// Get a specific workflow by ID
    ///
    /// # Arguments
    /// * `workflow_id` - The workflow identifier
    ///
    /// # Returns
    /// The full workflow document
    pub async fn get_workflow(&self, workflow_id: &str) -> Result<Workflow> {
        let url = format!("{}/workflows/{}", self.base_url(), workflow_id);
        let response = self
            .http()
            .get(&url)
            .header(API_KEY_HEADER, self.api_key())
            .send()
            .await?;

        let workflow: Workflow = self.handle_response(response).await?;
        workflow.validate()?;
        Ok(workflow)
    }

    /// Save a workflow
    ///
    /// Not retried internally: the backend does not guarantee idempotency
    /// for saves.
    ///
    /// # Arguments
    /// * `workflow` - The workflow document to store
    ///
    /// # Returns
    /// A summary of the stored workflow
    pub async fn save_workflow(&self, workflow: &Workflow) -> Result<WorkflowSummary> {
        let url = format!("{}/workflows", self.base_url());
        let response = self
            .http()
            .post(&url)
            .header(API_KEY_HEADER, self.api_key())
            .json(workflow)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Delete a workflow by ID
    ///
    /// Idempotent: deleting an already-deleted workflow returns `false`
    /// rather than failing.
    pub async fn delete_workflow(&self, workflow_id: &str) -> Result<bool> {
        let url = format!("{}/workflows/{}", self.base_url(), workflow_id);
        let response = self
            .http()
            .delete(&url)
            .header(API_KEY_HEADER, self.api_key())
            .send()
            .await?;

        crate::computers::delete_outcome(self, response).await
    }
}
