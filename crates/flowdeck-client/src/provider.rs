//! The API surface flowdeck consumes.

use flowdeck_core::{
    ArtifactId, ArtifactResult, DagLayout, DagResultId, OperatorId, OperatorResult, Result,
    RunParameters, WorkflowId, WorkflowSnapshot, WorkflowUpdate,
};

use crate::request::PositioningRequest;

/// Core trait for workflow API access.
///
/// Implement this trait to back flowdeck with a different transport or with
/// canned data.
#[async_trait::async_trait]
pub trait DagProvider: Send + Sync {
    /// Fetches every DAG version and run of a workflow.
    async fn get_workflow(&self, workflow_id: WorkflowId) -> Result<WorkflowSnapshot>;

    /// Fetches an artifact's value for one run.
    async fn get_artifact_result(
        &self,
        dag_result_id: DagResultId,
        artifact_id: ArtifactId,
    ) -> Result<ArtifactResult>;

    /// Fetches an operator's outcome for one run.
    async fn get_operator_result(
        &self,
        dag_result_id: DagResultId,
        operator_id: OperatorId,
    ) -> Result<OperatorResult>;

    /// Asks the backend to lay out a DAG.
    async fn get_positions(&self, request: &PositioningRequest) -> Result<DagLayout>;

    /// Triggers a new run, optionally overriding parameters.
    async fn trigger_run(&self, workflow_id: WorkflowId, parameters: &RunParameters)
    -> Result<()>;

    /// Updates workflow settings.
    async fn edit_workflow(&self, workflow_id: WorkflowId, update: &WorkflowUpdate) -> Result<()>;

    /// Deletes a workflow.
    async fn delete_workflow(&self, workflow_id: WorkflowId) -> Result<()>;
}
