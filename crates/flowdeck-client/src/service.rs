//! DAG service wrapper with observability.
//!
//! Wraps any [`DagProvider`] and adds structured logging with request
//! timings, so callers hold one cloneable handle regardless of transport.

use std::sync::Arc;
use std::time::Instant;

use flowdeck_core::{
    ArtifactId, ArtifactResult, DagLayout, DagResultId, OperatorId, OperatorResult, Result,
    RunParameters, WorkflowDag, WorkflowId, WorkflowSnapshot, WorkflowUpdate,
};

use crate::TRACING_TARGET;
use crate::provider::DagProvider;
use crate::request::PositioningRequest;

/// DAG service wrapper with observability.
///
/// The inner provider is wrapped in `Arc` for cheap cloning.
#[derive(Clone)]
pub struct DagService {
    inner: Arc<dyn DagProvider>,
}

impl std::fmt::Debug for DagService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DagService").finish_non_exhaustive()
    }
}

/// Logs the outcome of one provider call.
fn log_outcome<T>(operation: &'static str, start: Instant, result: &Result<T>) {
    let elapsed = start.elapsed();
    match result {
        Ok(_) => {
            tracing::debug!(
                target: TRACING_TARGET,
                operation,
                elapsed_ms = elapsed.as_millis(),
                "API call successful"
            );
        }
        Err(error) => {
            tracing::warn!(
                target: TRACING_TARGET,
                operation,
                error = %error,
                elapsed_ms = elapsed.as_millis(),
                "API call failed"
            );
        }
    }
}

impl DagService {
    /// Creates a new service wrapper.
    pub fn new<P>(provider: P) -> Self
    where
        P: DagProvider + 'static,
    {
        Self {
            inner: Arc::new(provider),
        }
    }

    /// Fetches every DAG version and run of a workflow.
    pub async fn get_workflow(&self, workflow_id: WorkflowId) -> Result<WorkflowSnapshot> {
        let start = Instant::now();
        tracing::debug!(
            target: TRACING_TARGET,
            workflow_id = %workflow_id,
            "Fetching workflow"
        );

        let result = self.inner.get_workflow(workflow_id).await;
        log_outcome("get_workflow", start, &result);
        result
    }

    /// Fetches an artifact's value for one run.
    pub async fn get_artifact_result(
        &self,
        dag_result_id: DagResultId,
        artifact_id: ArtifactId,
    ) -> Result<ArtifactResult> {
        let start = Instant::now();
        tracing::debug!(
            target: TRACING_TARGET,
            dag_result_id = %dag_result_id,
            artifact_id = %artifact_id,
            "Fetching artifact result"
        );

        let result = self
            .inner
            .get_artifact_result(dag_result_id, artifact_id)
            .await;
        log_outcome("get_artifact_result", start, &result);
        result
    }

    /// Fetches an operator's outcome for one run.
    pub async fn get_operator_result(
        &self,
        dag_result_id: DagResultId,
        operator_id: OperatorId,
    ) -> Result<OperatorResult> {
        let start = Instant::now();
        tracing::debug!(
            target: TRACING_TARGET,
            dag_result_id = %dag_result_id,
            operator_id = %operator_id,
            "Fetching operator result"
        );

        let result = self
            .inner
            .get_operator_result(dag_result_id, operator_id)
            .await;
        log_outcome("get_operator_result", start, &result);
        result
    }

    /// Requests canvas coordinates for every node of `dag`.
    pub async fn get_positions(&self, dag: &WorkflowDag) -> Result<DagLayout> {
        let start = Instant::now();
        tracing::debug!(
            target: TRACING_TARGET,
            dag_id = %dag.id,
            nodes = dag.node_count(),
            "Requesting layout"
        );

        let request = PositioningRequest::from_dag(dag);
        let result = self.inner.get_positions(&request).await;
        log_outcome("get_positions", start, &result);
        result
    }

    /// Triggers a new run, optionally overriding parameters.
    pub async fn trigger_run(
        &self,
        workflow_id: WorkflowId,
        parameters: &RunParameters,
    ) -> Result<()> {
        let start = Instant::now();
        let result = self.inner.trigger_run(workflow_id, parameters).await;
        log_outcome("trigger_run", start, &result);
        result
    }

    /// Updates workflow settings.
    pub async fn edit_workflow(&self, workflow_id: WorkflowId, update: &WorkflowUpdate) -> Result<()> {
        let start = Instant::now();
        let result = self.inner.edit_workflow(workflow_id, update).await;
        log_outcome("edit_workflow", start, &result);
        result
    }

    /// Deletes a workflow.
    pub async fn delete_workflow(&self, workflow_id: WorkflowId) -> Result<()> {
        let start = Instant::now();
        let result = self.inner.delete_workflow(workflow_id).await;
        log_outcome("delete_workflow", start, &result);
        result
    }
}
