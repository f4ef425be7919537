//! In-memory [`DagProvider`] for tests and demos.
//!
//! # Feature Flag
//!
//! This module is only available when the `mock` feature is enabled:
//!
//! ```toml
//! [dev-dependencies]
//! flowdeck-client = { version = "...", features = ["mock"] }
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use flowdeck_client::mock::{MockCall, MockDagProvider};
//!
//! let provider = MockDagProvider::new()
//!     .with_workflow(workflow_id, snapshot)
//!     .with_delay(Duration::from_millis(50));
//!
//! let service = provider.clone().into_service();
//! // ... drive the service ...
//! assert_eq!(provider.calls(MockCall::GetWorkflow), 1);
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use flowdeck_core::{
    ArtifactId, ArtifactResult, DagLayout, DagResultId, Error, ErrorKind, OperatorId,
    OperatorResult, Position, Result, RunParameters, WorkflowId, WorkflowSnapshot, WorkflowUpdate,
};

use crate::TRACING_TARGET;
use crate::provider::DagProvider;
use crate::request::PositioningRequest;
use crate::service::DagService;

/// Horizontal distance between generated node positions.
const GRID_SPACING: f32 = 200.0;

/// Provider operations the mock records and can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockCall {
    /// [`DagProvider::get_workflow`].
    GetWorkflow,
    /// [`DagProvider::get_artifact_result`].
    GetArtifactResult,
    /// [`DagProvider::get_operator_result`].
    GetOperatorResult,
    /// [`DagProvider::get_positions`].
    GetPositions,
    /// [`DagProvider::trigger_run`].
    TriggerRun,
    /// [`DagProvider::edit_workflow`].
    EditWorkflow,
    /// [`DagProvider::delete_workflow`].
    DeleteWorkflow,
}

#[derive(Debug, Default)]
struct MockState {
    workflows: HashMap<WorkflowId, WorkflowSnapshot>,
    artifact_results: HashMap<(DagResultId, ArtifactId), ArtifactResult>,
    operator_results: HashMap<(DagResultId, OperatorId), OperatorResult>,
    layout: Option<DagLayout>,
    delay: Option<Duration>,
    failures: HashMap<MockCall, ErrorKind>,
    calls: HashMap<MockCall, usize>,
    triggered: Vec<(WorkflowId, RunParameters)>,
    edits: Vec<(WorkflowId, WorkflowUpdate)>,
}

impl MockState {
    /// Counts the call and returns the delay plus any injected failure.
    fn enter(&mut self, call: MockCall) -> (Option<Duration>, Result<()>) {
        *self.calls.entry(call).or_default() += 1;
        let outcome = match self.failures.get(&call) {
            Some(kind) => Err(Error::new(*kind).with_message(format!("injected failure: {call:?}"))),
            None => Ok(()),
        };
        (self.delay, outcome)
    }
}

/// Mock provider serving canned workflows, node results and layouts.
///
/// Clones share state, so a test can keep one handle for assertions while
/// the session under test owns another.
#[derive(Debug, Clone, Default)]
pub struct MockDagProvider {
    inner: Arc<Mutex<MockState>>,
}

impl MockDagProvider {
    /// Creates an empty mock provider.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Serves `snapshot` for `workflow_id`.
    pub fn with_workflow(self, workflow_id: WorkflowId, snapshot: WorkflowSnapshot) -> Self {
        self.state().workflows.insert(workflow_id, snapshot);
        self
    }

    /// Serves `result` for an artifact in one run.
    pub fn with_artifact_result(
        self,
        dag_result_id: DagResultId,
        artifact_id: ArtifactId,
        result: ArtifactResult,
    ) -> Self {
        self.state()
            .artifact_results
            .insert((dag_result_id, artifact_id), result);
        self
    }

    /// Serves `result` for an operator in one run.
    pub fn with_operator_result(
        self,
        dag_result_id: DagResultId,
        operator_id: OperatorId,
        result: OperatorResult,
    ) -> Self {
        self.state()
            .operator_results
            .insert((dag_result_id, operator_id), result);
        self
    }

    /// Serves a fixed layout instead of a generated one.
    pub fn with_layout(self, layout: DagLayout) -> Self {
        self.state().layout = Some(layout);
        self
    }

    /// Delays every call by `delay`.
    pub fn with_delay(self, delay: Duration) -> Self {
        self.set_delay(Some(delay));
        self
    }

    /// Changes the per-call delay of a shared provider.
    pub fn set_delay(&self, delay: Option<Duration>) {
        self.state().delay = delay;
    }

    /// Makes every subsequent `call` fail with `kind`.
    pub fn fail(&self, call: MockCall, kind: ErrorKind) {
        self.state().failures.insert(call, kind);
    }

    /// Removes an injected failure.
    pub fn recover(&self, call: MockCall) {
        self.state().failures.remove(&call);
    }

    /// Returns how many times `call` was made.
    pub fn calls(&self, call: MockCall) -> usize {
        self.state().calls.get(&call).copied().unwrap_or_default()
    }

    /// Returns the runs triggered so far.
    pub fn triggered_runs(&self) -> Vec<(WorkflowId, RunParameters)> {
        self.state().triggered.clone()
    }

    /// Returns the workflow edits applied so far.
    pub fn edits(&self) -> Vec<(WorkflowId, WorkflowUpdate)> {
        self.state().edits.clone()
    }

    /// Returns whether the provider still serves `workflow_id`.
    pub fn has_workflow(&self, workflow_id: WorkflowId) -> bool {
        self.state().workflows.contains_key(&workflow_id)
    }

    /// Converts this provider into a [`DagService`].
    pub fn into_service(self) -> DagService {
        DagService::new(self)
    }

    async fn pause(delay: Option<Duration>) {
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

/// Places nodes on a row ordered by id, operators first.
fn grid_layout(request: &PositioningRequest) -> DagLayout {
    let mut operators: Vec<_> = request.operators.keys().copied().collect();
    let mut artifacts: Vec<_> = request.artifacts.keys().copied().collect();
    operators.sort();
    artifacts.sort();

    let operator_positions = operators
        .into_iter()
        .enumerate()
        .map(|(i, id)| (id, Position::new(i as f32 * GRID_SPACING, 0.0)))
        .collect();
    let artifact_positions = artifacts
        .into_iter()
        .enumerate()
        .map(|(i, id)| (id, Position::new(i as f32 * GRID_SPACING, GRID_SPACING)))
        .collect();

    DagLayout {
        operator_positions,
        artifact_positions,
    }
}

#[async_trait::async_trait]
impl DagProvider for MockDagProvider {
    async fn get_workflow(&self, workflow_id: WorkflowId) -> Result<WorkflowSnapshot> {
        let (delay, outcome) = {
            let mut state = self.state();
            let (delay, gate) = state.enter(MockCall::GetWorkflow);
            let outcome = gate.and_then(|()| {
                state.workflows.get(&workflow_id).cloned().ok_or_else(|| {
                    Error::not_found().with_message(format!("workflow {workflow_id} does not exist"))
                })
            });
            (delay, outcome)
        };

        Self::pause(delay).await;
        outcome
    }

    async fn get_artifact_result(
        &self,
        dag_result_id: DagResultId,
        artifact_id: ArtifactId,
    ) -> Result<ArtifactResult> {
        let (delay, outcome) = {
            let mut state = self.state();
            let (delay, gate) = state.enter(MockCall::GetArtifactResult);
            let outcome = gate.and_then(|()| {
                state
                    .artifact_results
                    .get(&(dag_result_id, artifact_id))
                    .cloned()
                    .ok_or_else(|| {
                        Error::not_found()
                            .with_message(format!("no result for artifact {artifact_id}"))
                    })
            });
            (delay, outcome)
        };

        Self::pause(delay).await;
        outcome
    }

    async fn get_operator_result(
        &self,
        dag_result_id: DagResultId,
        operator_id: OperatorId,
    ) -> Result<OperatorResult> {
        let (delay, outcome) = {
            let mut state = self.state();
            let (delay, gate) = state.enter(MockCall::GetOperatorResult);
            let outcome = gate.and_then(|()| {
                state
                    .operator_results
                    .get(&(dag_result_id, operator_id))
                    .cloned()
                    .ok_or_else(|| {
                        Error::not_found()
                            .with_message(format!("no result for operator {operator_id}"))
                    })
            });
            (delay, outcome)
        };

        Self::pause(delay).await;
        outcome
    }

    async fn get_positions(&self, request: &PositioningRequest) -> Result<DagLayout> {
        let (delay, outcome) = {
            let mut state = self.state();
            let (delay, gate) = state.enter(MockCall::GetPositions);
            let outcome = gate.map(|()| {
                state
                    .layout
                    .clone()
                    .unwrap_or_else(|| grid_layout(request))
            });
            (delay, outcome)
        };

        Self::pause(delay).await;
        outcome
    }

    async fn trigger_run(
        &self,
        workflow_id: WorkflowId,
        parameters: &RunParameters,
    ) -> Result<()> {
        let (delay, outcome) = {
            let mut state = self.state();
            let (delay, gate) = state.enter(MockCall::TriggerRun);
            if gate.is_ok() {
                state.triggered.push((workflow_id, parameters.clone()));
            }
            (delay, gate)
        };

        tracing::debug!(target: TRACING_TARGET, workflow_id = %workflow_id, "Mock run triggered");
        Self::pause(delay).await;
        outcome
    }

    async fn edit_workflow(&self, workflow_id: WorkflowId, update: &WorkflowUpdate) -> Result<()> {
        let (delay, outcome) = {
            let mut state = self.state();
            let (delay, gate) = state.enter(MockCall::EditWorkflow);
            if gate.is_ok() {
                state.edits.push((workflow_id, update.clone()));
            }
            (delay, gate)
        };

        Self::pause(delay).await;
        outcome
    }

    async fn delete_workflow(&self, workflow_id: WorkflowId) -> Result<()> {
        let (delay, outcome) = {
            let mut state = self.state();
            let (delay, gate) = state.enter(MockCall::DeleteWorkflow);
            let outcome = gate.and_then(|()| {
                state
                    .workflows
                    .remove(&workflow_id)
                    .map(|_| ())
                    .ok_or_else(|| {
                        Error::not_found()
                            .with_message(format!("workflow {workflow_id} does not exist"))
                    })
            });
            (delay, outcome)
        };

        Self::pause(delay).await;
        outcome
    }
}

#[cfg(test)]
mod tests {
    use flowdeck_core::{ArtifactType, SerializationType};

    use super::*;

    #[tokio::test]
    async fn test_serves_canned_results() {
        let result_id = DagResultId::new();
        let artifact_id = ArtifactId::new();
        let provider = MockDagProvider::new().with_artifact_result(
            result_id,
            artifact_id,
            ArtifactResult::new(ArtifactType::Bool, SerializationType::String, "true"),
        );

        let result = provider
            .get_artifact_result(result_id, artifact_id)
            .await
            .unwrap();
        assert_eq!(result.as_bool(), Some(true));
        assert_eq!(provider.calls(MockCall::GetArtifactResult), 1);

        let missing = provider
            .get_artifact_result(DagResultId::new(), artifact_id)
            .await
            .unwrap_err();
        assert_eq!(missing.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let provider = MockDagProvider::new();
        provider.fail(MockCall::GetPositions, ErrorKind::NetworkError);

        let request = PositioningRequest {
            operators: HashMap::new(),
            artifacts: HashMap::new(),
        };
        let error = provider.get_positions(&request).await.unwrap_err();
        assert_eq!(error.kind, ErrorKind::NetworkError);

        provider.recover(MockCall::GetPositions);
        assert!(provider.get_positions(&request).await.is_ok());
        assert_eq!(provider.calls(MockCall::GetPositions), 2);
    }

    #[tokio::test]
    async fn test_records_runs_and_deletes() {
        let workflow_id = WorkflowId::new();
        let provider = MockDagProvider::new().with_workflow(workflow_id, WorkflowSnapshot::default());

        let mut parameters = RunParameters::new();
        parameters.insert("threshold".into(), serde_json::json!(0.5));
        provider.trigger_run(workflow_id, &parameters).await.unwrap();
        assert_eq!(provider.triggered_runs(), vec![(workflow_id, parameters)]);

        provider.delete_workflow(workflow_id).await.unwrap();
        assert!(!provider.has_workflow(workflow_id));
        assert!(provider.delete_workflow(workflow_id).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_applies_to_calls() {
        let workflow_id = WorkflowId::new();
        let provider = MockDagProvider::new()
            .with_workflow(workflow_id, WorkflowSnapshot::default())
            .with_delay(Duration::from_secs(5));

        let start = tokio::time::Instant::now();
        provider.get_workflow(workflow_id).await.unwrap();
        assert!(start.elapsed() >= Duration::from_secs(5));
    }
}
