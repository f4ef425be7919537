//! Normalized client-side store for one workflow.
//!
//! The store is plain synchronous state. Fetches are split in two steps: a
//! `begin_*` call marks the target as loading and hands out a [`Ticket`]
//! carrying the store's current [`Epoch`], and an `apply_*` call writes the
//! response only if the epoch still matches. Opening a workflow, selecting a
//! run and tearing down all bump the epoch, so a response that arrives after
//! any of them is dropped instead of landing under the wrong run.

use std::collections::HashMap;

use derive_more::Display;
use flowdeck_core::{
    ArtifactId, ArtifactResult, DagId, DagLayout, DagResultId, Error, NodeId, NodeType,
    OperatorId, OperatorResult, Result, WorkflowDag, WorkflowDagResult, WorkflowId,
    WorkflowSnapshot,
};
use serde::Serialize;

use crate::TRACING_TARGET;
use crate::selection::Selection;
use crate::selector;
use crate::status::{Loadable, LoadingStatus};

/// Generation counter of the store's run-scoped state.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[derive(Serialize)]
#[display("epoch {_0}")]
pub struct Epoch(u64);

impl Epoch {
    /// Returns the following epoch.
    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

/// Proof that a node fetch was started for a given run and epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    /// Store epoch when the fetch started.
    pub epoch: Epoch,
    /// Run the fetch is for.
    pub dag_result_id: DagResultId,
}

/// A node result fetch to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeFetch {
    /// Fetch an artifact's value.
    Artifact { ticket: Ticket, id: ArtifactId },
    /// Fetch an operator's outcome.
    Operator { ticket: Ticket, id: OperatorId },
}

impl NodeFetch {
    /// Returns the fetch ticket.
    pub fn ticket(&self) -> Ticket {
        match self {
            Self::Artifact { ticket, .. } | Self::Operator { ticket, .. } => *ticket,
        }
    }

    /// Returns the fetched node.
    pub fn node_id(&self) -> NodeId {
        match self {
            Self::Artifact { id, .. } => (*id).into(),
            Self::Operator { id, .. } => (*id).into(),
        }
    }
}

/// Client-side state of one workflow page.
#[derive(Debug, Clone, Default)]
pub struct WorkflowStore {
    workflow_id: Option<WorkflowId>,
    workflow_status: LoadingStatus,
    dags: HashMap<DagId, WorkflowDag>,
    results: Vec<WorkflowDagResult>,
    selected_result: Option<usize>,
    active_dag: Option<DagId>,
    artifact_results: HashMap<ArtifactId, Loadable<ArtifactResult>>,
    operator_results: HashMap<OperatorId, Loadable<OperatorResult>>,
    layout: Loadable<DagLayout>,
    selection: Selection,
    epoch: Epoch,
}

impl WorkflowStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current epoch.
    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    /// Returns whether `epoch` is still current.
    pub fn is_current(&self, epoch: Epoch) -> bool {
        self.epoch == epoch
    }

    fn bump_epoch(&mut self) {
        self.epoch = self.epoch.next();
    }

    /// Returns the open workflow.
    pub fn workflow_id(&self) -> Option<WorkflowId> {
        self.workflow_id
    }

    /// Returns the loading state of the workflow itself.
    pub fn workflow_status(&self) -> &LoadingStatus {
        &self.workflow_status
    }

    /// Returns every known DAG version.
    pub fn dags(&self) -> &HashMap<DagId, WorkflowDag> {
        &self.dags
    }

    /// Returns the runs, newest first.
    pub fn results(&self) -> &[WorkflowDagResult] {
        &self.results
    }

    /// Returns the index of the selected run.
    pub fn selected_index(&self) -> Option<usize> {
        self.selected_result
    }

    /// Returns the selected run.
    pub fn selected_result(&self) -> Option<&WorkflowDagResult> {
        self.selected_result.and_then(|i| self.results.get(i))
    }

    /// Returns the DAG version shown.
    pub fn active_dag(&self) -> Option<&WorkflowDag> {
        self.active_dag.and_then(|id| self.dags.get(&id))
    }

    /// Returns the cached artifact results.
    pub fn artifact_results(&self) -> &HashMap<ArtifactId, Loadable<ArtifactResult>> {
        &self.artifact_results
    }

    /// Returns the cached operator results.
    pub fn operator_results(&self) -> &HashMap<OperatorId, Loadable<OperatorResult>> {
        &self.operator_results
    }

    /// Returns one cached artifact result.
    pub fn artifact_result(&self, id: ArtifactId) -> Option<&Loadable<ArtifactResult>> {
        self.artifact_results.get(&id)
    }

    /// Returns one cached operator result.
    pub fn operator_result(&self, id: OperatorId) -> Option<&Loadable<OperatorResult>> {
        self.operator_results.get(&id)
    }

    /// Returns the layout of the active DAG.
    pub fn layout(&self) -> &Loadable<DagLayout> {
        &self.layout
    }

    /// Returns the selection cursor.
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Returns the kind of a node of the active DAG.
    pub fn node_type(&self, id: NodeId) -> Option<NodeType> {
        let dag = self.active_dag()?;
        if let Some(op) = dag.operators.get(&OperatorId::from(id)) {
            return Some(NodeType::from_operator_type(op.operator_type()));
        }
        dag.artifacts
            .get(&ArtifactId::from(id))
            .map(|artifact| NodeType::from_artifact_type(artifact.artifact_type))
    }

    /// Starts loading `workflow_id`, discarding everything about the
    /// previous one. Returns the epoch the response must match.
    pub fn begin_workflow(&mut self, workflow_id: WorkflowId) -> Epoch {
        self.teardown();
        self.workflow_id = Some(workflow_id);
        self.workflow_status = LoadingStatus::Loading;
        self.epoch
    }

    /// Applies a workflow response started at `epoch`.
    ///
    /// Returns `Ok(false)` when the response is stale. A failed fetch is
    /// recorded on the workflow status and returned.
    pub fn apply_workflow(
        &mut self,
        epoch: Epoch,
        response: Result<WorkflowSnapshot>,
        preferred: Option<DagResultId>,
    ) -> Result<bool> {
        if !self.is_current(epoch) {
            tracing::debug!(
                target: TRACING_TARGET,
                %epoch,
                current = %self.epoch,
                "Dropping stale workflow response"
            );
            return Ok(false);
        }

        match response.and_then(|snapshot| self.load_workflow(snapshot, preferred)) {
            Ok(()) => Ok(true),
            Err(error) => {
                self.workflow_status = LoadingStatus::Failed(error.to_string());
                Err(error)
            }
        }
    }

    /// Replaces the store content with a fetched workflow and selects the
    /// initial run.
    pub fn load_workflow(
        &mut self,
        snapshot: WorkflowSnapshot,
        preferred: Option<DagResultId>,
    ) -> Result<()> {
        snapshot.validate()?;

        self.results = snapshot.results_newest_first();
        self.dags = snapshot.workflow_dags;
        self.selected_result = None;
        self.active_dag = None;
        self.reset_run_state();
        self.workflow_status = LoadingStatus::Succeeded;

        tracing::debug!(
            target: TRACING_TARGET,
            dags = self.dags.len(),
            results = self.results.len(),
            "Workflow loaded"
        );

        match selector::initial_index(&self.results, preferred) {
            Some(index) => self.select_result(index),
            None => {
                // Never ran: show the newest DAG version.
                self.active_dag = self
                    .dags
                    .values()
                    .max_by_key(|dag| (dag.metadata.created_at, dag.id))
                    .map(|dag| dag.id);
                Ok(())
            }
        }
    }

    /// Selects the run at `index` (newest first).
    ///
    /// Switches the active DAG to the one the run executed, empties both
    /// result caches, invalidates the layout and selection, and bumps the
    /// epoch. An out-of-range index or a run referencing an unknown DAG is
    /// an error and leaves the store unchanged.
    pub fn select_result(&mut self, index: usize) -> Result<()> {
        let result = self.results.get(index).ok_or_else(|| {
            Error::invalid_input().with_message(format!(
                "result index {index} is out of range ({} results)",
                self.results.len()
            ))
        })?;

        if !self.dags.contains_key(&result.workflow_dag_id) {
            return Err(Error::invalid_dag().with_message(format!(
                "result {} references unknown dag {}",
                result.id, result.workflow_dag_id
            )));
        }

        let dag_id = result.workflow_dag_id;
        tracing::debug!(
            target: TRACING_TARGET,
            index,
            result_id = %result.id,
            dag_id = %dag_id,
            "Selecting result"
        );

        self.selected_result = Some(index);
        self.active_dag = Some(dag_id);
        self.reset_run_state();
        Ok(())
    }

    /// Clears everything scoped to the selected run and bumps the epoch.
    fn reset_run_state(&mut self) {
        self.artifact_results.clear();
        self.operator_results.clear();
        self.layout = Loadable::initial();
        self.selection = Selection::default();
        self.bump_epoch();
    }

    /// Starts fetching the result of a node of the active DAG.
    ///
    /// Returns `Ok(None)` when the result is cached or already loading and
    /// `force` is not set.
    pub fn begin_node_fetch(&mut self, id: NodeId, force: bool) -> Result<Option<NodeFetch>> {
        let dag_result_id = self
            .selected_result()
            .map(|result| result.id)
            .ok_or_else(|| Error::invalid_input().with_message("no result is selected"))?;
        let ticket = Ticket {
            epoch: self.epoch,
            dag_result_id,
        };

        let node_type = self.node_type(id).ok_or_else(|| {
            Error::invalid_input().with_message(format!("node {id} is not part of the active dag"))
        })?;

        if node_type.is_artifact() {
            let id = ArtifactId::from(id);
            let slot = self.artifact_results.entry(id).or_default();
            if !force && !slot.needs_fetch() {
                return Ok(None);
            }
            *slot = Loadable::loading();
            Ok(Some(NodeFetch::Artifact { ticket, id }))
        } else {
            let id = OperatorId::from(id);
            let slot = self.operator_results.entry(id).or_default();
            if !force && !slot.needs_fetch() {
                return Ok(None);
            }
            *slot = Loadable::loading();
            Ok(Some(NodeFetch::Operator { ticket, id }))
        }
    }

    /// Starts fetching several node results at once.
    ///
    /// Every id is checked before any is marked loading, so an unknown id
    /// leaves the caches untouched.
    pub fn begin_node_fetches(&mut self, ids: &[NodeId]) -> Result<Vec<NodeFetch>> {
        if self.selected_result().is_none() {
            return Err(Error::invalid_input().with_message("no result is selected"));
        }
        if let Some(unknown) = ids.iter().find(|id| self.node_type(**id).is_none()) {
            return Err(Error::invalid_input()
                .with_message(format!("node {unknown} is not part of the active dag")));
        }

        let mut fetches = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(fetch) = self.begin_node_fetch(*id, false)? {
                fetches.push(fetch);
            }
        }
        Ok(fetches)
    }

    /// Applies an artifact result. Returns `false` when stale.
    pub fn apply_artifact_result(
        &mut self,
        ticket: Ticket,
        id: ArtifactId,
        response: Result<ArtifactResult>,
    ) -> bool {
        if !self.accepts(ticket, id.into()) {
            return false;
        }
        self.artifact_results
            .insert(id, Loadable::from_result(response));
        true
    }

    /// Applies an operator result. Returns `false` when stale.
    pub fn apply_operator_result(
        &mut self,
        ticket: Ticket,
        id: OperatorId,
        response: Result<OperatorResult>,
    ) -> bool {
        if !self.accepts(ticket, id.into()) {
            return false;
        }
        self.operator_results
            .insert(id, Loadable::from_result(response));
        true
    }

    fn accepts(&self, ticket: Ticket, node: NodeId) -> bool {
        let current = self.is_current(ticket.epoch)
            && self.selected_result().map(|r| r.id) == Some(ticket.dag_result_id);
        if !current {
            tracing::debug!(
                target: TRACING_TARGET,
                node_id = %node,
                dag_result_id = %ticket.dag_result_id,
                epoch = %ticket.epoch,
                current = %self.epoch,
                "Dropping stale node result"
            );
        }
        current
    }

    /// Starts resolving the layout of the active DAG.
    ///
    /// Any previous layout is dropped, so nothing from another DAG is shown
    /// while the request is pending.
    pub fn begin_layout(&mut self) -> Result<(Epoch, WorkflowDag)> {
        let dag = self
            .active_dag()
            .cloned()
            .ok_or_else(|| Error::invalid_input().with_message("no dag is active"))?;
        self.layout = Loadable::loading();
        Ok((self.epoch, dag))
    }

    /// Applies a layout response. Returns `false` when stale.
    pub fn apply_layout(&mut self, epoch: Epoch, response: Result<DagLayout>) -> bool {
        if !self.is_current(epoch) {
            tracing::debug!(
                target: TRACING_TARGET,
                %epoch,
                current = %self.epoch,
                "Dropping stale layout"
            );
            return false;
        }
        if let Ok(layout) = &response
            && layout.is_empty()
            && let Some(dag) = self.active_dag()
            && dag.node_count() > 0
        {
            tracing::warn!(
                target: TRACING_TARGET,
                dag_id = %dag.id,
                nodes = dag.node_count(),
                "Layout has no positions, every node is placed at the origin"
            );
        }
        self.layout = Loadable::from_result(response);
        true
    }

    /// Selects a node of the active DAG and opens the detail panels.
    pub fn click_node(&mut self, id: NodeId) -> Result<NodeType> {
        let node_type = self.node_type(id).ok_or_else(|| {
            Error::invalid_input().with_message(format!("node {id} is not part of the active dag"))
        })?;
        self.selection.click_node(id, node_type);
        Ok(node_type)
    }

    /// Clears the selection and closes the detail panels.
    pub fn click_pane(&mut self) {
        self.selection.click_pane();
    }

    /// Drops everything, as when leaving the workflow page.
    ///
    /// The epoch keeps increasing so responses to earlier requests are
    /// still recognized as stale.
    pub fn teardown(&mut self) {
        let epoch = self.epoch.next();
        *self = Self {
            epoch,
            ..Self::default()
        };
    }
}

#[cfg(test)]
mod tests {
    use flowdeck_core::{
        Artifact, ArtifactType, ErrorKind, ExecState, ExecutionStatus, Operator, OperatorSpec,
        OperatorType, SerializationType,
    };
    use jiff::Timestamp;

    use super::*;

    struct Fixture {
        snapshot: WorkflowSnapshot,
        op1: OperatorId,
        a1: ArtifactId,
        older_dag: DagId,
        newer_dag: DagId,
    }

    /// Two DAG versions, each with one run; the newer run executed the newer DAG.
    fn fixture() -> Fixture {
        let workflow_id = WorkflowId::new();
        let op1 = OperatorId::new();
        let a1 = ArtifactId::new();

        let dag = |id: DagId| {
            WorkflowDag::new(id, workflow_id)
                .with_operator(
                    Operator::builder()
                        .with_id(op1)
                        .with_name("op1")
                        .with_spec(OperatorSpec::new(OperatorType::Check))
                        .with_outputs(vec![a1])
                        .build()
                        .unwrap(),
                )
                .with_artifact(Artifact::new(a1, "a1", ArtifactType::Bool))
        };
        let (older_dag, newer_dag) = (DagId::new(), DagId::new());
        let run = |dag_id: DagId, secs: i64| WorkflowDagResult {
            id: DagResultId::new(),
            workflow_dag_id: dag_id,
            exec_state: ExecState::with_status(ExecutionStatus::Succeeded),
            created_at: Timestamp::from_second(secs).unwrap(),
        };

        let snapshot = WorkflowSnapshot {
            workflow_dags: HashMap::from([(older_dag, dag(older_dag)), (newer_dag, dag(newer_dag))]),
            workflow_dag_results: vec![run(older_dag, 100), run(newer_dag, 200)],
        };

        Fixture {
            snapshot,
            op1,
            a1,
            older_dag,
            newer_dag,
        }
    }

    fn bool_result() -> ArtifactResult {
        ArtifactResult::new(ArtifactType::Bool, SerializationType::String, "true")
    }

    #[test]
    fn test_load_selects_most_recent() {
        let fx = fixture();
        let mut store = WorkflowStore::new();
        store.load_workflow(fx.snapshot, None).unwrap();

        assert_eq!(store.selected_index(), Some(0));
        assert_eq!(store.active_dag().map(|d| d.id), Some(fx.newer_dag));
        assert!(store.workflow_status().is_succeeded());
    }

    #[test]
    fn test_preferred_result_takes_precedence() {
        let fx = fixture();
        let older_run = fx.snapshot.workflow_dag_results[0].id;
        let mut store = WorkflowStore::new();
        store.load_workflow(fx.snapshot, Some(older_run)).unwrap();

        assert_eq!(store.selected_index(), Some(1));
        assert_eq!(store.active_dag().map(|d| d.id), Some(fx.older_dag));
    }

    #[test]
    fn test_select_result_switches_dag_and_clears_caches() {
        let fx = fixture();
        let mut store = WorkflowStore::new();
        store.load_workflow(fx.snapshot, None).unwrap();

        let Some(NodeFetch::Artifact { ticket, id }) =
            store.begin_node_fetch(fx.a1.into(), false).unwrap()
        else {
            panic!("expected an artifact fetch");
        };
        assert!(store.apply_artifact_result(ticket, id, Ok(bool_result())));
        assert_eq!(store.artifact_results().len(), 1);

        store.select_result(1).unwrap();
        assert_eq!(store.selected_index(), Some(1));
        assert_eq!(
            store.active_dag().map(|d| d.id),
            Some(store.results()[1].workflow_dag_id)
        );
        assert_eq!(store.active_dag().map(|d| d.id), Some(fx.older_dag));
        assert!(store.artifact_results().is_empty());
        assert!(store.operator_results().is_empty());
        assert_eq!(store.layout().status(), &LoadingStatus::Initial);
    }

    #[test]
    fn test_out_of_range_selection_leaves_store_unchanged() {
        let fx = fixture();
        let mut store = WorkflowStore::new();
        store.load_workflow(fx.snapshot, None).unwrap();
        let epoch = store.epoch();

        let error = store.select_result(5).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidInput);
        assert_eq!(store.selected_index(), Some(0));
        assert_eq!(store.epoch(), epoch);
    }

    #[test]
    fn test_unknown_dag_is_rejected() {
        let mut fx = fixture();
        fx.snapshot.workflow_dags.remove(&fx.older_dag);
        let mut store = WorkflowStore::new();
        let error = store.load_workflow(fx.snapshot, None).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidDag);
    }

    #[test]
    fn test_stale_node_result_is_dropped() {
        let fx = fixture();
        let mut store = WorkflowStore::new();
        store.load_workflow(fx.snapshot, None).unwrap();

        let fetch = store.begin_node_fetch(fx.op1.into(), false).unwrap().unwrap();
        store.select_result(1).unwrap();

        let NodeFetch::Operator { ticket, id } = fetch else {
            panic!("expected an operator fetch");
        };
        assert!(!store.apply_operator_result(ticket, id, Ok(OperatorResult::default())));
        assert!(store.operator_results().is_empty());
    }

    #[test]
    fn test_cached_node_is_not_refetched() {
        let fx = fixture();
        let mut store = WorkflowStore::new();
        store.load_workflow(fx.snapshot, None).unwrap();

        assert!(store.begin_node_fetch(fx.a1.into(), false).unwrap().is_some());
        assert!(store.begin_node_fetch(fx.a1.into(), false).unwrap().is_none());
        assert!(store.begin_node_fetch(fx.a1.into(), true).unwrap().is_some());
    }

    #[test]
    fn test_failed_fetch_is_recorded() {
        let fx = fixture();
        let mut store = WorkflowStore::new();
        store.load_workflow(fx.snapshot, None).unwrap();

        let fetch = store.begin_node_fetch(fx.a1.into(), false).unwrap().unwrap();
        let NodeFetch::Artifact { ticket, id } = fetch else {
            panic!("expected an artifact fetch");
        };
        store.apply_artifact_result(ticket, id, Err(Error::not_found().with_message("gone")));

        let cached = store.artifact_result(fx.a1).unwrap();
        assert!(cached.status().error().is_some_and(|m| m.contains("gone")));
        assert!(cached.needs_fetch());
    }

    #[test]
    fn test_layout_is_epoch_tagged() {
        let fx = fixture();
        let mut store = WorkflowStore::new();
        store.load_workflow(fx.snapshot, None).unwrap();

        let (epoch, dag) = store.begin_layout().unwrap();
        assert_eq!(dag.id, fx.newer_dag);
        assert!(store.layout().status().is_loading());

        store.select_result(1).unwrap();
        assert!(!store.apply_layout(epoch, Ok(DagLayout::default())));
        assert_eq!(store.layout().status(), &LoadingStatus::Initial);
    }

    #[test]
    fn test_click_node_and_pane() {
        let fx = fixture();
        let mut store = WorkflowStore::new();
        store.load_workflow(fx.snapshot, None).unwrap();

        assert_eq!(store.click_node(fx.op1.into()).unwrap(), NodeType::CheckOp);
        assert!(store.selection().panels().right_open);

        store.click_pane();
        assert!(store.selection().node().is_none());
        assert!(store.selection().panels().is_closed());

        assert!(store.click_node(NodeId::new()).is_err());
    }

    #[test]
    fn test_teardown_keeps_epoch_increasing() {
        let fx = fixture();
        let mut store = WorkflowStore::new();
        let epoch = store.begin_workflow(WorkflowId::new());
        store.teardown();

        assert!(store.epoch() > epoch);
        assert!(!store.apply_workflow(epoch, Ok(fx.snapshot), None).unwrap());
        assert!(store.workflow_id().is_none());
        assert!(store.results().is_empty());
    }
}
