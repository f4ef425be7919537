//! Async orchestration of one workflow page.

use flowdeck_client::DagService;
use flowdeck_core::{
    DagResultId, Error, NodeId, NodeType, OperatorId, Result, RunParameters, WorkflowId,
    WorkflowUpdate,
};
use futures::future::join_all;
use tokio::sync::{RwLock, RwLockReadGuard};

use crate::canvas::{Canvas, pair_outputs};
use crate::layout::PositionedGraph;
use crate::panel::SideSheetContent;
use crate::selector::ResultOption;
use crate::store::{NodeFetch, WorkflowStore};

/// Tracing target for session operations.
pub const TRACING_TARGET: &str = "flowdeck_state::session";

/// Drives a [`WorkflowStore`] against the platform API.
///
/// All methods take `&self`; the store sits behind an async `RwLock` that is
/// never held across a network call. Every fetch records the store epoch
/// before awaiting and its response is dropped if the epoch moved on.
pub struct WorkflowSession {
    service: DagService,
    store: RwLock<WorkflowStore>,
}

impl std::fmt::Debug for WorkflowSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowSession")
            .field("service", &self.service)
            .finish_non_exhaustive()
    }
}

impl WorkflowSession {
    /// Creates a session with an empty store.
    pub fn new(service: DagService) -> Self {
        Self {
            service,
            store: RwLock::new(WorkflowStore::new()),
        }
    }

    /// Read access to the store.
    pub async fn store(&self) -> RwLockReadGuard<'_, WorkflowStore> {
        self.store.read().await
    }

    /// Loads a workflow and selects its initial run.
    ///
    /// `preferred` selects a specific run; an unknown id falls back to the
    /// most recent run.
    pub async fn open(&self, workflow_id: WorkflowId, preferred: Option<DagResultId>) -> Result<()> {
        tracing::info!(
            target: TRACING_TARGET,
            workflow_id = %workflow_id,
            preferred = ?preferred,
            "Opening workflow"
        );

        let epoch = self.store.write().await.begin_workflow(workflow_id);
        let response = self.service.get_workflow(workflow_id).await;
        self.store
            .write()
            .await
            .apply_workflow(epoch, response, preferred)?;
        Ok(())
    }

    /// Reloads the open workflow, keeping the selected run when it still exists.
    pub async fn refresh(&self) -> Result<()> {
        let (workflow_id, selected) = {
            let store = self.store.read().await;
            (
                require_workflow(&store)?,
                store.selected_result().map(|r| r.id),
            )
        };
        self.open(workflow_id, selected).await
    }

    /// Selects the run at `index`, newest first.
    pub async fn select_result(&self, index: usize) -> Result<()> {
        self.store.write().await.select_result(index)
    }

    /// Lists the runs for a picker.
    pub async fn result_options(&self) -> Vec<ResultOption> {
        let store = self.store.read().await;
        ResultOption::list(store.results(), store.selected_index())
    }

    /// Requests the layout of the active DAG.
    ///
    /// A failure is recorded on the store's layout and also returned. A
    /// response that arrives after the store moved on is dropped, failed or
    /// not, and reported as `Ok`.
    pub async fn resolve_layout(&self) -> Result<()> {
        let (epoch, dag) = self.store.write().await.begin_layout()?;
        let response = self.service.get_positions(&dag).await;

        let failure = response.as_ref().err().map(|error| {
            Error::new(error.kind())
                .with_message(error.message.clone().unwrap_or_else(|| error.kind_str().to_owned()))
        });
        let applied = self.store.write().await.apply_layout(epoch, response);

        match failure {
            Some(error) if applied => Err(error),
            _ => Ok(()),
        }
    }

    /// Selects a node, opens the panels and fetches what its detail view
    /// shows if not cached.
    ///
    /// Check, metric and parameter operators also fetch their outputs, since
    /// their views and canvas nodes show the output value.
    pub async fn click_node(&self, id: NodeId) -> Result<NodeType> {
        let (node_type, ids) = {
            let mut store = self.store.write().await;
            let node_type = store.click_node(id)?;
            if store.selected_result().is_none() {
                tracing::debug!(
                    target: TRACING_TARGET,
                    node_id = %id,
                    "Workflow has not run yet, nothing to fetch"
                );
                return Ok(node_type);
            }
            let mut ids = vec![id];
            if matches!(
                node_type,
                NodeType::CheckOp | NodeType::MetricOp | NodeType::ParamOp
            ) && let Some(op) = store
                .active_dag()
                .and_then(|dag| dag.operators.get(&OperatorId::from(id)))
            {
                ids.extend(op.outputs.iter().map(|a| NodeId::from(*a)));
            }
            (node_type, ids)
        };

        self.fetch_node_results(&ids).await?;
        Ok(node_type)
    }

    /// Clears the selection and closes the panels.
    pub async fn click_pane(&self) {
        self.store.write().await.click_pane();
    }

    /// Fetches node results concurrently, skipping cached ones.
    ///
    /// Every id must belong to the active DAG. Returns how many responses
    /// were written; failures are recorded on their cache entries and stale
    /// responses are dropped.
    pub async fn fetch_node_results(&self, ids: &[NodeId]) -> Result<usize> {
        let fetches = self.store.write().await.begin_node_fetches(ids)?;

        if fetches.is_empty() {
            return Ok(0);
        }

        tracing::debug!(
            target: TRACING_TARGET,
            count = fetches.len(),
            "Fetching node results"
        );

        let applied = join_all(fetches.into_iter().map(|fetch| self.run_fetch(fetch)))
            .await
            .into_iter()
            .filter(|applied| *applied)
            .count();
        Ok(applied)
    }

    /// Fetches the outputs folded into check and metric nodes.
    pub async fn fetch_annotations(&self) -> Result<usize> {
        let ids: Vec<NodeId> = {
            let store = self.store.read().await;
            if store.selected_result().is_none() {
                return Ok(0);
            }
            store
                .active_dag()
                .map(|dag| pair_outputs(dag).into_keys().map(NodeId::from).collect())
                .unwrap_or_default()
        };
        self.fetch_node_results(&ids).await
    }

    async fn run_fetch(&self, fetch: NodeFetch) -> bool {
        tracing::trace!(
            target: TRACING_TARGET,
            node_id = %fetch.node_id(),
            epoch = %fetch.ticket().epoch,
            "Fetching node result"
        );

        match fetch {
            NodeFetch::Artifact { ticket, id } => {
                let response = self
                    .service
                    .get_artifact_result(ticket.dag_result_id, id)
                    .await;
                self.store
                    .write()
                    .await
                    .apply_artifact_result(ticket, id, response)
            }
            NodeFetch::Operator { ticket, id } => {
                let response = self
                    .service
                    .get_operator_result(ticket.dag_result_id, id)
                    .await;
                self.store
                    .write()
                    .await
                    .apply_operator_result(ticket, id, response)
            }
        }
    }

    /// Returns what the canvas draws.
    ///
    /// Empty until the layout of the active DAG has been resolved, and
    /// empty when resolving failed.
    pub async fn canvas(&self) -> Canvas {
        let store = self.store.read().await;
        let (Some(dag), Some(layout)) = (store.active_dag(), store.layout().value()) else {
            return Canvas::default();
        };

        let graph = PositionedGraph::resolve(dag, layout);
        Canvas::collapse(&graph, dag, store.artifact_results(), store.selection())
    }

    /// Returns what the side panel shows.
    pub async fn side_sheet(&self) -> SideSheetContent {
        SideSheetContent::from_store(&*self.store.read().await)
    }

    /// Triggers a new run of the open workflow.
    pub async fn trigger_run(&self, parameters: &RunParameters) -> Result<()> {
        let workflow_id = require_workflow(&*self.store.read().await)?;
        self.service.trigger_run(workflow_id, parameters).await
    }

    /// Updates the open workflow's settings and reloads it.
    pub async fn edit_workflow(&self, update: &WorkflowUpdate) -> Result<()> {
        if update.is_empty() {
            return Err(Error::invalid_input().with_message("workflow update changes nothing"));
        }
        if let Some(schedule) = &update.schedule
            && let Some(period) = schedule.period()
        {
            period.validate()?;
        }

        let workflow_id = require_workflow(&*self.store.read().await)?;
        self.service.edit_workflow(workflow_id, update).await?;
        self.refresh().await
    }

    /// Deletes the open workflow and closes the session.
    pub async fn delete_workflow(&self) -> Result<()> {
        let workflow_id = require_workflow(&*self.store.read().await)?;
        self.service.delete_workflow(workflow_id).await?;
        self.close().await;
        Ok(())
    }

    /// Drops all workflow state; late responses are discarded.
    pub async fn close(&self) {
        tracing::debug!(target: TRACING_TARGET, "Closing workflow session");
        self.store.write().await.teardown();
    }
}

fn require_workflow(store: &WorkflowStore) -> Result<WorkflowId> {
    store
        .workflow_id()
        .ok_or_else(|| Error::invalid_input().with_message("no workflow is open"))
}
