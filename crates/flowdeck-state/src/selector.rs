//! Choosing which run of a workflow is shown.

use flowdeck_core::{DagId, DagResultId, ExecutionStatus, WorkflowDagResult};
use jiff::Timestamp;
use serde::Serialize;

use crate::TRACING_TARGET;

/// Picks the run shown when a workflow is opened.
///
/// `results` must be ordered newest first. A preferred run id (from a link
/// or the command line) wins; an unknown one falls back to the newest run.
/// Returns `None` when the workflow has never run.
pub fn initial_index(
    results: &[WorkflowDagResult],
    preferred: Option<DagResultId>,
) -> Option<usize> {
    if results.is_empty() {
        return None;
    }

    let Some(preferred) = preferred else {
        return Some(0);
    };

    match results.iter().position(|r| r.id == preferred) {
        Some(index) => Some(index),
        None => {
            tracing::warn!(
                target: TRACING_TARGET,
                result_id = %preferred,
                "Requested result not found, showing the most recent run"
            );
            Some(0)
        }
    }
}

/// One entry of the run picker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultOption {
    /// Position in the newest-first list.
    pub index: usize,
    /// Run identifier.
    pub id: DagResultId,
    /// DAG version the run executed.
    pub dag_id: DagId,
    /// Run status.
    pub status: ExecutionStatus,
    /// When the run was created.
    pub created_at: Timestamp,
    /// Whether this run is the one shown.
    pub selected: bool,
}

impl ResultOption {
    /// Lists the picker entries for newest-first `results`.
    pub fn list(results: &[WorkflowDagResult], selected: Option<usize>) -> Vec<Self> {
        results
            .iter()
            .enumerate()
            .map(|(index, result)| Self {
                index,
                id: result.id,
                dag_id: result.workflow_dag_id,
                status: result.status(),
                created_at: result.created_at,
                selected: selected == Some(index),
            })
            .collect()
    }
}
