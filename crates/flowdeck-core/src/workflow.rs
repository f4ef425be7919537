//! Workflow-level payloads exchanged with the API.

use std::collections::HashMap;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::dag::{RetentionPolicy, WorkflowDag};
use crate::error::{Error, Result};
use crate::id::DagId;
use crate::result::WorkflowDagResult;
use crate::schedule::Schedule;

/// Everything the API returns about one workflow: every DAG version and
/// every run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WorkflowSnapshot {
    /// DAG versions keyed by id.
    #[serde(default)]
    pub workflow_dags: HashMap<DagId, WorkflowDag>,
    /// Runs in API order.
    #[serde(default)]
    pub workflow_dag_results: Vec<WorkflowDagResult>,
}

impl WorkflowSnapshot {
    /// Returns the runs sorted newest first.
    ///
    /// Runs sharing a creation time are ordered by id, descending, so the
    /// order is stable.
    pub fn results_newest_first(&self) -> Vec<WorkflowDagResult> {
        let mut results = self.workflow_dag_results.clone();
        results.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        results
    }

    /// Returns the DAG version a run executed.
    pub fn dag_for(&self, result: &WorkflowDagResult) -> Result<&WorkflowDag> {
        self.workflow_dags.get(&result.workflow_dag_id).ok_or_else(|| {
            Error::invalid_dag().with_message(format!(
                "result {} references unknown dag {}",
                result.id, result.workflow_dag_id
            ))
        })
    }

    /// Checks that every run references a known DAG version and every DAG is
    /// structurally valid.
    pub fn validate(&self) -> Result<()> {
        for result in &self.workflow_dag_results {
            self.dag_for(result)?;
        }
        for dag in self.workflow_dags.values() {
            dag.validate()?;
        }
        Ok(())
    }
}

/// Editable workflow settings.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, Builder)]
#[builder(
    name = "WorkflowUpdateBuilder",
    pattern = "owned",
    default,
    setter(into, strip_option, prefix = "with")
)]
pub struct WorkflowUpdate {
    /// New name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// New schedule.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule: Option<Schedule>,
    /// New retention policy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retention_policy: Option<RetentionPolicy>,
}

impl WorkflowUpdate {
    /// Returns a builder for an update.
    pub fn builder() -> WorkflowUpdateBuilder {
        WorkflowUpdateBuilder::default()
    }

    /// Returns whether the update changes nothing.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.schedule.is_none()
            && self.retention_policy.is_none()
    }
}

/// Parameter overrides for a triggered run, keyed by parameter name.
pub type RunParameters = HashMap<String, serde_json::Value>;

#[cfg(test)]
mod tests {
    use jiff::Timestamp;
    use uuid::Uuid;

    use super::*;
    use crate::id::{DagResultId, WorkflowId};
    use crate::result::ExecState;

    fn run(n: u128, dag: DagId, created_at: &str) -> WorkflowDagResult {
        WorkflowDagResult {
            id: DagResultId::from_uuid(Uuid::from_u128(n)),
            workflow_dag_id: dag,
            exec_state: ExecState::default(),
            created_at: created_at.parse::<Timestamp>().unwrap(),
        }
    }

    #[test]
    fn test_results_newest_first() {
        let dag = DagId::new();
        let snapshot = WorkflowSnapshot {
            workflow_dags: HashMap::from([(dag, WorkflowDag::new(dag, WorkflowId::new()))]),
            workflow_dag_results: vec![
                run(1, dag, "2024-01-01T00:00:00Z"),
                run(3, dag, "2024-03-01T00:00:00Z"),
                run(2, dag, "2024-02-01T00:00:00Z"),
            ],
        };

        let ids: Vec<_> = snapshot
            .results_newest_first()
            .iter()
            .map(|r| r.id.as_uuid().as_u128())
            .collect();
        assert_eq!(ids, [3, 2, 1]);
        assert!(snapshot.validate().is_ok());
    }

    #[test]
    fn test_unknown_dag_is_rejected() {
        let snapshot = WorkflowSnapshot {
            workflow_dags: HashMap::new(),
            workflow_dag_results: vec![run(1, DagId::new(), "2024-01-01T00:00:00Z")],
        };

        assert!(snapshot.validate().is_err());
    }

    #[test]
    fn test_update_builder() {
        let update = WorkflowUpdate::builder()
            .with_name("nightly")
            .with_schedule(Schedule::manual())
            .build()
            .unwrap();

        assert!(!update.is_empty());
        assert!(update.description.is_none());
        assert!(WorkflowUpdate::default().is_empty());
    }
}
