//! Workflow DAG snapshots.

use std::collections::HashMap;

use jiff::Timestamp;
use petgraph::algo::is_cyclic_directed;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};

use crate::artifact::Artifact;
use crate::error::{Error, Result};
use crate::id::{ArtifactId, DagId, NodeId, OperatorId, WorkflowId};
use crate::operator::Operator;
use crate::schedule::Schedule;

/// How many past results the platform keeps for a workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionPolicy {
    /// Number of most recent results to keep; `-1` keeps everything.
    #[serde(default = "default_k_latest_runs")]
    pub k_latest_runs: i64,
}

fn default_k_latest_runs() -> i64 {
    -1
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            k_latest_runs: default_k_latest_runs(),
        }
    }
}

/// Descriptive metadata stored with every DAG version.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WorkflowMetadata {
    /// Workflow name.
    pub name: String,
    /// Optional description.
    #[serde(default)]
    pub description: String,
    /// Run schedule.
    #[serde(default)]
    pub schedule: Schedule,
    /// Result retention.
    #[serde(default)]
    pub retention_policy: RetentionPolicy,
    /// When the workflow was first created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Timestamp>,
}

/// A directed connection between an operator and an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DagEdge {
    /// Upstream node.
    pub from: NodeId,
    /// Downstream node.
    pub to: NodeId,
}

impl DagEdge {
    /// Creates an edge.
    pub fn new(from: impl Into<NodeId>, to: impl Into<NodeId>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// One deployed version of a workflow: its operators, artifacts and schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDag {
    /// DAG version identifier.
    pub id: DagId,
    /// Owning workflow.
    pub workflow_id: WorkflowId,
    /// Workflow metadata as of this version.
    #[serde(default)]
    pub metadata: WorkflowMetadata,
    /// Operators keyed by id.
    #[serde(default)]
    pub operators: HashMap<OperatorId, Operator>,
    /// Artifacts keyed by id.
    #[serde(default)]
    pub artifacts: HashMap<ArtifactId, Artifact>,
}

impl WorkflowDag {
    /// Creates an empty DAG version.
    pub fn new(id: DagId, workflow_id: WorkflowId) -> Self {
        Self {
            id,
            workflow_id,
            metadata: WorkflowMetadata::default(),
            operators: HashMap::new(),
            artifacts: HashMap::new(),
        }
    }

    /// Adds an operator.
    pub fn with_operator(mut self, operator: Operator) -> Self {
        self.operators.insert(operator.id, operator);
        self
    }

    /// Adds an artifact.
    pub fn with_artifact(mut self, artifact: Artifact) -> Self {
        self.artifacts.insert(artifact.id, artifact);
        self
    }

    /// Returns the number of operator and artifact nodes.
    pub fn node_count(&self) -> usize {
        self.operators.len() + self.artifacts.len()
    }

    /// Derives the edges of the DAG: `artifact -> operator` for inputs and
    /// `operator -> artifact` for outputs, sorted for stable output.
    pub fn edges(&self) -> Vec<DagEdge> {
        let mut edges: Vec<DagEdge> = self
            .operators
            .values()
            .flat_map(|op| {
                let inputs = op.inputs.iter().map(move |a| DagEdge::new(*a, op.id));
                let outputs = op.outputs.iter().map(move |a| DagEdge::new(op.id, *a));
                inputs.chain(outputs)
            })
            .collect();

        edges.sort_by_key(|edge| (edge.from, edge.to));
        edges.dedup();
        edges
    }

    /// Checks structural invariants.
    ///
    /// Every operator input and output must reference an artifact of this DAG,
    /// every artifact has at most one producer, and the graph is acyclic.
    pub fn validate(&self) -> Result<()> {
        let mut producers: HashMap<ArtifactId, OperatorId> = HashMap::new();

        for op in self.operators.values() {
            for artifact in op.inputs.iter().chain(op.outputs.iter()) {
                if !self.artifacts.contains_key(artifact) {
                    return Err(Error::invalid_dag().with_message(format!(
                        "operator {} references unknown artifact {artifact}",
                        op.id
                    )));
                }
            }

            for artifact in &op.outputs {
                if let Some(other) = producers.insert(*artifact, op.id) {
                    return Err(Error::invalid_dag().with_message(format!(
                        "artifact {artifact} is produced by both {other} and {}",
                        op.id
                    )));
                }
            }
        }

        let mut graph: DiGraph<NodeId, ()> = DiGraph::new();
        let mut indices: HashMap<NodeId, NodeIndex> = HashMap::new();
        let ids = self
            .operators
            .keys()
            .map(|id| NodeId::from(*id))
            .chain(self.artifacts.keys().map(|id| NodeId::from(*id)));
        for id in ids {
            indices.insert(id, graph.add_node(id));
        }
        for edge in self.edges() {
            if let (Some(from), Some(to)) = (indices.get(&edge.from), indices.get(&edge.to)) {
                graph.add_edge(*from, *to, ());
            }
        }

        if is_cyclic_directed(&graph) {
            return Err(Error::invalid_dag().with_message(format!(
                "cycle detected in workflow dag {}",
                self.id
            )));
        }

        tracing::trace!(
            target: crate::TRACING_TARGET,
            dag_id = %self.id,
            operators = self.operators.len(),
            artifacts = self.artifacts.len(),
            "Workflow dag validated"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::artifact::ArtifactType;
    use crate::error::ErrorKind;
    use crate::operator::{OperatorSpec, OperatorType};

    fn operator(n: u128, kind: OperatorType, inputs: &[u128], outputs: &[u128]) -> Operator {
        Operator {
            id: OperatorId::from_uuid(Uuid::from_u128(n)),
            name: format!("op{n}"),
            description: None,
            spec: OperatorSpec::new(kind),
            inputs: inputs.iter().map(|a| artifact_id(*a)).collect(),
            outputs: outputs.iter().map(|a| artifact_id(*a)).collect(),
        }
    }

    fn artifact_id(n: u128) -> ArtifactId {
        ArtifactId::from_uuid(Uuid::from_u128(n))
    }

    fn artifact(n: u128, artifact_type: ArtifactType) -> Artifact {
        Artifact::new(artifact_id(n), format!("a{n}"), artifact_type)
    }

    fn dag() -> WorkflowDag {
        WorkflowDag::new(DagId::new(), WorkflowId::new())
    }

    #[test]
    fn test_edges_follow_inputs_and_outputs() {
        let dag = dag()
            .with_operator(operator(1, OperatorType::Extract, &[], &[10]))
            .with_operator(operator(2, OperatorType::Function, &[10], &[11]))
            .with_artifact(artifact(10, ArtifactType::Table))
            .with_artifact(artifact(11, ArtifactType::Table));

        let edges = dag.edges();
        assert_eq!(edges.len(), 3);
        assert!(edges.contains(&DagEdge::new(
            OperatorId::from_uuid(Uuid::from_u128(1)),
            artifact_id(10)
        )));
        assert!(edges.contains(&DagEdge::new(
            artifact_id(10),
            OperatorId::from_uuid(Uuid::from_u128(2))
        )));
        assert!(dag.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_dangling_artifact() {
        let dag = dag().with_operator(operator(1, OperatorType::Check, &[], &[10]));

        let error = dag.validate().unwrap_err();
        assert_eq!(error.kind, ErrorKind::InvalidDag);
    }

    #[test]
    fn test_validate_rejects_cycle() {
        let dag = dag()
            .with_operator(operator(1, OperatorType::Function, &[11], &[10]))
            .with_operator(operator(2, OperatorType::Function, &[10], &[11]))
            .with_artifact(artifact(10, ArtifactType::Table))
            .with_artifact(artifact(11, ArtifactType::Table));

        let error = dag.validate().unwrap_err();
        assert!(error.to_string().contains("cycle"));
    }

    #[test]
    fn test_validate_rejects_two_producers() {
        let dag = dag()
            .with_operator(operator(1, OperatorType::Function, &[], &[10]))
            .with_operator(operator(2, OperatorType::Function, &[], &[10]))
            .with_artifact(artifact(10, ArtifactType::Table));

        assert!(dag.validate().is_err());
    }

    #[test]
    fn test_node_count_and_edges() {
        let dag = dag()
            .with_operator(operator(1, OperatorType::Extract, &[], &[10]))
            .with_operator(operator(2, OperatorType::Metric, &[10], &[11]))
            .with_operator(operator(3, OperatorType::Check, &[10], &[12]))
            .with_artifact(artifact(10, ArtifactType::Table))
            .with_artifact(artifact(11, ArtifactType::Numeric))
            .with_artifact(artifact(12, ArtifactType::Bool));

        assert_eq!(dag.node_count(), 6);
        assert_eq!(dag.edges().len(), 5);
        assert!(dag.validate().is_ok());
    }
}
