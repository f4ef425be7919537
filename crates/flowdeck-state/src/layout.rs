//! Places DAG nodes on the canvas.

use flowdeck_core::{DagEdge, DagLayout, NodeId, NodeType, Position, WorkflowDag};
use serde::Serialize;

use crate::TRACING_TARGET;

/// A DAG node with its canvas coordinates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionedNode {
    /// Node identifier.
    pub id: NodeId,
    /// Node kind.
    #[serde(rename = "type")]
    pub node_type: NodeType,
    /// Display label.
    pub label: String,
    /// Canvas coordinates.
    pub position: Position,
}

/// Every node and edge of a DAG, placed on the canvas.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PositionedGraph {
    /// Nodes, operators first, each group ordered by id.
    pub nodes: Vec<PositionedNode>,
    /// Edges derived from operator inputs and outputs.
    pub edges: Vec<DagEdge>,
}

impl PositionedGraph {
    /// Combines a DAG with the layout the backend computed for it.
    ///
    /// Nodes the layout does not mention are placed at the origin.
    pub fn resolve(dag: &WorkflowDag, layout: &DagLayout) -> Self {
        let mut operators: Vec<_> = dag.operators.values().collect();
        operators.sort_by_key(|op| op.id);
        let mut artifacts: Vec<_> = dag.artifacts.values().collect();
        artifacts.sort_by_key(|artifact| artifact.id);

        let operator_nodes = operators.into_iter().map(|op| {
            (
                NodeId::from(op.id),
                NodeType::from_operator_type(op.operator_type()),
                op.name.clone(),
            )
        });
        let artifact_nodes = artifacts.into_iter().map(|artifact| {
            (
                NodeId::from(artifact.id),
                NodeType::from_artifact_type(artifact.artifact_type),
                artifact.name.clone(),
            )
        });

        let nodes = operator_nodes
            .chain(artifact_nodes)
            .map(|(id, node_type, label)| {
                let position = layout.position(id).unwrap_or_else(|| {
                    tracing::debug!(
                        target: TRACING_TARGET,
                        node_id = %id,
                        "Layout has no position for node, placing at origin"
                    );
                    Position::default()
                });
                PositionedNode {
                    id,
                    node_type,
                    label,
                    position,
                }
            })
            .collect();

        Self {
            nodes,
            edges: dag.edges(),
        }
    }

    /// Finds a node by id.
    pub fn node(&self, id: NodeId) -> Option<&PositionedNode> {
        self.nodes.iter().find(|node| node.id == id)
    }
}
