//! Presentation transform from the positioned DAG to what the canvas draws.
//!
//! Check operators and their boolean output, and metric operators and their
//! numeric output, are shown as a single node: the output artifact is removed,
//! its value is folded into the operator node, and edges that touched the
//! artifact are rewired to the operator. Pairs are matched through the
//! operator's declared outputs.

use std::collections::{HashMap, HashSet};

use flowdeck_core::{
    ArtifactId, ArtifactResult, ArtifactType, CheckLevel, NodeId, NodeType, OperatorId,
    OperatorType, Position, WorkflowDag,
};
use serde::Serialize;

use crate::TRACING_TARGET;
use crate::layout::PositionedGraph;
use crate::selection::Selection;
use crate::status::Loadable;

/// Output value folded into a check or metric node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Annotation {
    /// Boolean outcome of a check; `None` until the result is loaded.
    Check {
        artifact_id: ArtifactId,
        passed: Option<bool>,
        /// Whether a failure fails the run or only warns.
        level: CheckLevel,
    },
    /// Value of a metric; `None` until the result is loaded.
    Metric {
        artifact_id: ArtifactId,
        value: Option<f64>,
    },
}

impl Annotation {
    /// Returns the artifact folded into the node.
    pub fn artifact_id(&self) -> ArtifactId {
        match self {
            Self::Check { artifact_id, .. } | Self::Metric { artifact_id, .. } => *artifact_id,
        }
    }
}

/// A node as the canvas draws it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanvasNode {
    /// Node identifier.
    pub id: NodeId,
    /// Node kind.
    #[serde(rename = "type")]
    pub node_type: NodeType,
    /// Display label.
    pub label: String,
    /// Canvas coordinates.
    pub position: Position,
    /// Folded output of a check or metric operator.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotation: Option<Annotation>,
    /// Whether the node is the selected one.
    pub selected: bool,
}

/// An edge as the canvas draws it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct CanvasEdge {
    /// Upstream node.
    pub source: NodeId,
    /// Downstream node.
    pub target: NodeId,
}

/// The final node and edge lists handed to a view layer.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Canvas {
    /// Nodes to draw.
    pub nodes: Vec<CanvasNode>,
    /// Edges to draw.
    pub edges: Vec<CanvasEdge>,
}

/// Finds the artifact each check and metric operator is drawn together with.
///
/// A check pairs with its first boolean output, a metric with its first
/// numeric output. Operators without such an output stay unpaired.
pub fn pair_outputs(dag: &WorkflowDag) -> HashMap<ArtifactId, (NodeId, OperatorType)> {
    let mut pairs = HashMap::new();

    for op in dag.operators.values() {
        let wanted = match op.operator_type() {
            OperatorType::Check => ArtifactType::Bool,
            OperatorType::Metric | OperatorType::SystemMetric => ArtifactType::Numeric,
            _ => continue,
        };

        let output = op.outputs.iter().copied().find(|id| {
            dag.artifacts
                .get(id)
                .is_some_and(|artifact| artifact.artifact_type == wanted)
        });

        match output {
            Some(artifact_id) => {
                pairs.insert(artifact_id, (NodeId::from(op.id), op.operator_type()));
            }
            None => {
                tracing::trace!(
                    target: TRACING_TARGET,
                    operator_id = %op.id,
                    "Operator has no output to fold"
                );
            }
        }
    }

    pairs
}

impl Canvas {
    /// Collapses paired nodes and marks the selected one.
    ///
    /// `artifact_results` supplies the values folded into check and metric
    /// nodes; missing or pending results leave the annotation empty.
    pub fn collapse(
        graph: &PositionedGraph,
        dag: &WorkflowDag,
        artifact_results: &HashMap<ArtifactId, Loadable<ArtifactResult>>,
        selection: &Selection,
    ) -> Self {
        let pairs = pair_outputs(dag);

        let mut annotations: HashMap<NodeId, Annotation> = HashMap::new();
        let mut rewired: HashMap<NodeId, NodeId> = HashMap::new();
        for (artifact_id, (operator, kind)) in &pairs {
            let result = artifact_results.get(artifact_id).and_then(Loadable::value);
            let annotation = match kind {
                OperatorType::Check => Annotation::Check {
                    artifact_id: *artifact_id,
                    passed: result.and_then(ArtifactResult::as_bool),
                    level: dag
                        .operators
                        .get(&OperatorId::from(*operator))
                        .and_then(|op| op.spec.check_level())
                        .unwrap_or_default(),
                },
                _ => Annotation::Metric {
                    artifact_id: *artifact_id,
                    value: result.and_then(ArtifactResult::as_number),
                },
            };
            annotations.insert(*operator, annotation);
            rewired.insert(NodeId::from(*artifact_id), *operator);
        }

        let nodes = graph
            .nodes
            .iter()
            .filter(|node| !rewired.contains_key(&node.id))
            .map(|node| CanvasNode {
                id: node.id,
                node_type: node.node_type,
                label: node.label.clone(),
                position: node.position,
                annotation: annotations.get(&node.id).copied(),
                selected: selection.is_selected(node.id),
            })
            .collect();

        let resolve = |id: NodeId| rewired.get(&id).copied().unwrap_or(id);
        let mut seen = HashSet::new();
        let edges = graph
            .edges
            .iter()
            .map(|edge| CanvasEdge {
                source: resolve(edge.from),
                target: resolve(edge.to),
            })
            .filter(|edge| edge.source != edge.target)
            .filter(|edge| seen.insert(*edge))
            .collect();

        Self { nodes, edges }
    }

    /// Finds a node by id.
    pub fn node(&self, id: NodeId) -> Option<&CanvasNode> {
        self.nodes.iter().find(|node| node.id == id)
    }

    /// Returns whether a node with `id` is drawn.
    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }
}
