//! Canvas coordinates computed for a DAG.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::id::{ArtifactId, NodeId, OperatorId};

/// Position of a node on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    /// X coordinate.
    pub x: f32,
    /// Y coordinate.
    pub y: f32,
}

impl Position {
    /// Creates a new position.
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Node coordinates for one DAG, as returned by the positioning endpoint.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DagLayout {
    /// Operator positions keyed by id.
    #[serde(default)]
    pub operator_positions: HashMap<OperatorId, Position>,
    /// Artifact positions keyed by id.
    #[serde(default)]
    pub artifact_positions: HashMap<ArtifactId, Position>,
}

impl DagLayout {
    /// Returns the position of a node, whichever kind it is.
    pub fn position(&self, id: NodeId) -> Option<Position> {
        self.operator_positions
            .get(&OperatorId::from(id))
            .or_else(|| self.artifact_positions.get(&ArtifactId::from(id)))
            .copied()
    }

    /// Returns the number of positioned nodes.
    pub fn len(&self) -> usize {
        self.operator_positions.len() + self.artifact_positions.len()
    }

    /// Returns whether no node is positioned.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_lookup_by_node_id() {
        let op = OperatorId::new();
        let artifact = ArtifactId::new();
        let layout = DagLayout {
            operator_positions: HashMap::from([(op, Position::new(1.0, 2.0))]),
            artifact_positions: HashMap::from([(artifact, Position::new(3.0, 4.0))]),
        };

        assert_eq!(layout.position(op.into()), Some(Position::new(1.0, 2.0)));
        assert_eq!(layout.position(artifact.into()), Some(Position::new(3.0, 4.0)));
        assert_eq!(layout.position(NodeId::new()), None);
        assert_eq!(layout.len(), 2);
    }
}
