//! Node selection cursor and detail panels.

use flowdeck_core::{NodeId, NodeType};
use serde::Serialize;

/// The node whose details are shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SelectedNode {
    /// Selected node.
    pub id: NodeId,
    /// Kind of the selected node.
    #[serde(rename = "type")]
    pub node_type: NodeType,
}

/// Open/closed state of the two detail drawers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PanelState {
    /// Bottom drawer (run logs and status).
    pub bottom_open: bool,
    /// Right drawer (node details).
    pub right_open: bool,
}

impl PanelState {
    /// Returns whether both drawers are closed.
    pub fn is_closed(&self) -> bool {
        !self.bottom_open && !self.right_open
    }
}

/// Selection cursor: at most one selected node plus the drawers it opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Selection {
    node: Option<SelectedNode>,
    panels: PanelState,
}

impl Selection {
    /// Selects a node and opens both drawers.
    pub fn click_node(&mut self, id: NodeId, node_type: NodeType) {
        self.node = Some(SelectedNode { id, node_type });
        self.panels = PanelState {
            bottom_open: true,
            right_open: true,
        };
    }

    /// Clears the selection and closes both drawers.
    pub fn click_pane(&mut self) {
        *self = Self::default();
    }

    /// Returns the selected node.
    pub fn node(&self) -> Option<&SelectedNode> {
        self.node.as_ref()
    }

    /// Returns the drawer state.
    pub fn panels(&self) -> PanelState {
        self.panels
    }

    /// Returns whether `id` is the selected node.
    pub fn is_selected(&self, id: NodeId) -> bool {
        self.node.is_some_and(|node| node.id == id)
    }
}
