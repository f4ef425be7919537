#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod canvas;
mod layout;
mod panel;
mod selection;
mod selector;
mod session;
mod status;
mod store;

pub use canvas::{Annotation, Canvas, CanvasEdge, CanvasNode, pair_outputs};
pub use layout::{PositionedGraph, PositionedNode};
pub use panel::{
    DataPreviewContent, OperatorResultsContent, OperatorTab, ParameterContent, Preview,
    SideSheetContent, SideSheetView,
};
pub use selection::{PanelState, SelectedNode, Selection};
pub use selector::{ResultOption, initial_index};
pub use session::WorkflowSession;
pub use status::{Loadable, LoadingStatus};
pub use store::{Epoch, NodeFetch, Ticket, WorkflowStore};

/// Tracing target for store and canvas operations.
pub const TRACING_TARGET: &str = "flowdeck_state";
