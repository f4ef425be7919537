//! Prelude module for convenient imports.
//!
//! ```rust
//! use flowdeck_core::prelude::*;
//! ```

pub use crate::{
    Artifact, ArtifactId, ArtifactResult, ArtifactType, DagId, DagResultId, Error, ErrorKind,
    NodeId, NodeType, Operator, OperatorId, OperatorResult, OperatorType, Result, WorkflowDag,
    WorkflowDagResult, WorkflowId, WorkflowSnapshot,
};
