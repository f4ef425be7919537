#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod artifact;
mod dag;
mod error;
mod id;
mod layout;
mod node;
mod operator;
mod result;
mod schedule;
mod table;
mod workflow;

#[doc(hidden)]
pub mod prelude;

pub use artifact::{Artifact, ArtifactBuilder, ArtifactType};
pub use dag::{DagEdge, RetentionPolicy, WorkflowDag, WorkflowMetadata};
pub use error::{BoxedError, Error, ErrorKind, Result};
pub use id::{ArtifactId, DagId, DagResultId, NodeId, OperatorId, WorkflowId};
pub use layout::{DagLayout, Position};
pub use node::NodeType;
pub use operator::{CheckLevel, Operator, OperatorBuilder, OperatorSpec, OperatorType};
pub use result::{
    ArtifactResult, ExecError, ExecState, ExecTimestamps, ExecutionStatus, FailureType, Logs,
    OperatorResult, SerializationType, WorkflowDagResult,
};
pub use schedule::{PeriodUnit, PeriodicSchedule, Schedule, TriggerType};
pub use table::{TableData, TableField};
pub use workflow::{RunParameters, WorkflowSnapshot, WorkflowUpdate, WorkflowUpdateBuilder};

/// Tracing target for core model operations.
pub const TRACING_TARGET: &str = "flowdeck_core";
