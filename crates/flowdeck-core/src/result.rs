//! Execution results: DAG runs and per-node outcomes.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString, IntoStaticStr};

use crate::artifact::ArtifactType;
use crate::error::{Error, Result};
use crate::id::{DagId, DagResultId};
use crate::table::TableData;

/// Execution status shared by runs, operators and artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[derive(AsRefStr, Display, EnumString, IntoStaticStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ExecutionStatus {
    #[default]
    Unknown,
    Registered,
    Pending,
    Running,
    Succeeded,
    Failed,
    Canceled,
}

impl ExecutionStatus {
    /// Returns whether execution has finished, successfully or not.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Canceled)
    }

    /// Returns whether no outcome exists yet.
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Registered | Self::Pending | Self::Running)
    }
}

/// Why a node failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureType {
    /// The platform itself failed.
    System,
    /// User code raised.
    UserFatal,
    /// User code failed in a way that does not fail the run (warning checks).
    UserNonFatal,
}

/// Error details attached to a failed execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecError {
    /// Raw error context, typically a stack trace.
    #[serde(default)]
    pub context: String,
    /// Short hint for the user.
    #[serde(default)]
    pub tip: String,
}

/// Timestamps recorded as execution moves through its statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExecTimestamps {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registered_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub running_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<Timestamp>,
}

/// Execution state of a run or node.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExecState {
    /// Current status.
    #[serde(default)]
    pub status: ExecutionStatus,
    /// Failure classification when failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_type: Option<FailureType>,
    /// Failure details when failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ExecError>,
    /// Status transition timestamps.
    #[serde(default)]
    pub timestamps: ExecTimestamps,
}

impl ExecState {
    /// Creates a state with the given status and no details.
    pub fn with_status(status: ExecutionStatus) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }
}

/// One execution run of a DAG version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowDagResult {
    /// Run identifier.
    pub id: DagResultId,
    /// The DAG version that was executed.
    pub workflow_dag_id: DagId,
    /// Run execution state.
    #[serde(default)]
    pub exec_state: ExecState,
    /// When the run was created.
    pub created_at: Timestamp,
}

impl WorkflowDagResult {
    /// Returns the run status.
    pub fn status(&self) -> ExecutionStatus {
        self.exec_state.status
    }
}

/// How an artifact's value was serialized by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(AsRefStr, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SerializationType {
    String,
    Table,
    Json,
    Bytes,
    Image,
    Pickle,
}

/// Materialized value of an artifact for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactResult {
    /// Artifact value type.
    #[serde(default)]
    pub artifact_type: ArtifactType,
    /// Serialization of `content_serialized`.
    pub serialization_type: SerializationType,
    /// Serialized value; absent while the artifact is not materialized.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_serialized: Option<String>,
    /// Artifact execution state.
    #[serde(default)]
    pub exec_state: ExecState,
}

impl ArtifactResult {
    /// Creates a materialized result.
    pub fn new(
        artifact_type: ArtifactType,
        serialization_type: SerializationType,
        content: impl Into<String>,
    ) -> Self {
        Self {
            artifact_type,
            serialization_type,
            content_serialized: Some(content.into()),
            exec_state: ExecState::with_status(ExecutionStatus::Succeeded),
        }
    }

    /// Returns the serialized content, or a pending-result error.
    pub fn content(&self) -> Result<&str> {
        self.content_serialized.as_deref().ok_or_else(|| {
            Error::pending_result().with_message(format!(
                "artifact result is {} and has no content",
                self.exec_state.status
            ))
        })
    }

    /// Interprets the content as a boolean (check outputs).
    pub fn as_bool(&self) -> Option<bool> {
        match self.content_serialized.as_deref()?.trim() {
            "true" | "True" => Some(true),
            "false" | "False" => Some(false),
            _ => None,
        }
    }

    /// Interprets the content as a number (metric outputs).
    pub fn as_number(&self) -> Option<f64> {
        self.content_serialized.as_deref()?.trim().parse().ok()
    }

    /// Decodes a table payload.
    pub fn as_table(&self) -> Result<TableData> {
        if self.serialization_type != SerializationType::Table {
            return Err(Error::invalid_input().with_message(format!(
                "artifact is serialized as {}, not table",
                self.serialization_type
            )));
        }
        TableData::parse(self.content()?)
    }
}

/// Captured output of an operator's user code.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Logs {
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub stderr: String,
}

/// Execution outcome of an operator for one run.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OperatorResult {
    /// Operator execution state.
    #[serde(default)]
    pub exec_state: ExecState,
    /// User code logs, if captured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logs: Option<Logs>,
}
