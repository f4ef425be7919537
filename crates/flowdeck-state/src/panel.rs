//! Detail side-panel dispatch.

use flowdeck_core::{
    ArtifactId, ArtifactResult, CheckLevel, Logs, NodeType, OperatorId, SerializationType,
    TableData,
};
use serde::Serialize;
use serde_json::Value;
use strum::{AsRefStr, Display, EnumIter, IntoEnumIterator};

use crate::TRACING_TARGET;
use crate::status::{Loadable, LoadingStatus};
use crate::store::WorkflowStore;

/// Which detail view a node type gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[derive(AsRefStr, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SideSheetView {
    /// Preview of an artifact's value.
    DataPreview,
    /// Operator run details with tabs.
    OperatorResults,
    /// Workflow parameter value.
    Parameter,
}

impl SideSheetView {
    /// Maps every node type to its view.
    pub const fn for_node_type(node_type: NodeType) -> Self {
        match node_type {
            NodeType::TableArtifact
            | NodeType::NumericArtifact
            | NodeType::BoolArtifact
            | NodeType::JsonArtifact
            | NodeType::StringArtifact
            | NodeType::ImageArtifact
            | NodeType::DictArtifact
            | NodeType::ListArtifact
            | NodeType::TupleArtifact
            | NodeType::BytesArtifact
            | NodeType::GenericArtifact => Self::DataPreview,
            NodeType::ExtractOp
            | NodeType::LoadOp
            | NodeType::FunctionOp
            | NodeType::MetricOp
            | NodeType::CheckOp => Self::OperatorResults,
            NodeType::ParamOp => Self::Parameter,
        }
    }
}

/// Tabs of the operator results view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[derive(AsRefStr, Display, EnumIter)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OperatorTab {
    Overview,
    Inputs,
    Outputs,
    Logs,
}

/// Decoded artifact content, shaped by its serialization type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Preview {
    /// Schema and rows.
    Table(TableData),
    /// Arbitrary JSON.
    Json(Value),
    /// Plain text (strings, numbers, booleans).
    Text(String),
    /// Base64 image data.
    Image(String),
    /// Opaque payload the view can only describe.
    Binary {
        serialization_type: SerializationType,
        size: usize,
    },
}

impl Preview {
    /// Decodes the content of a materialized artifact result.
    ///
    /// Returns `None` while the artifact has no content.
    pub fn from_result(result: &ArtifactResult) -> Option<Self> {
        let content = result.content().ok()?;

        let preview = match result.serialization_type {
            SerializationType::Table => match result.as_table() {
                Ok(table) => Self::Table(table),
                Err(error) => {
                    tracing::warn!(
                        target: TRACING_TARGET,
                        error = %error,
                        "Table content could not be decoded, showing raw text"
                    );
                    Self::Text(content.to_owned())
                }
            },
            SerializationType::Json => match serde_json::from_str(content) {
                Ok(value) => Self::Json(value),
                Err(_) => Self::Text(content.to_owned()),
            },
            SerializationType::String => Self::Text(content.to_owned()),
            SerializationType::Image => Self::Image(content.to_owned()),
            kind @ (SerializationType::Bytes | SerializationType::Pickle) => Self::Binary {
                serialization_type: kind,
                size: content.len(),
            },
        };

        Some(preview)
    }
}

/// Which artifact a data preview shows, and what is loaded of it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataPreviewContent {
    /// Previewed artifact.
    pub artifact_id: ArtifactId,
    /// Artifact node kind.
    pub node_type: NodeType,
    /// Artifact name.
    pub name: String,
    /// Fetch state of the artifact result.
    pub status: LoadingStatus,
    /// How the value was serialized, once known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serialization_type: Option<SerializationType>,
    /// Decoded value, once available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<Preview>,
}

/// Operator details, split in tabs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperatorResultsContent {
    /// Operator shown.
    pub operator_id: OperatorId,
    /// Operator node kind.
    pub node_type: NodeType,
    /// Operator name.
    pub name: String,
    /// Severity of a check operator.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_level: Option<CheckLevel>,
    /// Integration an extract or load operator talks to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub integration: Option<String>,
    /// Tabs in display order.
    pub tabs: Vec<OperatorTab>,
    /// Input artifacts (inputs tab).
    pub inputs: Vec<ArtifactId>,
    /// Output artifacts (outputs tab).
    pub outputs: Vec<ArtifactId>,
    /// Fetch state of the operator result.
    pub status: LoadingStatus,
    /// Execution status of the operator in this run, once known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exec_status: Option<flowdeck_core::ExecutionStatus>,
    /// Captured output (logs tab), once known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logs: Option<Logs>,
}

/// A workflow parameter and its value in this run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterContent {
    /// Parameter operator.
    pub operator_id: OperatorId,
    /// Parameter name.
    pub name: String,
    /// Artifact carrying the value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_id: Option<ArtifactId>,
    /// Fetch state of the value.
    pub status: LoadingStatus,
    /// Value used by the run, once loaded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Preview>,
}

/// What the side panel shows.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum SideSheetContent {
    /// Nothing selected.
    #[default]
    None,
    /// Artifact preview.
    DataPreview(DataPreviewContent),
    /// Operator run details.
    OperatorResults(OperatorResultsContent),
    /// Parameter value.
    Parameter(ParameterContent),
}

impl SideSheetContent {
    /// Builds the side panel for the store's current selection.
    ///
    /// Every node type resolves to a view; only an empty selection, or a
    /// node that is not part of the active DAG, yields [`SideSheetContent::None`].
    pub fn from_store(store: &WorkflowStore) -> Self {
        let (Some(node), Some(dag)) = (store.selection().node(), store.active_dag()) else {
            return Self::None;
        };

        match SideSheetView::for_node_type(node.node_type) {
            SideSheetView::DataPreview => {
                let artifact_id = ArtifactId::from(node.id);
                let Some(artifact) = dag.artifacts.get(&artifact_id) else {
                    return Self::None;
                };
                let loadable = store.artifact_result(artifact_id);
                let result = loadable.and_then(Loadable::value);

                Self::DataPreview(DataPreviewContent {
                    artifact_id,
                    node_type: node.node_type,
                    name: artifact.name.clone(),
                    status: status_of(loadable),
                    serialization_type: result.map(|r| r.serialization_type),
                    preview: result.and_then(Preview::from_result),
                })
            }
            SideSheetView::OperatorResults => {
                let operator_id = OperatorId::from(node.id);
                let Some(operator) = dag.operators.get(&operator_id) else {
                    return Self::None;
                };
                let loadable = store.operator_result(operator_id);
                let result = loadable.and_then(Loadable::value);

                Self::OperatorResults(OperatorResultsContent {
                    operator_id,
                    node_type: node.node_type,
                    name: operator.name.clone(),
                    check_level: operator.spec.check_level(),
                    integration: operator.spec.integration().map(str::to_owned),
                    tabs: OperatorTab::iter().collect(),
                    inputs: operator.inputs.clone(),
                    outputs: operator.outputs.clone(),
                    status: status_of(loadable),
                    exec_status: result.map(|r| r.exec_state.status),
                    logs: result.and_then(|r| r.logs.clone()),
                })
            }
            SideSheetView::Parameter => {
                let operator_id = OperatorId::from(node.id);
                let Some(operator) = dag.operators.get(&operator_id) else {
                    return Self::None;
                };
                let artifact_id = operator.outputs.first().copied();
                let loadable = artifact_id.and_then(|id| store.artifact_result(id));

                Self::Parameter(ParameterContent {
                    operator_id,
                    name: operator.name.clone(),
                    artifact_id,
                    status: status_of(loadable),
                    value: loadable
                        .and_then(Loadable::value)
                        .and_then(Preview::from_result),
                })
            }
        }
    }

    /// Returns which view this content is for, if any.
    pub fn view(&self) -> Option<SideSheetView> {
        match self {
            Self::None => None,
            Self::DataPreview(_) => Some(SideSheetView::DataPreview),
            Self::OperatorResults(_) => Some(SideSheetView::OperatorResults),
            Self::Parameter(_) => Some(SideSheetView::Parameter),
        }
    }
}

fn status_of<T>(loadable: Option<&Loadable<T>>) -> LoadingStatus {
    loadable
        .map(|l| l.status().clone())
        .unwrap_or_default()
}
