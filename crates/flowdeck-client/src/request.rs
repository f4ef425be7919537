//! Request and response bodies that only exist on the wire.

use std::collections::HashMap;

use flowdeck_core::{Artifact, ArtifactId, Operator, OperatorId, RunParameters, WorkflowDag};
use serde::{Deserialize, Serialize};

/// Body of the positioning request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositioningRequest {
    /// Operators to lay out.
    pub operators: HashMap<OperatorId, Operator>,
    /// Artifacts to lay out.
    pub artifacts: HashMap<ArtifactId, Artifact>,
}

impl PositioningRequest {
    /// Builds a request covering every node of `dag`.
    pub fn from_dag(dag: &WorkflowDag) -> Self {
        Self {
            operators: dag.operators.clone(),
            artifacts: dag.artifacts.clone(),
        }
    }
}

/// Body of the trigger request.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct TriggerRequest<'a> {
    #[serde(skip_serializing_if = "no_parameters")]
    pub parameters: &'a RunParameters,
}

fn no_parameters(parameters: &&RunParameters) -> bool {
    parameters.is_empty()
}

/// Application-level error body: `{"error": "..."}`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiErrorBody {
    #[serde(default)]
    pub error: Option<String>,
}

impl ApiErrorBody {
    /// Extracts a non-empty `error` message from a response body.
    pub fn message(body: &[u8]) -> Option<String> {
        serde_json::from_slice::<Self>(body)
            .ok()
            .and_then(|body| body.error)
            .filter(|message| !message.is_empty())
    }
}
