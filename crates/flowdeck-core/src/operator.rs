//! Operator definitions.

use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{AsRefStr, Display, EnumString, IntoStaticStr};

use crate::id::{ArtifactId, OperatorId};

/// The computation kind of an operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(AsRefStr, Display, EnumString, IntoStaticStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OperatorType {
    /// Reads data from an integration.
    Extract,
    /// Writes data to an integration.
    Load,
    /// Runs user code.
    Function,
    /// Computes a numeric metric.
    Metric,
    /// Evaluates a boolean check.
    Check,
    /// Holds a workflow parameter.
    Param,
    /// Metric computed by the platform itself (runtime, memory).
    SystemMetric,
}

/// Severity of a failing check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(AsRefStr, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CheckLevel {
    /// A failing check fails the workflow run.
    Error,
    /// A failing check is reported but the run continues.
    #[default]
    Warning,
}

/// Type-specific operator payload.
///
/// The wire format is `{"type": "check", "check": {...}}`; everything other
/// than the discriminator is kept as raw JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatorSpec {
    /// Operator kind.
    #[serde(rename = "type")]
    pub kind: OperatorType,
    /// Remaining spec fields, keyed by name.
    #[serde(flatten)]
    pub params: Map<String, Value>,
}

impl OperatorSpec {
    /// Creates a spec with no payload.
    pub fn new(kind: OperatorType) -> Self {
        Self {
            kind,
            params: Map::new(),
        }
    }

    /// Adds a payload field.
    pub fn with_param(mut self, key: impl Into<String>, value: Value) -> Self {
        self.params.insert(key.into(), value);
        self
    }

    /// Returns the payload stored under the operator's own kind name.
    pub fn payload(&self) -> Option<&Value> {
        let key: &'static str = self.kind.into();
        self.params.get(key)
    }

    /// Returns the configured severity for check operators.
    pub fn check_level(&self) -> Option<CheckLevel> {
        if self.kind != OperatorType::Check {
            return None;
        }

        let level = self
            .payload()
            .and_then(|check| check.get("level"))
            .and_then(Value::as_str)
            .and_then(|level| level.parse().ok())
            .unwrap_or_default();

        Some(level)
    }

    /// Returns the integration name for extract/load operators.
    pub fn integration(&self) -> Option<&str> {
        match self.kind {
            OperatorType::Extract | OperatorType::Load => self
                .payload()
                .and_then(|spec| spec.get("service"))
                .and_then(Value::as_str),
            _ => None,
        }
    }
}

/// A computation step in a workflow DAG.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
#[builder(
    name = "OperatorBuilder",
    pattern = "owned",
    setter(into, strip_option, prefix = "with")
)]
pub struct Operator {
    /// Operator identifier.
    pub id: OperatorId,
    /// Display name.
    pub name: String,
    /// Optional free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default)]
    pub description: Option<String>,
    /// Type-specific specification.
    pub spec: OperatorSpec,
    /// Artifacts consumed by this operator.
    #[serde(default)]
    #[builder(default)]
    pub inputs: Vec<ArtifactId>,
    /// Artifacts produced by this operator.
    #[serde(default)]
    #[builder(default)]
    pub outputs: Vec<ArtifactId>,
}

impl Operator {
    /// Returns a builder for creating an operator.
    pub fn builder() -> OperatorBuilder {
        OperatorBuilder::default()
    }

    /// Returns the operator kind.
    pub fn operator_type(&self) -> OperatorType {
        self.spec.kind
    }
}
