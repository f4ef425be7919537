//! Canvas node types.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoStaticStr};

use crate::artifact::ArtifactType;
use crate::operator::OperatorType;

/// Every kind of node the DAG canvas can show.
///
/// Each operator type and each artifact type maps to exactly one member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(AsRefStr, Display, EnumIter, EnumString, IntoStaticStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NodeType {
    TableArtifact,
    NumericArtifact,
    BoolArtifact,
    JsonArtifact,
    StringArtifact,
    ImageArtifact,
    DictArtifact,
    ListArtifact,
    TupleArtifact,
    BytesArtifact,
    GenericArtifact,
    ExtractOp,
    LoadOp,
    FunctionOp,
    MetricOp,
    CheckOp,
    ParamOp,
}

impl NodeType {
    /// Returns the node type drawn for an artifact.
    pub const fn from_artifact_type(artifact_type: ArtifactType) -> Self {
        match artifact_type {
            ArtifactType::Table => Self::TableArtifact,
            ArtifactType::Numeric => Self::NumericArtifact,
            ArtifactType::Bool => Self::BoolArtifact,
            ArtifactType::Json => Self::JsonArtifact,
            ArtifactType::String => Self::StringArtifact,
            ArtifactType::Image => Self::ImageArtifact,
            ArtifactType::Dict => Self::DictArtifact,
            ArtifactType::List => Self::ListArtifact,
            ArtifactType::Tuple => Self::TupleArtifact,
            ArtifactType::Bytes => Self::BytesArtifact,
            ArtifactType::Untyped | ArtifactType::Picklable => Self::GenericArtifact,
        }
    }

    /// Returns the node type drawn for an operator.
    pub const fn from_operator_type(operator_type: OperatorType) -> Self {
        match operator_type {
            OperatorType::Extract => Self::ExtractOp,
            OperatorType::Load => Self::LoadOp,
            OperatorType::Function => Self::FunctionOp,
            OperatorType::Metric | OperatorType::SystemMetric => Self::MetricOp,
            OperatorType::Check => Self::CheckOp,
            OperatorType::Param => Self::ParamOp,
        }
    }

    /// Returns whether this is an artifact node.
    pub const fn is_artifact(&self) -> bool {
        matches!(
            self,
            Self::TableArtifact
                | Self::NumericArtifact
                | Self::BoolArtifact
                | Self::JsonArtifact
                | Self::StringArtifact
                | Self::ImageArtifact
                | Self::DictArtifact
                | Self::ListArtifact
                | Self::TupleArtifact
                | Self::BytesArtifact
                | Self::GenericArtifact
        )
    }

    /// Returns whether this is an operator node.
    pub const fn is_operator(&self) -> bool {
        !self.is_artifact()
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn test_artifact_and_operator_partition() {
        for node_type in NodeType::iter() {
            assert_ne!(node_type.is_artifact(), node_type.is_operator());
        }
        assert_eq!(NodeType::iter().filter(NodeType::is_operator).count(), 6);
    }

    #[test]
    fn test_operator_mapping() {
        assert_eq!(
            NodeType::from_operator_type(OperatorType::SystemMetric),
            NodeType::MetricOp
        );
        assert!(NodeType::from_operator_type(OperatorType::Check).is_operator());
    }

    #[test]
    fn test_artifact_mapping() {
        assert_eq!(
            NodeType::from_artifact_type(ArtifactType::Picklable),
            NodeType::GenericArtifact
        );
        assert!(NodeType::from_artifact_type(ArtifactType::Dict).is_artifact());
    }
}
