//! Artifact definitions.

use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString, IntoStaticStr};

use crate::id::ArtifactId;

/// The value type an artifact holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[derive(AsRefStr, Display, EnumString, IntoStaticStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ArtifactType {
    #[default]
    Untyped,
    String,
    Bool,
    Numeric,
    Dict,
    Tuple,
    List,
    Table,
    Json,
    Bytes,
    Image,
    Picklable,
}

/// A value node in a workflow DAG, produced or consumed by operators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
#[builder(
    name = "ArtifactBuilder",
    pattern = "owned",
    setter(into, strip_option, prefix = "with")
)]
pub struct Artifact {
    /// Artifact identifier.
    pub id: ArtifactId,
    /// Display name.
    pub name: String,
    /// Optional free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default)]
    pub description: Option<String>,
    /// Value type.
    #[serde(rename = "type", default)]
    #[builder(default)]
    pub artifact_type: ArtifactType,
}

impl Artifact {
    /// Creates an artifact with the given name and type.
    pub fn new(id: ArtifactId, name: impl Into<String>, artifact_type: ArtifactType) -> Self {
        Self {
            id,
            name: name.into(),
            description: None,
            artifact_type,
        }
    }

    /// Returns a builder for creating an artifact.
    pub fn builder() -> ArtifactBuilder {
        ArtifactBuilder::default()
    }
}
