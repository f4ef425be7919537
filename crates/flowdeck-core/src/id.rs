//! Identifier types for workflows, DAG versions, results and nodes.

use std::str::FromStr;

use derive_more::{Debug, Display, From, Into};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[derive(Debug, Display, From, Into)]
        #[debug("{_0}")]
        #[display("{_0}")]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier.
            #[inline]
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Creates an identifier from an existing UUID.
            #[inline]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the underlying UUID.
            #[inline]
            pub const fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::from_str(s)?))
            }
        }

        impl AsRef<Uuid> for $name {
            fn as_ref(&self) -> &Uuid {
                &self.0
            }
        }
    };
}

uuid_id! {
    /// Unique identifier of a workflow.
    WorkflowId
}

uuid_id! {
    /// Unique identifier of one deployed version of a workflow's DAG.
    DagId
}

uuid_id! {
    /// Unique identifier of one execution run of a DAG version.
    DagResultId
}

uuid_id! {
    /// Unique identifier of an operator node.
    OperatorId
}

uuid_id! {
    /// Unique identifier of an artifact node.
    ArtifactId
}

uuid_id! {
    /// Identifier of any node drawn on the canvas, operator or artifact.
    NodeId
}

impl From<OperatorId> for NodeId {
    fn from(id: OperatorId) -> Self {
        Self(id.as_uuid())
    }
}

impl From<ArtifactId> for NodeId {
    fn from(id: ArtifactId) -> Self {
        Self(id.as_uuid())
    }
}

impl From<NodeId> for OperatorId {
    fn from(id: NodeId) -> Self {
        Self(id.as_uuid())
    }
}

impl From<NodeId> for ArtifactId {
    fn from(id: NodeId) -> Self {
        Self(id.as_uuid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_roundtrips_operator_id() {
        let op = OperatorId::from_uuid(Uuid::from_u128(7));
        let node = NodeId::from(op);
        assert_eq!(node.as_uuid(), op.as_uuid());
        assert_eq!(OperatorId::from(node), op);
    }

    #[test]
    fn test_id_from_str() {
        let id: DagId = "00000000-0000-0000-0000-000000000001".parse().unwrap();
        assert_eq!(id.as_uuid(), Uuid::from_u128(1));
        assert!("not-a-uuid".parse::<DagId>().is_err());
    }

    #[test]
    fn test_id_serializes_transparently() {
        let id = ArtifactId::from_uuid(Uuid::from_u128(2));
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"00000000-0000-0000-0000-000000000002\"");
    }
}
