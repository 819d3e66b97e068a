//! Chain edge definitions.
//!
//! Edges are directed and unlabeled; the chain topology gives each node at
//! most one incoming edge, enforced at query time rather than structurally.

use serde::{Deserialize, Serialize};

use crate::{AnimflowError, Result, graph::node::NodeId, model::EdgeModel, utils};

/// edge id
pub type EdgeId = String;

/// Directed edge between two chain nodes.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Edge {
    /// edge id
    pub id: EdgeId,
    /// id of the source node
    pub source: NodeId,
    /// id of the target node
    pub target: NodeId,
}

impl Edge {
    /// Creates a runtime edge from its serialized model, generating an id
    /// when the model carries none.
    pub fn new(model: &EdgeModel) -> Result<Self> {
        if model.source.is_empty() || model.target.is_empty() {
            return Err(AnimflowError::Edge("edge source and target must not be empty".to_string()));
        }

        Ok(Self {
            id: model.id.clone().unwrap_or_else(utils::longid),
            source: model.source.clone(),
            target: model.target.clone(),
        })
    }

    /// Creates a fresh edge between two nodes with a generated id.
    pub fn connect(
        source: &NodeId,
        target: &NodeId,
    ) -> Self {
        Self {
            id: utils::longid(),
            source: source.clone(),
            target: target.clone(),
        }
    }
}
