use serde::{Deserialize, Serialize};

use crate::graph::NodeKind;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeModel {
    pub id: String,
    pub kind: NodeKind,
    /// Kind-specific payload, validated against the kind's schema on load.
    #[serde(default)]
    pub payload: serde_json::Value,
}
