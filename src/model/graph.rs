use serde::{Deserialize, Serialize};

use crate::{
    AnimflowError, Result,
    model::{EdgeModel, NodeModel},
};

/// Serialized form of a chain, as produced by the canvas collaborator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphModel {
    #[serde(default)]
    pub name: String,
    pub nodes: Vec<NodeModel>,
    pub edges: Vec<EdgeModel>,
}

impl GraphModel {
    pub fn from_json(s: &str) -> Result<Self> {
        let graph = serde_json::from_str::<GraphModel>(s);
        match graph {
            Ok(v) => Ok(v),
            Err(e) => Err(AnimflowError::Graph(format!("{}", e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeKind;

    #[test]
    fn test_graph_model_from_json() {
        let json = r#"{
            "name": "demo",
            "nodes": [
                { "id": "n1", "kind": "source_asset", "payload": { "markup": "<svg></svg>" } },
                { "id": "n2", "kind": "instruction", "payload": { "prompt": "spin it" } },
                { "id": "n3", "kind": "generation_output" }
            ],
            "edges": [
                { "source": "n1", "target": "n2" },
                { "source": "n2", "target": "n3" }
            ]
        }"#;

        let model = GraphModel::from_json(json).unwrap();
        assert_eq!(model.name, "demo");
        assert_eq!(model.nodes.len(), 3);
        assert_eq!(model.nodes[0].kind, NodeKind::SourceAsset);
        assert_eq!(model.edges.len(), 2);
        assert!(model.edges[0].id.is_none());
    }

    #[test]
    fn test_graph_model_rejects_unknown_kind() {
        let json = r#"{
            "nodes": [ { "id": "n1", "kind": "sticker" } ],
            "edges": []
        }"#;

        let result = GraphModel::from_json(json);
        assert!(result.is_err());
    }
}
