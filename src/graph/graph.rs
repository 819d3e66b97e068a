//! Runtime chain representation using a directed graph.
//!
//! This module provides the in-memory graph the session owns for its
//! lifetime. It wraps the chain in a directed graph structure (using
//! petgraph) for lookup and single-hop traversal.

use std::collections::HashMap;

use petgraph::{
    Direction,
    graph::{DiGraph, NodeIndex},
    visit::EdgeRef,
};

use crate::{
    AnimflowError, GraphModel, Result, ShareLock,
    generate::GenerationOutcome,
    graph::{
        edge::{Edge, EdgeId},
        node::{GenerationState, Node, NodeId, NodeKind},
    },
};

/// Runtime chain representation as a directed graph.
///
/// The graph maintains the typed nodes and the directed edges between
/// them. Reads hand out clones of nodes and edges; payload mutation goes
/// through the kind-checked update operations, which are the only way a
/// node changes after creation.
#[derive(Clone)]
pub struct Graph {
    /// Thread-safe directed graph storing nodes and edges.
    graph: ShareLock<DiGraph<Node, Edge>>,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Graph {
    /// create a new empty graph
    pub fn new() -> Self {
        Self {
            graph: ShareLock::new(DiGraph::new().into()),
        }
    }

    /// Output a human-readable representation of the chain
    pub fn schema(&self) -> String {
        let graph = self.graph.read().unwrap();
        let mut lines = Vec::new();

        lines.push("=== Chain Graph ===".to_string());
        lines.push(format!("Nodes: {}, Edges: {}", graph.node_count(), graph.edge_count()));
        lines.push(String::new());

        lines.push("--- Nodes ---".to_string());
        for idx in graph.node_indices() {
            let node = &graph[idx];
            let state = node.output().map(|o| format!(", state: {}", o.state.as_ref())).unwrap_or_default();
            lines.push(format!("[{}] kind: {}{}", node.id, node.kind().as_ref(), state));
        }
        lines.push(String::new());

        lines.push("--- Edges ---".to_string());
        for idx in graph.edge_indices() {
            let edge = &graph[idx];
            lines.push(format!("{} --> {} (id: {})", edge.source, edge.target, edge.id));
        }

        lines.join("\n")
    }

    /// add node to graph, returning its id
    pub fn add_node(
        &self,
        node: Node,
    ) -> NodeId {
        let id = node.id.clone();
        let mut graph = self.graph.write().unwrap();
        graph.add_node(node);
        id
    }

    /// connect two existing nodes with a fresh edge
    pub fn connect(
        &self,
        source: &NodeId,
        target: &NodeId,
    ) -> Result<EdgeId> {
        let mut graph = self.graph.write().unwrap();
        let source_idx = Self::index_of(&graph, source).ok_or(AnimflowError::Edge(format!("source node {} not found", source)))?;
        let target_idx = Self::index_of(&graph, target).ok_or(AnimflowError::Edge(format!("target node {} not found", target)))?;

        let edge = Edge::connect(source, target);
        let id = edge.id.clone();
        graph.add_edge(source_idx, target_idx, edge);
        Ok(id)
    }

    /// get node by id
    pub fn get_node(
        &self,
        id: &NodeId,
    ) -> Option<Node> {
        let graph = self.graph.read().unwrap();
        Self::index_of(&graph, id).map(|idx| graph[idx].clone())
    }

    /// get the kind of a node by id
    pub fn node_kind(
        &self,
        id: &NodeId,
    ) -> Option<NodeKind> {
        self.get_node(id).map(|n| n.kind())
    }

    /// get the generation state of an output node by id
    pub fn generation_state(
        &self,
        id: &NodeId,
    ) -> Option<GenerationState> {
        self.get_node(id).and_then(|n| n.output().map(|o| o.state))
    }

    /// Get the incoming edge of a node.
    ///
    /// The chain topology gives each node at most one incoming edge; when
    /// several exist the first encountered is used, which is visible to
    /// callers as an ambiguity of the malformed graph.
    pub fn incoming_edge(
        &self,
        id: &NodeId,
    ) -> Option<Edge> {
        let graph = self.graph.read().unwrap();
        Self::index_of(&graph, id).and_then(|idx| graph.edges_directed(idx, Direction::Incoming).map(|edge_ref| edge_ref.weight().clone()).next())
    }

    /// Get the outgoing edge of a node, first found.
    pub fn outgoing_edge(
        &self,
        id: &NodeId,
    ) -> Option<Edge> {
        let graph = self.graph.read().unwrap();
        Self::index_of(&graph, id).and_then(|idx| graph.edges_directed(idx, Direction::Outgoing).map(|edge_ref| edge_ref.weight().clone()).next())
    }

    /// Get the first node of the given kind in insertion order.
    pub fn first_node_of_kind(
        &self,
        kind: NodeKind,
    ) -> Option<Node> {
        let graph = self.graph.read().unwrap();
        graph.node_indices().find(|idx| graph[*idx].kind() == kind).map(|idx| graph[idx].clone())
    }

    /// Replace the markup of a source asset node.
    pub fn update_source_markup(
        &self,
        id: &NodeId,
        markup: impl Into<String>,
    ) -> Result<()> {
        self.with_node_mut(id, |node| node.set_markup(markup))
    }

    /// Replace the prompt of an instruction node.
    pub fn update_instruction_prompt(
        &self,
        id: &NodeId,
        prompt: impl Into<String>,
    ) -> Result<()> {
        self.with_node_mut(id, |node| node.set_prompt(prompt))
    }

    /// Move an output node into `Loading`.
    pub(crate) fn begin_generation(
        &self,
        id: &NodeId,
    ) -> Result<()> {
        self.with_node_mut(id, |node| node.begin_generation())
    }

    /// Record a successful generation on an output node.
    pub(crate) fn complete_generation(
        &self,
        id: &NodeId,
        outcome: &GenerationOutcome,
    ) -> Result<()> {
        self.with_node_mut(id, |node| node.complete_generation(outcome))
    }

    /// Record a failed generation on an output node, preserving the last
    /// good output content.
    pub(crate) fn fail_generation(
        &self,
        id: &NodeId,
    ) -> Result<()> {
        self.with_node_mut(id, |node| node.fail_generation())
    }

    /// Replace the whole graph with the content of a serialized model.
    pub fn load_model(
        &self,
        model: &GraphModel,
    ) -> Result<()> {
        let loaded = Self::build(model)?;
        let mut graph = self.graph.write().unwrap();
        *graph = loaded;
        Ok(())
    }

    fn build(model: &GraphModel) -> Result<DiGraph<Node, Edge>> {
        let mut graph: DiGraph<Node, Edge> = DiGraph::new();

        let mut nodes = HashMap::new();

        for node in model.nodes.iter() {
            let node = Node::new(node)?;
            let nid = node.id.clone();
            let node_idx = graph.add_node(node);
            nodes.insert(nid, node_idx);
        }
        for edge in model.edges.iter() {
            let edge = Edge::new(edge)?;
            let source = nodes.get(&edge.source).ok_or(AnimflowError::Edge(format!("source node {} not found", edge.source)))?;
            let target = nodes.get(&edge.target).ok_or(AnimflowError::Edge(format!("target node {} not found", edge.target)))?;
            graph.add_edge(*source, *target, edge);
        }
        Ok(graph)
    }

    fn index_of(
        graph: &DiGraph<Node, Edge>,
        id: &NodeId,
    ) -> Option<NodeIndex> {
        graph.node_indices().find(|idx| graph[*idx].id.eq(id))
    }

    fn with_node_mut<T>(
        &self,
        id: &NodeId,
        f: impl FnOnce(&mut Node) -> Result<T>,
    ) -> Result<T> {
        let mut graph = self.graph.write().unwrap();
        let idx = Self::index_of(&graph, id).ok_or(AnimflowError::Node(format!("node {} not found", id)))?;
        f(&mut graph[idx])
    }
}

impl TryFrom<&GraphModel> for Graph {
    type Error = AnimflowError;

    fn try_from(model: &GraphModel) -> Result<Self> {
        let graph = Self::build(model)?;
        Ok(Self {
            graph: ShareLock::new(graph.into()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::node::NodePayload;

    fn chain_graph() -> Graph {
        let model = GraphModel::from_json(
            r#"{
            "nodes": [
                { "id": "src", "kind": "source_asset", "payload": { "markup": "<svg/>" } },
                { "id": "ins", "kind": "instruction", "payload": { "prompt": "wiggle" } },
                { "id": "out", "kind": "generation_output" }
            ],
            "edges": [
                { "source": "src", "target": "ins" },
                { "source": "ins", "target": "out" }
            ]
        }"#,
        )
        .unwrap();
        Graph::try_from(&model).unwrap()
    }

    // ==================== lookup tests ====================

    #[test]
    fn test_get_node() {
        let graph = chain_graph();
        let node = graph.get_node(&"ins".to_string()).unwrap();
        assert_eq!(node.kind(), NodeKind::Instruction);
        assert_eq!(node.prompt(), Some("wiggle"));

        assert!(graph.get_node(&"ghost".to_string()).is_none());
    }

    #[test]
    fn test_incoming_and_outgoing_edges() {
        let graph = chain_graph();

        let incoming = graph.incoming_edge(&"out".to_string()).unwrap();
        assert_eq!(incoming.source, "ins");

        let outgoing = graph.outgoing_edge(&"ins".to_string()).unwrap();
        assert_eq!(outgoing.target, "out");

        assert!(graph.incoming_edge(&"src".to_string()).is_none());
        assert!(graph.outgoing_edge(&"out".to_string()).is_none());
    }

    #[test]
    fn test_first_node_of_kind_is_insertion_order() {
        let graph = chain_graph();
        let second_instruction = Node::with_kind(NodeKind::Instruction);
        graph.add_node(second_instruction);

        let first = graph.first_node_of_kind(NodeKind::Instruction).unwrap();
        assert_eq!(first.id, "ins");
    }

    // ==================== mutation tests ====================

    #[test]
    fn test_connect_unknown_node_fails() {
        let graph = chain_graph();
        let result = graph.connect(&"src".to_string(), &"ghost".to_string());
        assert!(matches!(result, Err(AnimflowError::Edge(_))));
    }

    #[test]
    fn test_update_rejects_kind_mismatch() {
        let graph = chain_graph();
        let result = graph.update_source_markup(&"ins".to_string(), "<svg/>");
        assert!(matches!(result, Err(AnimflowError::Node(_))));

        // the node is untouched
        let node = graph.get_node(&"ins".to_string()).unwrap();
        assert_eq!(
            node.payload(),
            &NodePayload::Instruction {
                prompt: "wiggle".to_string()
            }
        );

        // the matching update goes through
        graph.update_instruction_prompt(&"ins".to_string(), "bounce").unwrap();
        let node = graph.get_node(&"ins".to_string()).unwrap();
        assert_eq!(node.prompt(), Some("bounce"));
    }

    #[test]
    fn test_generation_state_transitions() {
        let graph = chain_graph();
        let out = "out".to_string();

        assert_eq!(graph.generation_state(&out), Some(GenerationState::Idle));

        graph.begin_generation(&out).unwrap();
        assert_eq!(graph.generation_state(&out), Some(GenerationState::Loading));

        graph
            .complete_generation(
                &out,
                &GenerationOutcome {
                    output_content: "<svg>done</svg>".to_string(),
                    model_used: "gemini-2.5-flash".to_string(),
                },
            )
            .unwrap();
        assert_eq!(graph.generation_state(&out), Some(GenerationState::Succeeded));

        graph.begin_generation(&out).unwrap();
        graph.fail_generation(&out).unwrap();
        let node = graph.get_node(&out).unwrap();
        let output = node.output().unwrap();
        assert_eq!(output.state, GenerationState::Failed);
        assert_eq!(output.output_content.as_deref(), Some("<svg>done</svg>"));
    }
}
