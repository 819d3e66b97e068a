//! Chain resolution.
//!
//! Pure, synchronous functions that locate the collaborators a generation
//! needs from any starting node, by following single incoming or outgoing
//! edges over a graph snapshot. A missing or malformed link is a data
//! condition reported as the specific missing role, never a panic.

use crate::{AnimflowError, Result, graph::{Graph, NodeId, NodeKind}};

/// Find the source asset feeding an instruction node.
///
/// Follows the single incoming edge of the instruction node; fails with
/// [`AnimflowError::MissingSource`] when no edge exists or the upstream
/// node is not a source asset.
pub fn resolve_for_instruction(
    graph: &Graph,
    instruction_id: &NodeId,
) -> Result<NodeId> {
    let edge = graph.incoming_edge(instruction_id).ok_or(AnimflowError::MissingSource)?;
    match graph.node_kind(&edge.source) {
        Some(NodeKind::SourceAsset) => Ok(edge.source),
        _ => Err(AnimflowError::MissingSource),
    }
}

/// Find the (source, instruction) pair feeding an output node.
///
/// Follows the incoming edge of the output node to the instruction (fails
/// with [`AnimflowError::MissingInstruction`] when absent or of the wrong
/// kind), then the instruction's incoming edge to the source (fails with
/// [`AnimflowError::MissingSource`]).
pub fn resolve_for_output(
    graph: &Graph,
    output_id: &NodeId,
) -> Result<(NodeId, NodeId)> {
    let edge = graph.incoming_edge(output_id).ok_or(AnimflowError::MissingInstruction)?;
    let instruction_id = match graph.node_kind(&edge.source) {
        Some(NodeKind::Instruction) => edge.source,
        _ => return Err(AnimflowError::MissingInstruction),
    };

    let source_id = resolve_for_instruction(graph, &instruction_id)?;
    Ok((source_id, instruction_id))
}

/// Pick the default instruction node: the first-inserted node of kind
/// instruction. Fails with [`AnimflowError::MissingInstruction`] when the
/// graph has none.
pub fn resolve_default_instruction(graph: &Graph) -> Result<NodeId> {
    graph.first_node_of_kind(NodeKind::Instruction).map(|n| n.id).ok_or(AnimflowError::MissingInstruction)
}

/// Find the output node fed by an instruction node (single outgoing edge,
/// first found). Fails with [`AnimflowError::MissingOutput`] when no edge
/// exists or the downstream node is not a generation output.
pub fn resolve_downstream_output(
    graph: &Graph,
    instruction_id: &NodeId,
) -> Result<NodeId> {
    let edge = graph.outgoing_edge(instruction_id).ok_or(AnimflowError::MissingOutput)?;
    match graph.node_kind(&edge.target) {
        Some(NodeKind::GenerationOutput) => Ok(edge.target),
        _ => Err(AnimflowError::MissingOutput),
    }
}
