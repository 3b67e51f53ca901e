use serde::{Deserialize, Serialize};

use crate::node::NodeId;

/// Directed connection between two pipeline nodes.
///
/// Self-loops are rejected at construction. Duplicate edges are tolerated
/// but redundant. Endpoints are not required to resolve here: a dangling
/// reference is a validation error on a stored graph, not a structural
/// rejection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineEdge {
    pub from: NodeId,
    pub to: NodeId,
}

impl PipelineEdge {
    pub fn new(from: impl Into<NodeId>, to: impl Into<NodeId>) -> Result<Self, String> {
        let from = from.into();
        let to = to.into();
        if from == to {
            return Err(format!("edge from '{}' to itself is not allowed", from));
        }
        Ok(PipelineEdge { from, to })
    }
}
