use std::collections::HashMap;
use std::fmt;

use crate::edge::PipelineEdge;
use crate::node::{NodeId, PipelineNode};

/// Structural rejection: the payload cannot form a well-shaped graph at
/// all. Distinct from validation errors, which describe a graph that is
/// stored but flagged invalid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    DuplicateNodeId(NodeId),
    SelfLoop(NodeId),
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphError::DuplicateNodeId(id) => {
                write!(f, "duplicate node id '{}' in pipeline", id)
            }
            GraphError::SelfLoop(id) => {
                write!(f, "edge from '{}' to itself is not allowed", id)
            }
        }
    }
}

impl std::error::Error for GraphError {}

/// Insertion-ordered node and edge storage with an id index.
///
/// Node order is significant for diffing and for stable validation error
/// ordering, so nodes live in a `Vec` with a side index rather than a map.
/// Edges keep their insertion order too; traversal visits a node's
/// outgoing edges in that order.
#[derive(Debug, Clone)]
pub struct PipelineGraph {
    nodes: Vec<PipelineNode>,
    edges: Vec<PipelineEdge>,
    index: HashMap<NodeId, usize>,
}

impl PipelineGraph {
    pub fn new(nodes: Vec<PipelineNode>, edges: Vec<PipelineEdge>) -> Result<Self, GraphError> {
        let mut index = HashMap::with_capacity(nodes.len());
        for (i, node) in nodes.iter().enumerate() {
            if index.insert(node.id.clone(), i).is_some() {
                return Err(GraphError::DuplicateNodeId(node.id.clone()));
            }
        }
        for edge in &edges {
            if edge.from == edge.to {
                return Err(GraphError::SelfLoop(edge.from.clone()));
            }
        }
        Ok(PipelineGraph {
            nodes,
            edges,
            index,
        })
    }

    pub fn nodes(&self) -> &[PipelineNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[PipelineEdge] {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.index.contains_key(id)
    }

    pub fn get_node(&self, id: &NodeId) -> Option<&PipelineNode> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    pub fn node_index(&self, id: &NodeId) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Resolvable successor ids of `id`, in edge insertion order. Edges
    /// whose target does not resolve are skipped here; the validator
    /// reports them separately.
    pub fn successors<'a>(&'a self, id: &'a NodeId) -> impl Iterator<Item = &'a NodeId> {
        self.edges
            .iter()
            .filter(move |e| &e.from == id && self.contains(&e.to))
            .map(|e| &e.to)
    }

    /// Index-based adjacency for the traversal passes: one successor list
    /// per node, in edge insertion order, with unresolvable endpoints
    /// dropped. Kept as a flat arena so the DFS can run over integer
    /// indices with an explicit stack.
    pub fn adjacency(&self) -> Vec<Vec<usize>> {
        let mut adj = vec![Vec::new(); self.nodes.len()];
        for edge in &self.edges {
            if let (Some(&from), Some(&to)) = (self.index.get(&edge.from), self.index.get(&edge.to))
            {
                adj[from].push(to);
            }
        }
        adj
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeKind;

    fn capture(id: &str) -> PipelineNode {
        PipelineNode::new(
            id,
            NodeKind::Capture {
                camera_id_pattern: "{camera_id}".to_string(),
                counter_pattern: "{counter}".to_string(),
            },
        )
    }

    fn file(id: &str, ext: &str) -> PipelineNode {
        PipelineNode::new(
            id,
            NodeKind::File {
                extension: ext.to_string(),
                optional: false,
            },
        )
    }

    fn edge(from: &str, to: &str) -> PipelineEdge {
        PipelineEdge::new(from, to).unwrap()
    }

    #[test]
    fn duplicate_node_id_rejected() {
        let result = PipelineGraph::new(vec![capture("a"), file("a", ".dng")], vec![]);
        assert_eq!(
            result.unwrap_err(),
            GraphError::DuplicateNodeId(NodeId::new("a"))
        );
    }

    #[test]
    fn self_loop_edge_rejected() {
        let result = PipelineGraph::new(
            vec![capture("a")],
            vec![PipelineEdge {
                from: NodeId::new("a"),
                to: NodeId::new("a"),
            }],
        );
        assert_eq!(result.unwrap_err(), GraphError::SelfLoop(NodeId::new("a")));
    }

    #[test]
    fn dangling_edge_endpoint_is_storable() {
        let graph =
            PipelineGraph::new(vec![capture("a")], vec![edge("a", "missing")]).unwrap();
        assert_eq!(graph.edge_count(), 1);
        // but does not appear as a successor
        assert_eq!(graph.successors(&NodeId::new("a")).count(), 0);
    }

    #[test]
    fn successors_follow_edge_insertion_order() {
        let graph = PipelineGraph::new(
            vec![capture("a"), file("x", ".dng"), file("y", ".xmp")],
            vec![edge("a", "y"), edge("a", "x")],
        )
        .unwrap();
        let a = NodeId::new("a");
        let succ: Vec<&str> = graph.successors(&a).map(|id| id.as_str()).collect();
        assert_eq!(succ, vec!["y", "x"]);
    }
}
