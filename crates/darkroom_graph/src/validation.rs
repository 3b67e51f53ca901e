use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::graph::PipelineGraph;
use crate::node::{BranchCondition, Classification, NodeId, NodeKind};

/// Validation error categories, reported in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationErrorKind {
    CycleDetected,
    OrphanedNode,
    InvalidReference,
    MissingRequiredNode,
    InvalidProperty,
}

impl fmt::Display for ValidationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ValidationErrorKind::CycleDetected => "cycle_detected",
            ValidationErrorKind::OrphanedNode => "orphaned_node",
            ValidationErrorKind::InvalidReference => "invalid_reference",
            ValidationErrorKind::MissingRequiredNode => "missing_required_node",
            ValidationErrorKind::InvalidProperty => "invalid_property",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    #[serde(rename = "type")]
    pub kind: ValidationErrorKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<NodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.node_id {
            Some(id) => write!(f, "{} [{}]: {}", self.kind, id, self.message),
            None => write!(f, "{}: {}", self.kind, self.message),
        }
    }
}

/// Outcome of validating a pipeline graph. `is_valid` is true iff the
/// error list is empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<ValidationError>,
}

/// Validate a pipeline graph.
///
/// Pure function of the graph's nodes and edges; deterministic for
/// identical input. Error ordering is stable: cycles, then orphans, then
/// bad references, then missing required nodes, then per-node property
/// errors, each group in node/edge insertion order.
pub fn validate(graph: &PipelineGraph) -> ValidationReport {
    let mut errors = Vec::new();
    check_cycles(graph, &mut errors);
    check_orphans(graph, &mut errors);
    check_references(graph, &mut errors);
    check_required_nodes(graph, &mut errors);
    check_properties(graph, &mut errors);
    ValidationReport {
        is_valid: errors.is_empty(),
        errors,
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Color {
    White,
    Gray,
    Black,
}

/// Three-color DFS over the index arena. Every back-edge to a gray node
/// yields one error; traversal continues past failures so a single pass
/// reports all cycles. The stack is explicit: recursion depth on large
/// graphs is not acceptable here.
fn check_cycles(graph: &PipelineGraph, errors: &mut Vec<ValidationError>) {
    let adj = graph.adjacency();
    let mut color = vec![Color::White; graph.node_count()];

    for root in 0..graph.node_count() {
        if color[root] != Color::White {
            continue;
        }
        color[root] = Color::Gray;
        // (node index, cursor into its successor list)
        let mut stack: Vec<(usize, usize)> = vec![(root, 0)];
        while let Some(frame) = stack.last_mut() {
            let node = frame.0;
            let cursor = frame.1;
            if cursor < adj[node].len() {
                frame.1 += 1;
                let next = adj[node][cursor];
                match color[next] {
                    Color::White => {
                        color[next] = Color::Gray;
                        stack.push((next, 0));
                    }
                    Color::Gray => {
                        let from = &graph.nodes()[node].id;
                        let to = &graph.nodes()[next].id;
                        errors.push(ValidationError {
                            kind: ValidationErrorKind::CycleDetected,
                            message: format!(
                                "edge from '{}' back to '{}' closes a cycle",
                                from, to
                            ),
                            node_id: Some(to.clone()),
                            suggestion: Some(format!(
                                "remove or redirect the edge from '{}' to '{}'",
                                from, to
                            )),
                        });
                    }
                    Color::Black => {}
                }
            } else {
                color[node] = Color::Black;
                stack.pop();
            }
        }
    }
}

/// Forward reachability from every capture node (BFS). A node that is
/// neither a capture nor reachable from one is orphaned. With zero
/// captures every non-capture node is orphaned; the missing capture
/// itself is reported by the required-node check.
fn check_orphans(graph: &PipelineGraph, errors: &mut Vec<ValidationError>) {
    let adj = graph.adjacency();
    let mut reachable = vec![false; graph.node_count()];
    let mut queue = VecDeque::new();

    for (i, node) in graph.nodes().iter().enumerate() {
        if node.kind.is_capture() {
            reachable[i] = true;
            queue.push_back(i);
        }
    }

    while let Some(i) = queue.pop_front() {
        for &next in &adj[i] {
            if !reachable[next] {
                reachable[next] = true;
                queue.push_back(next);
            }
        }
    }

    for (i, node) in graph.nodes().iter().enumerate() {
        if !reachable[i] {
            errors.push(ValidationError {
                kind: ValidationErrorKind::OrphanedNode,
                message: format!(
                    "node '{}' is not reachable from any capture node",
                    node.id
                ),
                node_id: Some(node.id.clone()),
                suggestion: Some(
                    "connect it downstream of a capture node or remove it".to_string(),
                ),
            });
        }
    }
}

/// Every edge endpoint and every pairing input must resolve to a node
/// actually present in the graph.
fn check_references(graph: &PipelineGraph, errors: &mut Vec<ValidationError>) {
    for edge in graph.edges() {
        for endpoint in [&edge.from, &edge.to] {
            if !graph.contains(endpoint) {
                errors.push(ValidationError {
                    kind: ValidationErrorKind::InvalidReference,
                    message: format!(
                        "edge from '{}' to '{}' references unknown node '{}'",
                        edge.from, edge.to, endpoint
                    ),
                    node_id: Some(endpoint.clone()),
                    suggestion: Some(format!(
                        "add a node with id '{}' or remove the edge",
                        endpoint
                    )),
                });
            }
        }
    }

    for node in graph.nodes() {
        if let NodeKind::Pairing { inputs } = &node.kind {
            for input in inputs {
                if !graph.contains(input) {
                    errors.push(ValidationError {
                        kind: ValidationErrorKind::InvalidReference,
                        message: format!(
                            "pairing node '{}' lists unknown input '{}'",
                            node.id, input
                        ),
                        node_id: Some(node.id.clone()),
                        suggestion: Some(format!(
                            "add a node with id '{}' or drop it from the inputs list",
                            input
                        )),
                    });
                }
            }
        }
    }
}

fn check_required_nodes(graph: &PipelineGraph, errors: &mut Vec<ValidationError>) {
    let has_capture = graph.nodes().iter().any(|n| n.kind.is_capture());
    let has_termination = graph.nodes().iter().any(|n| n.kind.is_termination());

    if !has_capture {
        errors.push(ValidationError {
            kind: ValidationErrorKind::MissingRequiredNode,
            message: "pipeline must have at least one capture node".to_string(),
            node_id: None,
            suggestion: Some("add a capture node as the pipeline entry point".to_string()),
        });
    }
    if !has_termination {
        errors.push(ValidationError {
            kind: ValidationErrorKind::MissingRequiredNode,
            message: "pipeline must have at least one termination node".to_string(),
            node_id: None,
            suggestion: Some("add a termination node marking the archival state".to_string()),
        });
    }
}

/// Kind-specific property conformance, one node at a time in insertion
/// order. Missing required keys never get this far (the decode boundary
/// rejects them); what is checked here is values against their closed
/// legal sets.
fn check_properties(graph: &PipelineGraph, errors: &mut Vec<ValidationError>) {
    for node in graph.nodes() {
        match &node.kind {
            NodeKind::File { extension, .. } => {
                if extension.is_empty() {
                    errors.push(ValidationError {
                        kind: ValidationErrorKind::InvalidProperty,
                        message: format!("file node '{}' has an empty extension", node.id),
                        node_id: Some(node.id.clone()),
                        suggestion: Some(
                            "set extension to the expected file type, e.g. '.dng'".to_string(),
                        ),
                    });
                }
            }
            NodeKind::Pairing { inputs } => {
                if inputs.is_empty() {
                    errors.push(ValidationError {
                        kind: ValidationErrorKind::InvalidProperty,
                        message: format!("pairing node '{}' has no inputs", node.id),
                        node_id: Some(node.id.clone()),
                        suggestion: Some(
                            "list the node ids whose paths this pairing joins".to_string(),
                        ),
                    });
                }
            }
            NodeKind::Branching { condition, .. } => {
                if BranchCondition::parse(condition).is_none() {
                    errors.push(ValidationError {
                        kind: ValidationErrorKind::InvalidProperty,
                        message: format!(
                            "branching node '{}' has unknown condition '{}'",
                            node.id, condition
                        ),
                        node_id: Some(node.id.clone()),
                        suggestion: Some(
                            "set condition to has_suffix or has_extension".to_string(),
                        ),
                    });
                }
            }
            NodeKind::Termination { classification, .. } => {
                if Classification::parse(classification).is_none() {
                    errors.push(ValidationError {
                        kind: ValidationErrorKind::InvalidProperty,
                        message: format!(
                            "termination node '{}' has unknown classification '{}'",
                            node.id, classification
                        ),
                        node_id: Some(node.id.clone()),
                        suggestion: Some(
                            "set classification to CONSISTENT, PARTIAL, or INCONSISTENT"
                                .to_string(),
                        ),
                    });
                }
            }
            NodeKind::Capture { .. } | NodeKind::Process { .. } => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::PipelineEdge;
    use crate::node::PipelineNode;

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

    fn termination(id: &str, classification: &str) -> PipelineNode {
        PipelineNode::new(
            id,
            NodeKind::Termination {
                name: None,
                classification: classification.to_string(),
            },
        )
    }

    fn edge(from: &str, to: &str) -> PipelineEdge {
        PipelineEdge::new(from, to).unwrap()
    }

    fn graph(nodes: Vec<PipelineNode>, edges: Vec<PipelineEdge>) -> PipelineGraph {
        PipelineGraph::new(nodes, edges).unwrap()
    }

    fn kinds(report: &ValidationReport) -> Vec<ValidationErrorKind> {
        report.errors.iter().map(|e| e.kind).collect()
    }

    #[test]
    fn linear_pipeline_is_valid() {
        let g = graph(
            vec![
                capture("cam"),
                file("raw", ".dng"),
                termination("done", "CONSISTENT"),
            ],
            vec![edge("cam", "raw"), edge("raw", "done")],
        );
        let report = validate(&g);
        assert!(report.is_valid);
        assert!(report.errors.is_empty());
    }

    #[test]
    fn two_node_cycle_reports_exactly_one_cycle_error() {
        // A -> B -> A, plus a capture and termination elsewhere so the
        // only cycle noise is the orphan reports for A and B.
        let g = graph(
            vec![
                capture("cam"),
                termination("done", "CONSISTENT"),
                file("a", ".dng"),
                file("b", ".xmp"),
            ],
            vec![edge("cam", "done"), edge("a", "b"), edge("b", "a")],
        );
        let report = validate(&g);
        assert!(!report.is_valid);
        let cycles: Vec<&ValidationError> = report
            .errors
            .iter()
            .filter(|e| e.kind == ValidationErrorKind::CycleDetected)
            .collect();
        assert_eq!(cycles.len(), 1);
        let named = cycles[0].node_id.as_ref().unwrap().as_str();
        assert!(named == "a" || named == "b");
    }

    #[test]
    fn all_cycles_reported_in_one_pass() {
        let g = graph(
            vec![
                file("a", ".dng"),
                file("b", ".dng"),
                file("c", ".dng"),
                file("d", ".dng"),
            ],
            vec![
                edge("a", "b"),
                edge("b", "a"),
                edge("c", "d"),
                edge("d", "c"),
            ],
        );
        let report = validate(&g);
        let cycles = report
            .errors
            .iter()
            .filter(|e| e.kind == ValidationErrorKind::CycleDetected)
            .count();
        assert_eq!(cycles, 2);
    }

    #[test]
    fn unreachable_node_is_orphaned() {
        let g = graph(
            vec![
                capture("cam"),
                file("raw", ".dng"),
                termination("done", "CONSISTENT"),
                file("stray", ".jpg"),
            ],
            vec![edge("cam", "raw"), edge("raw", "done")],
        );
        let report = validate(&g);
        let orphans: Vec<&ValidationError> = report
            .errors
            .iter()
            .filter(|e| e.kind == ValidationErrorKind::OrphanedNode)
            .collect();
        assert_eq!(orphans.len(), 1);
        assert_eq!(orphans[0].node_id, Some(NodeId::new("stray")));
    }

    #[test]
    fn zero_captures_orphan_every_other_node() {
        let g = graph(
            vec![file("raw", ".dng"), termination("done", "CONSISTENT")],
            vec![edge("raw", "done")],
        );
        let report = validate(&g);
        let orphans = report
            .errors
            .iter()
            .filter(|e| e.kind == ValidationErrorKind::OrphanedNode)
            .count();
        assert_eq!(orphans, 2);
        // and the missing capture is a required-node error, not an orphan
        assert!(report
            .errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::MissingRequiredNode));
    }

    #[test]
    fn dangling_edge_endpoint_is_invalid_reference() {
        let g = graph(
            vec![
                capture("cam"),
                termination("done", "CONSISTENT"),
            ],
            vec![edge("cam", "done"), edge("cam", "missing")],
        );
        let report = validate(&g);
        let refs: Vec<&ValidationError> = report
            .errors
            .iter()
            .filter(|e| e.kind == ValidationErrorKind::InvalidReference)
            .collect();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].node_id, Some(NodeId::new("missing")));
    }

    #[test]
    fn pairing_with_unknown_input_is_invalid_reference() {
        let g = graph(
            vec![
                capture("cam"),
                PipelineNode::new(
                    "hdr",
                    NodeKind::Pairing {
                        inputs: vec![NodeId::new("cam"), NodeId::new("ghost")],
                    },
                ),
                termination("done", "CONSISTENT"),
            ],
            vec![edge("cam", "hdr"), edge("hdr", "done")],
        );
        let report = validate(&g);
        let refs: Vec<&ValidationError> = report
            .errors
            .iter()
            .filter(|e| e.kind == ValidationErrorKind::InvalidReference)
            .collect();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].node_id, Some(NodeId::new("hdr")));
        assert!(refs[0].message.contains("ghost"));
    }

    #[test]
    fn bad_classification_is_invalid_property_naming_the_node() {
        let g = graph(
            vec![
                capture("cam"),
                termination("done", "MAYBE"),
            ],
            vec![edge("cam", "done")],
        );
        let report = validate(&g);
        let props: Vec<&ValidationError> = report
            .errors
            .iter()
            .filter(|e| e.kind == ValidationErrorKind::InvalidProperty)
            .collect();
        assert_eq!(props.len(), 1);
        assert_eq!(props[0].node_id, Some(NodeId::new("done")));
        assert_eq!(
            props[0].suggestion.as_deref(),
            Some("set classification to CONSISTENT, PARTIAL, or INCONSISTENT")
        );
    }

    #[test]
    fn error_groups_keep_their_order() {
        // One of everything: a cycle, an orphan, a dangling edge, no
        // termination, and a bad branching condition.
        let g = graph(
            vec![
                capture("cam"),
                file("a", ".dng"),
                file("b", ".dng"),
                PipelineNode::new(
                    "branch",
                    NodeKind::Branching {
                        condition: "has_name".to_string(),
                        value: "x".to_string(),
                    },
                ),
            ],
            vec![
                edge("a", "b"),
                edge("b", "a"),
                edge("cam", "missing"),
            ],
        );
        let report = validate(&g);
        let ks = kinds(&report);
        let first_of = |kind: ValidationErrorKind| ks.iter().position(|&k| k == kind).unwrap();
        assert!(first_of(ValidationErrorKind::CycleDetected) < first_of(ValidationErrorKind::OrphanedNode));
        assert!(first_of(ValidationErrorKind::OrphanedNode) < first_of(ValidationErrorKind::InvalidReference));
        assert!(
            first_of(ValidationErrorKind::InvalidReference)
                < first_of(ValidationErrorKind::MissingRequiredNode)
        );
        assert!(
            first_of(ValidationErrorKind::MissingRequiredNode)
                < first_of(ValidationErrorKind::InvalidProperty)
        );
    }

    #[test]
    fn validate_is_idempotent() {
        let g = graph(
            vec![file("a", ".dng"), file("b", ".dng")],
            vec![edge("a", "b"), edge("b", "a")],
        );
        let first = validate(&g);
        let second = validate(&g);
        assert_eq!(first, second);
    }
}
