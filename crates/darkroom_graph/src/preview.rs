use std::collections::{BTreeSet, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::graph::PipelineGraph;
use crate::node::{BranchCondition, Classification, NodeId, NodeKind};
use crate::validation::{validate, ValidationError};

/// Runtime inputs for filename expansion. Both are optional: a missing
/// input falls back to the pattern's default, or leaves the placeholder
/// token in the output verbatim when no default exists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewInputs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub camera_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counter: Option<String>,
}

/// One file the pipeline expects to exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectedFile {
    /// Node ids from the capture to the emitting file node, joined
    /// with " -> ".
    pub path: String,
    pub filename: String,
    pub optional: bool,
}

/// A termination node reached by some path, with its classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReachedTermination {
    pub node_id: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub classification: Classification,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilenamePreview {
    pub base_filename: String,
    pub expected_files: Vec<ExpectedFile>,
    pub terminations: Vec<ReachedTermination>,
}

#[derive(Debug, Clone)]
pub enum PreviewError {
    /// The graph failed validation; a preview over it would be garbage.
    PipelineInvalid(Vec<ValidationError>),
}

impl fmt::Display for PreviewError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreviewError::PipelineInvalid(errors) => write!(
                f,
                "cannot preview an invalid pipeline ({} validation error(s))",
                errors.len()
            ),
        }
    }
}

impl std::error::Error for PreviewError {}

/// Expand one placeholder key in a capture pattern.
///
/// Token forms: `{key}` and `{key:default}`. A provided input wins, then
/// the token's default; a token with neither stays in the output verbatim
/// so the caller can see exactly which input was missing. Unknown keys
/// and unterminated braces pass through untouched.
fn expand_key(pattern: &str, key: &str, value: Option<&str>) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut rest = pattern;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        match tail.find('}') {
            Some(end) => {
                let token = &tail[1..end];
                let (token_key, default) = match token.split_once(':') {
                    Some((k, d)) => (k, Some(d)),
                    None => (token, None),
                };
                if token_key == key {
                    match value.or(default) {
                        Some(v) => out.push_str(v),
                        None => out.push_str(&tail[..=end]),
                    }
                } else {
                    out.push_str(&tail[..=end]);
                }
                rest = &tail[end + 1..];
            }
            None => {
                out.push_str(tail);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

fn expand_pattern(pattern: &str, inputs: &PreviewInputs) -> String {
    let pass = expand_key(pattern, "camera_id", inputs.camera_id.as_deref());
    expand_key(&pass, "counter", inputs.counter.as_deref())
}

fn normalize_extension(extension: &str) -> String {
    extension.trim_start_matches('.').to_string()
}

fn join_filename(base: &str, suffix: &str, extension: &str) -> String {
    if extension.starts_with('.') {
        format!("{}{}{}", base, suffix, extension)
    } else {
        format!("{}{}.{}", base, suffix, extension)
    }
}

/// Per-path traversal state. Cloned at every fan-out so suffix
/// accumulation stays path-local.
#[derive(Debug, Clone, Default)]
struct PathState {
    suffix: String,
    last_extension: Option<String>,
    trail: Vec<NodeId>,
}

impl PathState {
    fn path_string(&self) -> String {
        self.trail
            .iter()
            .map(NodeId::as_str)
            .collect::<Vec<_>>()
            .join(" -> ")
    }
}

/// Derive the expected file set for a validated pipeline graph.
///
/// Fails with [`PreviewError::PipelineInvalid`] rather than producing
/// partial output when the graph does not validate. Traversal is
/// depth-first from each capture node in insertion order, edges in
/// insertion order at every node, so the output is identical across
/// calls for fixed `(graph, inputs)`.
pub fn preview(
    graph: &PipelineGraph,
    inputs: &PreviewInputs,
) -> Result<FilenamePreview, PreviewError> {
    let report = validate(graph);
    if !report.is_valid {
        return Err(PreviewError::PipelineInvalid(report.errors));
    }

    let mut out = FilenamePreview {
        base_filename: String::new(),
        expected_files: Vec::new(),
        terminations: Vec::new(),
    };
    let mut joins: HashMap<NodeId, JoinState> = HashMap::new();
    let mut first_base = true;

    for node in graph.nodes() {
        if let NodeKind::Capture {
            camera_id_pattern,
            counter_pattern,
        } = &node.kind
        {
            let base = format!(
                "{}{}",
                expand_pattern(camera_id_pattern, inputs),
                expand_pattern(counter_pattern, inputs)
            );
            if first_base {
                out.base_filename = base.clone();
                first_base = false;
            }
            let state = PathState {
                suffix: String::new(),
                last_extension: None,
                trail: Vec::new(),
            };
            walk(graph, &node.id, &base, state, &mut joins, &mut out);
        }
    }

    Ok(out)
}

/// Join bookkeeping for one pairing node: which listed inputs have
/// arrived so far, and whether the downstream continuation already
/// fired.
#[derive(Debug, Default)]
struct JoinState {
    arrived: BTreeSet<NodeId>,
    continued: bool,
}

/// Walk every path out of `start`. The stack is explicit, matching the
/// validator's DFS; each frame carries its own cloned path state, and
/// successors are pushed in reverse so paths are explored in edge
/// insertion order.
fn walk(
    graph: &PipelineGraph,
    start: &NodeId,
    base: &str,
    state: PathState,
    joins: &mut HashMap<NodeId, JoinState>,
    out: &mut FilenamePreview,
) {
    let mut stack: Vec<(NodeId, PathState)> = vec![(start.clone(), state)];
    while let Some((node_id, mut state)) = stack.pop() {
        let node = match graph.get_node(&node_id) {
            Some(n) => n,
            None => continue,
        };
        state.trail.push(node_id.clone());

        match &node.kind {
            NodeKind::Capture { .. } => {}
            NodeKind::File {
                extension,
                optional,
            } => {
                out.expected_files.push(ExpectedFile {
                    path: state.path_string(),
                    filename: join_filename(base, &state.suffix, extension),
                    optional: *optional,
                });
                state.last_extension = Some(normalize_extension(extension));
            }
            NodeKind::Process { suffix } => {
                state.suffix.push_str(suffix);
            }
            NodeKind::Pairing { inputs } => {
                // Join semantics: the node is only "reached" once every
                // listed input path has visited it, and its downstream
                // continues exactly once, with the state of the arrival
                // that completed the set. Later arrivals stop here.
                let pred = state.trail.iter().rev().nth(1).cloned();
                let join = joins.entry(node_id.clone()).or_default();
                if let Some(p) = pred {
                    if inputs.contains(&p) {
                        join.arrived.insert(p);
                    }
                }
                if join.continued || !inputs.iter().all(|i| join.arrived.contains(i)) {
                    continue;
                }
                join.continued = true;
            }
            NodeKind::Branching { condition, value } => {
                let matched = match BranchCondition::parse(condition) {
                    Some(BranchCondition::HasSuffix) => state.suffix.ends_with(value.as_str()),
                    Some(BranchCondition::HasExtension) => state
                        .last_extension
                        .as_deref()
                        .is_some_and(|e| e.eq_ignore_ascii_case(value.trim_start_matches('.'))),
                    // Unreachable on a validated graph.
                    None => false,
                };
                // A matching path follows exactly the first outgoing
                // edge; a non-matching path ends here without files.
                // Not an error.
                if matched {
                    if let Some(next) = graph.successors(&node_id).next() {
                        stack.push((next.clone(), state));
                    }
                }
                continue;
            }
            NodeKind::Termination {
                name,
                classification,
            } => {
                if let Some(classification) = Classification::parse(classification) {
                    out.terminations.push(ReachedTermination {
                        node_id: node_id.clone(),
                        name: name.clone(),
                        classification,
                    });
                }
                continue;
            }
        }

        let successors: Vec<NodeId> = graph.successors(&node_id).cloned().collect();
        for next in successors.into_iter().rev() {
            stack.push((next, state.clone()));
        }
    }
}
